use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap as HashMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::isolation::IsolationLevel;
use crate::model::{Record, RowKey, Table};
use crate::store::{StoreTransaction, TransactionalStore};

/// A committed row together with the commit version that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionedRecord {
    record: Record,
    version: u64,
}

/// Version reported for a row that did not exist when it was read.
const ABSENT: u64 = 0;

/// In-memory transactional row store.
///
/// Committed rows live in a single versioned map; every transaction stages
/// its writes privately and publishes them in one atomic step on commit,
/// tagged with a fresh commit version. The version trail is what the
/// repeatable-read pin and the optimistic commit-time validation run on.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    rows: RwLock<HashMap<RowKey, VersionedRecord>>,
    /// Monotonic source of commit versions.
    commit_clock: AtomicU64,
    /// Monotonic source of transaction ids.
    txn_clock: AtomicU64,
    /// Per-table insert-id counters.
    id_clocks: Mutex<HashMap<Table, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                rows: RwLock::new(HashMap::new()),
                commit_clock: AtomicU64::new(0),
                txn_clock: AtomicU64::new(0),
                id_clocks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Allocates the next row id for a table.
    pub fn allocate_id(&self, table: Table) -> u64 {
        let mut clocks = self.inner.id_clocks.lock();
        let clock = clocks.entry(table).or_insert(0);
        *clock += 1;
        *clock
    }

    /// Installs committed rows directly, advancing the insert-id counters
    /// past the seeded ids. Intended for startup and test fixtures.
    pub fn seed<I>(&self, rows: I)
    where
        I: IntoIterator<Item = (RowKey, Record)>,
    {
        let mut map = self.inner.rows.write();
        let mut clocks = self.inner.id_clocks.lock();
        let version = self.inner.commit_clock.fetch_add(1, Ordering::SeqCst) + 1;
        for (key, record) in rows {
            let clock = clocks.entry(key.table).or_insert(0);
            *clock = (*clock).max(key.id);
            map.insert(key, VersionedRecord { record, version });
        }
    }

    /// Committed rows of one table, ordered by id.
    pub fn scan(&self, table: Table) -> Vec<Record> {
        let map = self.inner.rows.read();
        let mut rows: Vec<(u64, Record)> = map
            .iter()
            .filter(|(key, _)| key.table == table)
            .map(|(key, value)| (key.id, value.record.clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, record)| record).collect()
    }

    /// Number of committed rows in one table.
    pub fn count(&self, table: Table) -> usize {
        self.inner
            .rows
            .read()
            .keys()
            .filter(|key| key.table == table)
            .count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionalStore for MemoryStore {
    type Txn = MemoryTransaction;

    fn begin(&self, level: IsolationLevel) -> Result<MemoryTransaction> {
        let id = self.inner.txn_clock.fetch_add(1, Ordering::SeqCst);
        let start_version = self.inner.commit_clock.load(Ordering::SeqCst);
        debug!(transaction = id, %level, "transaction started");
        Ok(MemoryTransaction {
            id,
            level,
            start_version,
            inner: Arc::clone(&self.inner),
            read_cache: HashMap::new(),
            write_set: HashMap::new(),
        })
    }
}

/// The value a transaction pinned the first time it read a row.
#[derive(Debug, Clone)]
struct CachedRead {
    version: u64,
    record: Option<Record>,
}

/// A single transaction against a [`MemoryStore`].
///
/// Reads at `ReadUncommitted`/`ReadCommitted` always go to the latest
/// committed state. At `RepeatableRead`/`Serializable` the first read of a
/// row pins its value and version; later reads return the pin. Writes and
/// deletes are staged in a private set and read back by the transaction's
/// own reads. Dropping the transaction discards the staged state, so drop
/// is equivalent to rollback.
pub struct MemoryTransaction {
    id: u64,
    level: IsolationLevel,
    start_version: u64,
    inner: Arc<StoreInner>,
    read_cache: HashMap<RowKey, CachedRead>,
    /// Staged changes; `None` marks a staged delete.
    write_set: HashMap<RowKey, Option<Record>>,
}

impl MemoryTransaction {
    /// Stages a delete of `key`, applied on commit.
    pub fn delete(&mut self, key: RowKey) {
        self.write_set.insert(key, None);
    }

    fn committed(&self, key: &RowKey) -> (u64, Option<Record>) {
        match self.inner.rows.read().get(key) {
            Some(value) => (value.version, Some(value.record.clone())),
            None => (ABSENT, None),
        }
    }
}

impl StoreTransaction for MemoryTransaction {
    fn id(&self) -> u64 {
        self.id
    }

    fn read(&mut self, key: &RowKey) -> Result<Option<Record>> {
        if let Some(staged) = self.write_set.get(key) {
            return Ok(staged.clone());
        }
        if self.level.repeatable() {
            if let Some(cached) = self.read_cache.get(key) {
                return Ok(cached.record.clone());
            }
        }
        let (version, record) = self.committed(key);
        if self.level.repeatable() {
            self.read_cache
                .insert(*key, CachedRead { version, record: record.clone() });
        }
        Ok(record)
    }

    fn write(&mut self, key: RowKey, record: Record) -> Result<()> {
        self.write_set.insert(key, Some(record));
        Ok(())
    }

    fn commit(self) -> Result<()> {
        if self.write_set.is_empty() {
            debug!(transaction = self.id, "read-only transaction committed");
            return Ok(());
        }

        let mut rows = self.inner.rows.write();

        // Writing transactions at the repeatable levels validate against the
        // committed state before publishing; last-writer-wins otherwise.
        if self.level.repeatable() {
            for (key, cached) in &self.read_cache {
                let current = rows.get(key).map_or(ABSENT, |value| value.version);
                if current != cached.version {
                    debug!(transaction = self.id, %key, "stale read detected at commit");
                    return Err(StoreError::TransactionConflict);
                }
            }
            for key in self.write_set.keys() {
                if self.read_cache.contains_key(key) {
                    continue;
                }
                let current = rows.get(key).map_or(ABSENT, |value| value.version);
                if current > self.start_version {
                    debug!(transaction = self.id, %key, "concurrent write detected at commit");
                    return Err(StoreError::TransactionConflict);
                }
            }
        }

        let version = self.inner.commit_clock.fetch_add(1, Ordering::SeqCst) + 1;
        for (key, staged) in self.write_set {
            match staged {
                Some(record) => {
                    rows.insert(key, VersionedRecord { record, version });
                }
                None => {
                    rows.remove(&key);
                }
            }
        }
        drop(rows);

        debug!(transaction = self.id, version, "transaction committed");
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        debug!(transaction = self.id, "transaction rolled back");
        Ok(())
    }
}
