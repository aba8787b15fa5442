//! Shared helpers and stub stores for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;

use railyard::errors::Result;
use railyard::{
    IsolationLevel, MemoryStore, MemoryTransaction, Record, RowKey, StoreError, StoreTransaction,
    Train, TransactionalStore,
};

/// The train row the simulation tests target.
pub const SUBJECT: RowKey = RowKey::train(100);

/// A store seeded with the subject train at the given capacity.
pub fn seeded_store(capacity: i64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.seed([(
        SUBJECT,
        Record::Train(Train { id: 100, code: "EXP-100".to_string(), capacity }),
    )]);
    store
}

/// Reads the subject train's committed capacity through a fresh transaction.
pub fn committed_capacity(store: &MemoryStore) -> i64 {
    let mut txn = store
        .begin(IsolationLevel::ReadCommitted)
        .expect("begin should succeed");
    let record = txn
        .read(&SUBJECT)
        .expect("read should succeed")
        .expect("subject row should exist");
    txn.commit().expect("read-only commit should succeed");
    record.as_train().expect("subject should be a train").capacity
}

// --- Stub stores ---

/// Fails the test if the simulator ever opens a transaction.
pub struct UntouchableStore;

impl TransactionalStore for UntouchableStore {
    type Txn = NoopTransaction;

    fn begin(&self, _level: IsolationLevel) -> Result<NoopTransaction> {
        panic!("begin must not be called before the selector is validated");
    }
}

pub struct NoopTransaction;

impl StoreTransaction for NoopTransaction {
    fn id(&self) -> u64 {
        0
    }

    fn read(&mut self, _key: &RowKey) -> Result<Option<Record>> {
        Ok(None)
    }

    fn write(&mut self, _key: RowKey, _record: Record) -> Result<()> {
        Ok(())
    }

    fn commit(self) -> Result<()> {
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        Ok(())
    }
}

/// Serves reads and writes normally but never returns from commit.
pub struct StalledCommitStore {
    inner: Arc<MemoryStore>,
}

impl StalledCommitStore {
    pub fn new(capacity: i64) -> Self {
        Self { inner: seeded_store(capacity) }
    }
}

impl TransactionalStore for StalledCommitStore {
    type Txn = StalledCommitTransaction;

    fn begin(&self, level: IsolationLevel) -> Result<StalledCommitTransaction> {
        Ok(StalledCommitTransaction { inner: self.inner.begin(level)? })
    }
}

pub struct StalledCommitTransaction {
    inner: MemoryTransaction,
}

impl StoreTransaction for StalledCommitTransaction {
    fn id(&self) -> u64 {
        self.inner.id()
    }

    fn read(&mut self, key: &RowKey) -> Result<Option<Record>> {
        self.inner.read(key)
    }

    fn write(&mut self, key: RowKey, record: Record) -> Result<()> {
        self.inner.write(key, record)
    }

    fn commit(self) -> Result<()> {
        loop {
            thread::park();
        }
    }

    fn rollback(self) -> Result<()> {
        Ok(())
    }
}

/// Every read fails; begin, write, and commit succeed.
pub struct FailingReadStore {
    ids: AtomicU64,
}

impl FailingReadStore {
    pub fn new() -> Self {
        Self { ids: AtomicU64::new(0) }
    }
}

impl TransactionalStore for FailingReadStore {
    type Txn = FailingReadTransaction;

    fn begin(&self, _level: IsolationLevel) -> Result<FailingReadTransaction> {
        Ok(FailingReadTransaction { id: self.ids.fetch_add(1, Ordering::SeqCst) })
    }
}

pub struct FailingReadTransaction {
    id: u64,
}

impl StoreTransaction for FailingReadTransaction {
    fn id(&self) -> u64 {
        self.id
    }

    fn read(&mut self, _key: &RowKey) -> Result<Option<Record>> {
        Err(StoreError::Backend("injected read failure".to_string()))
    }

    fn write(&mut self, _key: RowKey, _record: Record) -> Result<()> {
        Ok(())
    }

    fn commit(self) -> Result<()> {
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        Ok(())
    }
}

/// Wraps a seeded [`MemoryStore`] and sleeps a random amount before every
/// operation, so the gate-enforced schedule is exercised under scheduler
/// jitter.
pub struct JitteringStore {
    inner: Arc<MemoryStore>,
    max_delay: Duration,
}

impl JitteringStore {
    pub fn new(capacity: i64, max_delay: Duration) -> Self {
        Self { inner: seeded_store(capacity), max_delay }
    }

    fn pause(&self) {
        let max_ms = self.max_delay.as_millis() as u64;
        let delay = rand::rng().random_range(0..=max_ms);
        thread::sleep(Duration::from_millis(delay));
    }
}

impl TransactionalStore for JitteringStore {
    type Txn = JitteringTransaction;

    fn begin(&self, level: IsolationLevel) -> Result<JitteringTransaction> {
        self.pause();
        Ok(JitteringTransaction {
            inner: self.inner.begin(level)?,
            max_delay: self.max_delay,
        })
    }
}

pub struct JitteringTransaction {
    inner: MemoryTransaction,
    max_delay: Duration,
}

impl JitteringTransaction {
    fn pause(&self) {
        let max_ms = self.max_delay.as_millis() as u64;
        let delay = rand::rng().random_range(0..=max_ms);
        thread::sleep(Duration::from_millis(delay));
    }
}

impl StoreTransaction for JitteringTransaction {
    fn id(&self) -> u64 {
        self.inner.id()
    }

    fn read(&mut self, key: &RowKey) -> Result<Option<Record>> {
        self.pause();
        self.inner.read(key)
    }

    fn write(&mut self, key: RowKey, record: Record) -> Result<()> {
        self.pause();
        self.inner.write(key, record)
    }

    fn commit(self) -> Result<()> {
        self.pause();
        self.inner.commit()
    }

    fn rollback(self) -> Result<()> {
        self.inner.rollback()
    }
}
