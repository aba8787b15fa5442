use tracing::warn;

use crate::errors::{Result, StoreError};
use crate::isolation::IsolationLevel;
use crate::model::{Record, RowKey};

/// A store capable of opening transactions at a requested isolation level.
///
/// This is the seam the isolation simulator drives; it deliberately mirrors
/// the capability set of a relational store's transactional interface and
/// nothing more. Implementations must be shareable across the two unit
/// threads of a simulation run.
pub trait TransactionalStore: Send + Sync + 'static {
    type Txn: StoreTransaction + Send;

    /// Opens a new transaction at the given isolation level.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store cannot open a transaction.
    fn begin(&self, level: IsolationLevel) -> Result<Self::Txn>;
}

/// A live transaction handle.
///
/// `commit` and `rollback` consume the handle, so a transaction reaches
/// exactly one terminal state; the type system rules out committing twice or
/// rolling back after a commit.
pub trait StoreTransaction {
    /// The store-assigned identifier of this transaction.
    fn id(&self) -> u64;

    /// Reads the current value of a row as visible to this transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the read fails. A missing row is not an
    /// error; it is `Ok(None)`.
    fn read(&mut self, key: &RowKey) -> Result<Option<Record>>;

    /// Stages a write of `record` under `key`, visible to later reads in
    /// this transaction and applied to the store on commit.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write cannot be staged.
    fn write(&mut self, key: RowKey, record: Record) -> Result<()>;

    /// Attempts to commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the commit is rejected; the store rolls
    /// the transaction back itself in that case.
    fn commit(self) -> Result<()>;

    /// Discards the transaction without applying staged changes.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the store could not be notified; callers
    /// on cleanup paths log and swallow this.
    fn rollback(self) -> Result<()>;
}

/// Scoped wrapper around an open transaction that guarantees a terminal
/// transition on every exit path: [`OpenTransaction::commit`] takes the
/// handle out, and dropping the wrapper with the handle still inside rolls
/// it back. A commit therefore can never be followed by a rollback for the
/// same transaction.
///
/// Rollback on the drop path is best-effort; a failure there is logged at
/// warn level and swallowed so it cannot mask the error that unwound the
/// scope in the first place.
pub struct OpenTransaction<T: StoreTransaction> {
    id: u64,
    txn: Option<T>,
}

impl<T: StoreTransaction> OpenTransaction<T> {
    pub fn new(txn: T) -> Self {
        Self { id: txn.id(), txn: Some(txn) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Reads through to the wrapped transaction.
    ///
    /// # Errors
    ///
    /// Propagates the underlying read error.
    pub fn read(&mut self, key: &RowKey) -> Result<Option<Record>> {
        match self.txn.as_mut() {
            Some(txn) => txn.read(key),
            None => Err(StoreError::Backend("transaction already terminated".into())),
        }
    }

    /// Writes through to the wrapped transaction.
    ///
    /// # Errors
    ///
    /// Propagates the underlying write error.
    pub fn write(&mut self, key: RowKey, record: Record) -> Result<()> {
        match self.txn.as_mut() {
            Some(txn) => txn.write(key, record),
            None => Err(StoreError::Backend("transaction already terminated".into())),
        }
    }

    /// Commits the wrapped transaction and defuses the rollback guard.
    ///
    /// # Errors
    ///
    /// Propagates the underlying commit error.
    pub fn commit(mut self) -> Result<()> {
        match self.txn.take() {
            Some(txn) => txn.commit(),
            None => Err(StoreError::Backend("transaction already terminated".into())),
        }
    }
}

impl<T: StoreTransaction> Drop for OpenTransaction<T> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            if let Err(err) = txn.rollback() {
                warn!(transaction = self.id, %err, "best-effort rollback failed");
            }
        }
    }
}
