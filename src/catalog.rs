use std::sync::Arc;

use crate::errors::{Result, StoreError};
use crate::isolation::IsolationLevel;
use crate::memory::MemoryStore;
use crate::model::{Record, RowKey, Seat, Station, Table, Train};
use crate::store::{StoreTransaction, TransactionalStore};

/// Upper bound on listing results.
const LIST_LIMIT: usize = 100;

/// Reference-data operations over the railway tables.
///
/// Every mutation runs as its own short transaction at
/// [`IsolationLevel::ReadCommitted`]; listings scan the committed state.
pub struct Catalog {
    store: Arc<MemoryStore>,
}

impl Catalog {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Inserts a station under a freshly allocated id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the transaction fails.
    pub fn create_station(&self, city: String, name: String) -> Result<Station> {
        let id = self.store.allocate_id(Table::Stations);
        let station = Station { id, city, name };
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        txn.write(RowKey::station(id), Record::Station(station.clone()))?;
        txn.commit()?;
        Ok(station)
    }

    /// Fetches a station by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowNotFound`] if no such station exists.
    pub fn station(&self, id: u64) -> Result<Station> {
        let key = RowKey::station(id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        let record = txn.read(&key)?.ok_or(StoreError::RowNotFound(key))?;
        txn.commit()?;
        record.into_station().ok_or(StoreError::UnexpectedRecord(key))
    }

    /// All stations, ordered by id.
    pub fn stations(&self) -> Vec<Station> {
        self.store
            .scan(Table::Stations)
            .into_iter()
            .filter_map(Record::into_station)
            .take(LIST_LIMIT)
            .collect()
    }

    /// Replaces an existing station row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowNotFound`] if the row does not exist.
    pub fn update_station(&self, station: Station) -> Result<Station> {
        let key = RowKey::station(station.id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        if txn.read(&key)?.is_none() {
            return Err(StoreError::RowNotFound(key));
        }
        txn.write(key, Record::Station(station.clone()))?;
        txn.commit()?;
        Ok(station)
    }

    /// Deletes a station; returns whether a row was affected.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the transaction fails.
    pub fn delete_station(&self, id: u64) -> Result<bool> {
        let key = RowKey::station(id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        let existed = txn.read(&key)?.is_some();
        txn.delete(key);
        txn.commit()?;
        Ok(existed)
    }

    /// Inserts a train under a freshly allocated id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the transaction fails.
    pub fn create_train(&self, code: String, capacity: i64) -> Result<Train> {
        let id = self.store.allocate_id(Table::Trains);
        let train = Train { id, code, capacity };
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        txn.write(RowKey::train(id), Record::Train(train.clone()))?;
        txn.commit()?;
        Ok(train)
    }

    /// Fetches a train by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowNotFound`] if no such train exists.
    pub fn train(&self, id: u64) -> Result<Train> {
        let key = RowKey::train(id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        let record = txn.read(&key)?.ok_or(StoreError::RowNotFound(key))?;
        txn.commit()?;
        record.into_train().ok_or(StoreError::UnexpectedRecord(key))
    }

    /// All trains, ordered by id.
    pub fn trains(&self) -> Vec<Train> {
        self.store
            .scan(Table::Trains)
            .into_iter()
            .filter_map(Record::into_train)
            .take(LIST_LIMIT)
            .collect()
    }

    /// Replaces an existing train row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowNotFound`] if the row does not exist.
    pub fn update_train(&self, train: Train) -> Result<Train> {
        let key = RowKey::train(train.id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        if txn.read(&key)?.is_none() {
            return Err(StoreError::RowNotFound(key));
        }
        txn.write(key, Record::Train(train.clone()))?;
        txn.commit()?;
        Ok(train)
    }

    /// Deletes a train; returns whether a row was affected.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the transaction fails.
    pub fn delete_train(&self, id: u64) -> Result<bool> {
        let key = RowKey::train(id);
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        let existed = txn.read(&key)?.is_some();
        txn.delete(key);
        txn.commit()?;
        Ok(existed)
    }

    /// Bulk-inserts `amount` seat rows in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the transaction fails; no seats are
    /// inserted in that case.
    pub fn generate_seats(&self, amount: u64) -> Result<Vec<Seat>> {
        let mut txn = self.store.begin(IsolationLevel::ReadCommitted)?;
        let mut seats = Vec::with_capacity(amount as usize);
        for _ in 0..amount {
            let id = self.store.allocate_id(Table::Seats);
            let seat = Seat { id, label: format!("S-{id:04}") };
            txn.write(RowKey::seat(id), Record::Seat(seat.clone()))?;
            seats.push(seat);
        }
        txn.commit()?;
        Ok(seats)
    }

    /// Number of committed seat rows.
    pub fn count_seats(&self) -> usize {
        self.store.count(Table::Seats)
    }
}
