mod common;

use std::sync::Arc;

use common::{SUBJECT, committed_capacity, seeded_store};
use railyard::{
    Catalog, IsolationLevel, MemoryStore, OpenTransaction, Record, RowKey, Station, StoreError,
    StoreTransaction, Train, TransactionalStore,
};

fn train(id: u64, code: &str, capacity: i64) -> Record {
    Record::Train(Train { id, code: code.to_string(), capacity })
}

#[test]
fn transaction_ids_increment() {
    let store = MemoryStore::new();
    assert_eq!(store.begin(IsolationLevel::ReadCommitted).unwrap().id(), 0);
    assert_eq!(store.begin(IsolationLevel::ReadCommitted).unwrap().id(), 1);
}

#[test]
fn basic_read_write_commit() {
    let store = MemoryStore::new();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    txn.write(RowKey::train(1), train(1, "RE-1", 120)).unwrap();
    txn.commit().unwrap();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    let record = txn.read(&RowKey::train(1)).unwrap().unwrap();
    assert_eq!(record, train(1, "RE-1", 120));
    txn.commit().unwrap();
}

#[test]
fn staged_writes_are_read_back() {
    let store = MemoryStore::new();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    txn.write(RowKey::train(1), train(1, "RE-1", 120)).unwrap();
    let staged = txn.read(&RowKey::train(1)).unwrap().unwrap();
    assert_eq!(staged, train(1, "RE-1", 120));
    txn.rollback().unwrap();
}

#[test]
fn rollback_discards_staged_writes() {
    let store = MemoryStore::new();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    txn.write(RowKey::train(1), train(1, "RE-1", 120)).unwrap();
    txn.rollback().unwrap();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    assert!(txn.read(&RowKey::train(1)).unwrap().is_none());
    txn.commit().unwrap();
}

#[test]
fn delete_commit_removes_row() {
    let store = seeded_store(50);

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    txn.delete(SUBJECT);
    txn.commit().unwrap();

    let mut txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    assert!(txn.read(&SUBJECT).unwrap().is_none());
    txn.commit().unwrap();
}

#[test]
fn read_committed_sees_later_commits() {
    let store = seeded_store(50);

    let mut reader = store.begin(IsolationLevel::ReadCommitted).unwrap();
    let first = reader.read(&SUBJECT).unwrap().unwrap();
    assert_eq!(first.as_train().unwrap().capacity, 50);

    let mut writer = store.begin(IsolationLevel::ReadCommitted).unwrap();
    writer.write(SUBJECT, train(100, "EXP-100", 60)).unwrap();
    writer.commit().unwrap();

    let second = reader.read(&SUBJECT).unwrap().unwrap();
    assert_eq!(second.as_train().unwrap().capacity, 60);
    reader.commit().unwrap();
}

#[test]
fn repeatable_read_pins_first_value() {
    let store = seeded_store(50);

    let mut reader = store.begin(IsolationLevel::RepeatableRead).unwrap();
    let first = reader.read(&SUBJECT).unwrap().unwrap();
    assert_eq!(first.as_train().unwrap().capacity, 50);

    let mut writer = store.begin(IsolationLevel::ReadCommitted).unwrap();
    writer.write(SUBJECT, train(100, "EXP-100", 60)).unwrap();
    writer.commit().unwrap();

    // The reader keeps its pinned value; a fresh transaction sees the new one.
    let second = reader.read(&SUBJECT).unwrap().unwrap();
    assert_eq!(second.as_train().unwrap().capacity, 50);
    reader.commit().unwrap();

    assert_eq!(committed_capacity(&store), 60);
}

#[test]
fn serializable_commit_fails_on_stale_read() {
    let store = seeded_store(50);

    let mut stale = store.begin(IsolationLevel::Serializable).unwrap();
    let record = stale.read(&SUBJECT).unwrap().unwrap();
    assert_eq!(record.as_train().unwrap().capacity, 50);

    let mut winner = store.begin(IsolationLevel::ReadCommitted).unwrap();
    winner.write(SUBJECT, train(100, "EXP-100", 60)).unwrap();
    winner.commit().unwrap();

    stale.write(SUBJECT, train(100, "EXP-100", 51)).unwrap();
    assert_eq!(stale.commit(), Err(StoreError::TransactionConflict));

    // The losing transaction left no trace.
    assert_eq!(committed_capacity(&store), 60);
}

#[test]
fn read_only_commit_succeeds_despite_concurrent_writes() {
    let store = seeded_store(50);

    let mut reader = store.begin(IsolationLevel::Serializable).unwrap();
    reader.read(&SUBJECT).unwrap().unwrap();

    let mut writer = store.begin(IsolationLevel::ReadCommitted).unwrap();
    writer.write(SUBJECT, train(100, "EXP-100", 60)).unwrap();
    writer.commit().unwrap();

    reader.commit().unwrap();
}

#[test]
fn open_transaction_guard_rolls_back_on_drop() {
    let store = seeded_store(50);

    {
        let txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
        let mut guard = OpenTransaction::new(txn);
        guard.write(SUBJECT, train(100, "EXP-100", 99)).unwrap();
        // Dropped without commit.
    }

    assert_eq!(committed_capacity(&store), 50);
}

#[test]
fn open_transaction_commit_applies_staged_writes() {
    let store = seeded_store(50);

    let txn = store.begin(IsolationLevel::ReadCommitted).unwrap();
    let mut guard = OpenTransaction::new(txn);
    guard.write(SUBJECT, train(100, "EXP-100", 99)).unwrap();
    guard.commit().unwrap();

    assert_eq!(committed_capacity(&store), 99);
}

#[test]
fn catalog_station_crud() {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(Arc::clone(&store));

    let created = catalog
        .create_station("Turin".to_string(), "Porta Nuova".to_string())
        .unwrap();
    assert_eq!(created.id, 1);

    let fetched = catalog.station(created.id).unwrap();
    assert_eq!(fetched, created);

    let updated = catalog
        .update_station(Station {
            id: created.id,
            city: "Turin".to_string(),
            name: "Porta Susa".to_string(),
        })
        .unwrap();
    assert_eq!(catalog.station(created.id).unwrap(), updated);

    assert!(catalog.delete_station(created.id).unwrap());
    assert!(!catalog.delete_station(created.id).unwrap());
    assert_eq!(
        catalog.station(created.id),
        Err(StoreError::RowNotFound(RowKey::station(created.id)))
    );
}

#[test]
fn catalog_train_listing_is_ordered_by_id() {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(Arc::clone(&store));

    catalog.create_train("RE-1".to_string(), 120).unwrap();
    catalog.create_train("RE-2".to_string(), 80).unwrap();
    catalog.create_train("RE-3".to_string(), 200).unwrap();

    let trains = catalog.trains();
    let ids: Vec<u64> = trains.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn catalog_update_missing_train_is_row_not_found() {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(store);

    let result = catalog.update_train(Train {
        id: 7,
        code: "RE-7".to_string(),
        capacity: 10,
    });
    assert_eq!(result, Err(StoreError::RowNotFound(RowKey::train(7))));
}

#[test]
fn generate_seats_inserts_in_one_transaction() {
    let store = Arc::new(MemoryStore::new());
    let catalog = Catalog::new(Arc::clone(&store));

    assert_eq!(catalog.count_seats(), 0);
    let seats = catalog.generate_seats(5).unwrap();
    assert_eq!(seats.len(), 5);
    assert_eq!(catalog.count_seats(), 5);

    let more = catalog.generate_seats(3).unwrap();
    assert_eq!(more.len(), 3);
    assert_eq!(catalog.count_seats(), 8);
}

#[test]
fn seeding_advances_id_allocation() {
    let store = seeded_store(50);
    let catalog = Catalog::new(Arc::clone(&store));

    // The subject train was seeded at id 100; new trains must not collide.
    let created = catalog.create_train("RE-1".to_string(), 120).unwrap();
    assert_eq!(created.id, 101);
}
