use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::debug;

use crate::errors::{Result, StoreError, UnitError};
use crate::isolation::IsolationLevel;
use crate::model::{Record, RowKey};
use crate::simulation::observation::{ObservationLog, ReadObservation, ReadSlot};
use crate::store::{OpenTransaction, StoreTransaction, TransactionalStore};

/// Identifies which of the two concurrent units produced an error or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    Reader,
    Writer,
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reader => "reader",
            Self::Writer => "writer",
        })
    }
}

/// Completion report a unit sends to the coordinator. A unit that abandons
/// its run at the deadline sends nothing; the coordinator tags it as timed
/// out.
#[derive(Debug)]
pub(crate) enum UnitReport {
    Reader {
        error: Option<UnitError>,
    },
    Writer {
        committed_at: Option<Duration>,
        error: Option<UnitError>,
    },
}

/// Gate endpoints handed to the reader unit. Dropping an endpoint releases
/// the peer waiting on it, so a unit that exits early never wedges the
/// other.
pub(crate) struct ReaderGates {
    /// Released once the first read is recorded.
    pub writer_start: Sender<()>,
    /// Waited on before the second read.
    pub writer_done: Receiver<()>,
}

/// Gate endpoints handed to the writer unit.
pub(crate) struct WriterGates {
    pub start: Receiver<()>,
    pub done: Sender<()>,
}

/// The reader script: begin, read #1, release the writer, wait for the
/// writer's commit attempt, read #2, commit. Observations go to the shared
/// log as they are produced. Returns `None` when the deadline passed while
/// waiting on the gate; the transaction is rolled back on that path.
pub(crate) fn run_reader<S: TransactionalStore>(
    store: &S,
    level: IsolationLevel,
    subject: RowKey,
    gates: ReaderGates,
    log: &ObservationLog,
    epoch: Instant,
    deadline: Instant,
) -> Option<UnitReport> {
    let role = UnitRole::Reader;

    let txn = match store.begin(level) {
        Ok(txn) => txn,
        Err(source) => {
            return Some(UnitReport::Reader { error: Some(UnitError::Begin { role, source }) });
        }
    };
    let mut txn = OpenTransaction::new(txn);

    let first = match read_capacity(&mut txn, &subject) {
        Ok(value) => value,
        Err(source) => {
            return Some(UnitReport::Reader { error: Some(UnitError::Read { role, source }) });
        }
    };
    log.append(ReadObservation {
        transaction_id: txn.id(),
        slot: ReadSlot::First,
        value: first,
        at: epoch.elapsed(),
    });
    debug!(value = first, "reader recorded first read");

    // Release the writer; a dead peer is its own report's problem.
    let _ = gates.writer_start.send(());

    match gates.writer_done.recv_deadline(deadline) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        Err(RecvTimeoutError::Timeout) => {
            debug!("reader abandoned waiting for the writer");
            return None;
        }
    }

    let second = match read_capacity(&mut txn, &subject) {
        Ok(value) => value,
        Err(source) => {
            return Some(UnitReport::Reader { error: Some(UnitError::Read { role, source }) });
        }
    };
    log.append(ReadObservation {
        transaction_id: txn.id(),
        slot: ReadSlot::Second,
        value: second,
        at: epoch.elapsed(),
    });
    debug!(value = second, "reader recorded second read");

    // A failed commit keeps both observations; the store rolls back itself.
    match txn.commit() {
        Ok(()) => Some(UnitReport::Reader { error: None }),
        Err(source) => Some(UnitReport::Reader { error: Some(UnitError::Commit { role, source }) }),
    }
}

/// The writer script: wait for the reader's first read, then begin,
/// read-modify-write the subject's capacity by `delta`, commit, and release
/// the reader. The release happens whatever the commit outcome, so the
/// reader's second read is never blocked on a failed writer.
pub(crate) fn run_writer<S: TransactionalStore>(
    store: &S,
    level: IsolationLevel,
    subject: RowKey,
    delta: i64,
    gates: WriterGates,
    epoch: Instant,
    deadline: Instant,
) -> Option<UnitReport> {
    match gates.start.recv_deadline(deadline) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
        Err(RecvTimeoutError::Timeout) => {
            debug!("writer abandoned waiting for the reader");
            return None;
        }
    }

    let report = write_once(store, level, subject, delta, epoch);
    let _ = gates.done.send(());
    Some(report)
}

fn write_once<S: TransactionalStore>(
    store: &S,
    level: IsolationLevel,
    subject: RowKey,
    delta: i64,
    epoch: Instant,
) -> UnitReport {
    let role = UnitRole::Writer;
    let failed = |error| UnitReport::Writer { committed_at: None, error: Some(error) };

    let txn = match store.begin(level) {
        Ok(txn) => txn,
        Err(source) => return failed(UnitError::Begin { role, source }),
    };
    let mut txn = OpenTransaction::new(txn);

    let mut train = match txn.read(&subject) {
        Ok(Some(Record::Train(train))) => train,
        Ok(Some(_)) => {
            return failed(UnitError::Read { role, source: StoreError::UnexpectedRecord(subject) });
        }
        Ok(None) => {
            return failed(UnitError::Read { role, source: StoreError::RowNotFound(subject) });
        }
        Err(source) => return failed(UnitError::Read { role, source }),
    };
    debug!(from = train.capacity, delta, "writer updating capacity");
    train.capacity += delta;

    if let Err(source) = txn.write(subject, Record::Train(train)) {
        return failed(UnitError::Write { role, source });
    }

    match txn.commit() {
        Ok(()) => UnitReport::Writer { committed_at: Some(epoch.elapsed()), error: None },
        Err(source) => failed(UnitError::Commit { role, source }),
    }
}

fn read_capacity<T: StoreTransaction>(
    txn: &mut OpenTransaction<T>,
    key: &RowKey,
) -> Result<i64> {
    let record = txn.read(key)?.ok_or(StoreError::RowNotFound(*key))?;
    record
        .as_train()
        .map(|train| train.capacity)
        .ok_or(StoreError::UnexpectedRecord(*key))
}
