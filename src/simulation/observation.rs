use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use crate::errors::UnitError;
use crate::isolation::IsolationLevel;

/// Which of the reader's two reads produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ReadSlot {
    First,
    Second,
}

/// A single value observed by the reader transaction. Immutable once
/// appended to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadObservation {
    /// The reader transaction that produced the observation.
    pub transaction_id: u64,
    pub slot: ReadSlot,
    /// The subject train's capacity as read.
    pub value: i64,
    /// Offset from the start of the simulation run.
    pub at: Duration,
}

/// Ordered, append-only record of the values read during a run, shared
/// between the reader unit and the coordinator so that observations survive
/// even when the unit that produced them never completes.
#[derive(Debug, Default)]
pub struct ObservationLog {
    entries: Mutex<Vec<ReadObservation>>,
}

impl ObservationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, observation: ReadObservation) {
        self.entries.lock().push(observation);
    }

    /// All observations in append order.
    pub fn snapshot(&self) -> Vec<ReadObservation> {
        self.entries.lock().clone()
    }

    pub(crate) fn find(&self, slot: ReadSlot) -> Option<ReadObservation> {
        self.entries
            .lock()
            .iter()
            .find(|observation| observation.slot == slot)
            .cloned()
    }
}

/// Outcome of one simulation run.
///
/// Always produced, even when units failed or timed out; partial
/// information (a single successful read, a writer error) is surfaced here
/// rather than discarded.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub level: IsolationLevel,
    pub first_read: Option<ReadObservation>,
    pub second_read: Option<ReadObservation>,
    /// Offset at which the writer's commit returned success, if it did.
    pub writer_committed_at: Option<Duration>,
    pub anomaly_detected: bool,
    /// Per-unit failures, reader's first.
    pub errors: Vec<UnitError>,
}

impl SimulationResult {
    pub(crate) fn assemble(
        level: IsolationLevel,
        log: &ObservationLog,
        writer_committed_at: Option<Duration>,
        errors: Vec<UnitError>,
    ) -> Self {
        let first_read = log.find(ReadSlot::First);
        let second_read = log.find(ReadSlot::Second);
        // The anomaly requires two successful reads with different values
        // and the writer's commit landing strictly between them.
        let anomaly_detected = match (&first_read, &second_read, writer_committed_at) {
            (Some(first), Some(second), Some(committed)) => {
                first.value != second.value && first.at < committed && committed < second.at
            }
            _ => false,
        };
        Self {
            level,
            first_read,
            second_read,
            writer_committed_at,
            anomaly_detected,
            errors,
        }
    }

    /// Whether both reads completed and no unit failed.
    pub fn is_conclusive(&self) -> bool {
        self.errors.is_empty() && self.first_read.is_some() && self.second_read.is_some()
    }

    /// Whether the run ended because the wait was abandoned.
    pub fn timed_out(&self) -> bool {
        self.errors
            .iter()
            .any(|error| matches!(error, UnitError::Timeout { .. }))
    }
}
