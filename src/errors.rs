use std::time::Duration;

use thiserror::Error;

use crate::model::RowKey;
use crate::simulation::unit::UnitRole;

/// Errors surfaced by a transactional store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("row {0} not found")]
    RowNotFound(RowKey),

    #[error("row {0} holds an unexpected record type")]
    UnexpectedRecord(RowKey),

    #[error("transaction conflict detected")]
    TransactionConflict,

    #[error("storage error: {0}")]
    Backend(String),
}

/// A failure produced by one of the two simulation units, tagged with the
/// unit that produced it. Unit errors are collected into the simulation
/// result rather than propagated; one failing unit never tears down the
/// other unit or the coordinator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("{role} failed to begin a transaction: {source}")]
    Begin { role: UnitRole, source: StoreError },

    #[error("{role} read failed: {source}")]
    Read { role: UnitRole, source: StoreError },

    #[error("{role} write failed: {source}")]
    Write { role: UnitRole, source: StoreError },

    #[error("{role} commit failed: {source}")]
    Commit { role: UnitRole, source: StoreError },

    #[error("{role} did not complete within {timeout:?}")]
    Timeout { role: UnitRole, timeout: Duration },
}

impl UnitError {
    /// The unit that produced this error.
    pub fn role(&self) -> UnitRole {
        match self {
            Self::Begin { role, .. }
            | Self::Read { role, .. }
            | Self::Write { role, .. }
            | Self::Commit { role, .. }
            | Self::Timeout { role, .. } => *role,
        }
    }
}

/// An isolation-level selector outside the supported range. Rejected before
/// any transaction work starts.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid isolation level selector {0}, expected 1-4")]
pub struct InvalidLevel(pub u8);

pub type Result<T> = std::result::Result<T, StoreError>;
