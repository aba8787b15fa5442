use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::InvalidLevel;

/// Defines the isolation levels a transactional store can be driven at.
///
/// Isolation levels determine how concurrent transactions interact with each
/// other and the degree to which one transaction's committed effects are
/// visible to another that is already in flight. Higher levels provide
/// stronger guarantees about what a transaction may observe, at the cost of
/// reduced concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// **Read Uncommitted:**
    ///
    /// The weakest level. A transaction may observe changes made by other
    /// transactions that have not committed yet, where the store supports
    /// dirty reads at all. Stores that buffer writes until commit cannot
    /// produce a dirty read, and on such stores this level behaves like
    /// [`IsolationLevel::ReadCommitted`].
    ReadUncommitted,

    /// **Read Committed:**
    ///
    /// Any value read is committed at the moment it is read. If the same
    /// row is read more than once within a transaction, it may carry a
    /// different value each time, because other transactions may commit
    /// changes to it in between. This level prevents dirty reads but allows
    /// non-repeatable reads.
    ReadCommitted,

    /// **Repeatable Read:**
    ///
    /// Once a transaction has read a row, every subsequent read of that row
    /// within the same transaction returns the same value, regardless of
    /// what other transactions commit in the meantime.
    RepeatableRead,

    /// **Serializable:**
    ///
    /// The strongest level. Transactions behave as if they had executed one
    /// after another; read access behaves as with
    /// [`IsolationLevel::RepeatableRead`], and a writing transaction whose
    /// reads have become stale by commit time is aborted.
    Serializable,
}

impl IsolationLevel {
    /// All supported levels, in selector order.
    pub const ALL: [Self; 4] = [
        Self::ReadUncommitted,
        Self::ReadCommitted,
        Self::RepeatableRead,
        Self::Serializable,
    ];

    /// Resolves the numeric selector used on the command surface (1-4).
    ///
    /// This is the single source of truth for the mapping; any other value
    /// is rejected with [`InvalidLevel`] before any transaction is opened.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLevel`] if `selector` is outside `1..=4`.
    pub fn from_selector(selector: u8) -> Result<Self, InvalidLevel> {
        match selector {
            1 => Ok(Self::ReadUncommitted),
            2 => Ok(Self::ReadCommitted),
            3 => Ok(Self::RepeatableRead),
            4 => Ok(Self::Serializable),
            other => Err(InvalidLevel(other)),
        }
    }

    /// The numeric selector for this level.
    pub const fn selector(self) -> u8 {
        match self {
            Self::ReadUncommitted => 1,
            Self::ReadCommitted => 2,
            Self::RepeatableRead => 3,
            Self::Serializable => 4,
        }
    }

    /// Whether reads at this level must return the same value for the same
    /// row throughout the transaction.
    pub(crate) const fn repeatable(self) -> bool {
        matches!(self, Self::RepeatableRead | Self::Serializable)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadUncommitted => "Read Uncommitted",
            Self::ReadCommitted => "Read Committed",
            Self::RepeatableRead => "Repeatable Read",
            Self::Serializable => "Serializable",
        };
        f.write_str(name)
    }
}
