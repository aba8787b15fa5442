//! Railway reference data with a concurrent transaction isolation simulator.
//!
//! The crate keeps stations, trains, and seats in an in-memory transactional
//! store ([`MemoryStore`]) and exposes plain reference-data operations over
//! them ([`Catalog`]). Its one non-trivial feature is the
//! [`simulation`] module: a harness that drives two concurrent transactions
//! against the same train row to probe whether the requested
//! [`IsolationLevel`] permits a non-repeatable read.

pub mod catalog;
pub mod errors;
pub mod isolation;
pub mod memory;
pub mod model;
pub mod simulation;
pub mod store;

pub use catalog::Catalog;
pub use errors::{InvalidLevel, StoreError, UnitError};
pub use isolation::IsolationLevel;
pub use memory::{MemoryStore, MemoryTransaction};
pub use model::{Record, RowKey, Seat, Station, Table, Train};
pub use simulation::{
    ObservationLog, ReadObservation, ReadSlot, SimulationConfig, SimulationResult, UnitRole,
    run_simulation, run_simulation_for_selector,
};
pub use store::{OpenTransaction, StoreTransaction, TransactionalStore};
