//! Concurrent transaction isolation simulator.
//!
//! The simulator provokes the "non-repeatable read" anomaly against a
//! [`TransactionalStore`](crate::store::TransactionalStore): a reader
//! transaction reads the same train row twice while a concurrent writer
//! transaction increments its capacity and commits in between. Whether the
//! second read observes the increment depends entirely on the isolation
//! level the store was asked for; the simulator's job is to stage the
//! interleaving deterministically and report what was observed.
//!
//! The interleaving is an ordering contract enforced by rendezvous gates,
//! not by timing: reader read #1 happens before the writer begins, and the
//! writer's commit attempt happens before reader read #2.

pub mod coordinator;
pub mod observation;
pub mod unit;

pub use coordinator::{SimulationConfig, run_simulation, run_simulation_for_selector};
pub use observation::{ObservationLog, ReadObservation, ReadSlot, SimulationResult};
pub use unit::UnitRole;
