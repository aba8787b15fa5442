use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded};
use tracing::debug;

use crate::errors::{InvalidLevel, UnitError};
use crate::isolation::IsolationLevel;
use crate::model::RowKey;
use crate::simulation::observation::{ObservationLog, SimulationResult};
use crate::simulation::unit::{self, ReaderGates, UnitReport, UnitRole, WriterGates};
use crate::store::TransactionalStore;

/// Parameters of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub level: IsolationLevel,
    /// The train row both units target.
    pub subject: RowKey,
    /// The writer's capacity increment.
    pub delta: i64,
    /// Bound on the coordinator's wait for both units.
    pub timeout: Duration,
}

impl SimulationConfig {
    pub fn new(level: IsolationLevel, subject: RowKey) -> Self {
        Self { level, subject, delta: 1, timeout: Duration::from_secs(5) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validates a raw 1-4 selector, then runs the simulation.
///
/// # Errors
///
/// Returns [`InvalidLevel`] for a selector outside `1..=4`; the store is
/// not touched in that case.
pub fn run_simulation_for_selector<S: TransactionalStore>(
    store: &Arc<S>,
    selector: u8,
    subject: RowKey,
    timeout: Duration,
) -> Result<SimulationResult, InvalidLevel> {
    let level = IsolationLevel::from_selector(selector)?;
    let config = SimulationConfig::new(level, subject).with_timeout(timeout);
    Ok(run_simulation(store, &config))
}

/// Runs one simulation: spawns the reader and writer units against the
/// shared store, waits for both to report or for the timeout to elapse,
/// and assembles the verdict.
///
/// The timeout abandons the coordinator's wait only; an in-flight store
/// call is never cancelled, and a unit that is past its gates is allowed to
/// finish its commit. Units that did not report by the deadline are tagged
/// with [`UnitError::Timeout`].
///
/// A successful writer permanently changes the subject row's committed
/// capacity; consecutive runs observe each other's effects.
pub fn run_simulation<S: TransactionalStore>(
    store: &Arc<S>,
    config: &SimulationConfig,
) -> SimulationResult {
    let epoch = Instant::now();
    let deadline = epoch + config.timeout;
    let log = Arc::new(ObservationLog::new());

    // Rendezvous gates: reader read #1 -> writer begin, writer commit
    // attempt -> reader read #2.
    let (start_tx, start_rx) = bounded::<()>(0);
    let (done_tx, done_rx) = bounded::<()>(0);
    let (report_tx, report_rx) = unbounded::<UnitReport>();

    debug!(level = %config.level, subject = %config.subject, "simulation started");

    // The handles are dropped rather than joined: past the deadline the
    // units are detached, never cancelled.
    let _reader = {
        let store = Arc::clone(store);
        let log = Arc::clone(&log);
        let report_tx = report_tx.clone();
        let config = config.clone();
        thread::spawn(move || {
            let gates = ReaderGates { writer_start: start_tx, writer_done: done_rx };
            let report = unit::run_reader(
                store.as_ref(),
                config.level,
                config.subject,
                gates,
                log.as_ref(),
                epoch,
                deadline,
            );
            if let Some(report) = report {
                let _ = report_tx.send(report);
            }
        })
    };

    let _writer = {
        let store = Arc::clone(store);
        let report_tx = report_tx.clone();
        let config = config.clone();
        thread::spawn(move || {
            let gates = WriterGates { start: start_rx, done: done_tx };
            let report = unit::run_writer(
                store.as_ref(),
                config.level,
                config.subject,
                config.delta,
                gates,
                epoch,
                deadline,
            );
            if let Some(report) = report {
                let _ = report_tx.send(report);
            }
        })
    };
    drop(report_tx);

    let mut reader_done = false;
    let mut reader_error = None;
    let mut writer_done = false;
    let mut writer_error = None;
    let mut writer_committed_at = None;

    while !(reader_done && writer_done) {
        match report_rx.recv_deadline(deadline) {
            Ok(UnitReport::Reader { error }) => {
                reader_done = true;
                reader_error = error;
            }
            Ok(UnitReport::Writer { committed_at, error }) => {
                writer_done = true;
                writer_committed_at = committed_at;
                writer_error = error;
            }
            // Deadline passed, or every unit exited without reporting.
            Err(_) => break,
        }
    }

    let mut errors = Vec::new();
    match reader_error {
        Some(error) => errors.push(error),
        None if !reader_done => errors.push(UnitError::Timeout {
            role: UnitRole::Reader,
            timeout: config.timeout,
        }),
        None => {}
    }
    match writer_error {
        Some(error) => errors.push(error),
        None if !writer_done => errors.push(UnitError::Timeout {
            role: UnitRole::Writer,
            timeout: config.timeout,
        }),
        None => {}
    }

    let result = SimulationResult::assemble(config.level, &log, writer_committed_at, errors);
    debug!(
        anomaly = result.anomaly_detected,
        conclusive = result.is_conclusive(),
        "simulation finished"
    );
    result
}
