// [apps/monitor/src/scheduler/worker.rs]
//! A single instance's cancellable scheduler loop: while not cancelled,
//! invoke one probe cycle and then sleep `intervalSeconds`. Uses
//! `tokio::select!` against a cancellation channel so `stop()` can
//! interrupt a sleeping worker immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{info, instrument};

use crate::probe_cycle::ProbeCycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Running,
    Paused,
    /// The scheduler task ended on its own without `stop()` ever being
    /// called — something inside the loop panicked ("never
    /// propagate panics out of a task").
    Crashed,
}

/// A UI/evaluator-facing read of one Worker's current state (:
/// "State transitions are recorded with a UTC timestamp and a short
/// message").
#[derive(Debug, Clone)]
pub struct WorkerSnapshot {
    pub instance_id: String,
    pub status: WorkerStatus,
    pub status_message: Option<String>,
    pub status_since_utc: DateTime<Utc>,
}

/// Runs one instance's scheduler loop until `cancel_rx` reports a stop
/// signal. Never returns an error: probe-cycle failures are already
/// swallowed and logged inside `ProbeCycle::run_once`.
#[instrument(skip(probe_cycle, cancel_rx), fields(instance_id = %instance_id))]
pub async fn run(instance_id: String, probe_cycle: Arc<ProbeCycle>, mut cancel_rx: watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow() {
            info!(instance_id, "scheduler loop observed cancellation before probing");
            return;
        }

        let interval_seconds = probe_cycle.run_once(&instance_id).await;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval_seconds)) => {}
            _ = cancel_rx.changed() => {
                info!(instance_id, "scheduler loop cancelled during sleep");
                return;
            }
        }
    }
}
