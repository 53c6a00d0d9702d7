// [apps/monitor/src/scheduler/runtime_manager.rs]
//! Concurrent map from instance id to scheduler Worker. The map itself
//! never awaits while locked — each entry either holds a live task
//! handle or doesn't — so a plain `std::sync::Mutex` is enough.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use monitor_infra_store::InstanceRepository;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use super::worker::{self, WorkerSnapshot, WorkerStatus};
use crate::probe_cycle::ProbeCycle;

/// How long `stop()` waits for a worker's task to exit on its own
/// before force-aborting it — never hang the caller.
const STOP_WAIT_CAP: Duration = Duration::from_secs(5);

struct WorkerEntry {
    status: WorkerStatus,
    status_message: Option<String>,
    status_since_utc: chrono::DateTime<Utc>,
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl WorkerEntry {
    fn snapshot(&self, instance_id: &str) -> WorkerSnapshot {
        WorkerSnapshot {
            instance_id: instance_id.to_string(),
            status: self.status,
            status_message: self.status_message.clone(),
            status_since_utc: self.status_since_utc,
        }
    }

    /// A task that finished without ever being cancelled through
    /// `stop()` has crashed — `is_finished()` is true but `status` is
    /// still `Running`.
    fn has_crashed(&self) -> bool {
        self.status == WorkerStatus::Running && self.task.as_ref().map(|task| task.is_finished()).unwrap_or(false)
    }
}

pub struct RuntimeManager {
    workers: Mutex<HashMap<String, WorkerEntry>>,
    probe_cycle: Arc<ProbeCycle>,
    instance_repo: InstanceRepository,
}

impl RuntimeManager {
    pub fn new(probe_cycle: Arc<ProbeCycle>, instance_repo: InstanceRepository) -> Self {
        Self { workers: Mutex::new(HashMap::new()), probe_cycle, instance_repo }
    }

    /// `start(instanceId)`: create or reuse a Worker; if already
    /// `Running` with a live task, no-op; else replace the cancellation
    /// handle and spawn the scheduler loop.
    #[instrument(skip(self))]
    pub fn start(&self, instance_id: &str) {
        let mut workers = self.workers.lock().expect("runtime manager map poisoned");

        if let Some(entry) = workers.get(instance_id) {
            if entry.status == WorkerStatus::Running && entry.task.as_ref().map(|task| !task.is_finished()).unwrap_or(false) {
                return;
            }
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(worker::run(instance_id.to_string(), self.probe_cycle.clone(), cancel_rx));

        info!(instance_id, "worker started");
        workers.insert(
            instance_id.to_string(),
            WorkerEntry {
                status: WorkerStatus::Running,
                status_message: Some("started".to_string()),
                status_since_utc: Utc::now(),
                cancel_tx,
                task: Some(task),
            },
        );
    }

    /// `stop(instanceId)`: transition to `Paused`, cancel the
    /// cancellation handle, await the task up to `STOP_WAIT_CAP` before
    /// force-aborting it.
    #[instrument(skip(self))]
    pub async fn stop(&self, instance_id: &str) {
        let task_to_await = {
            let mut workers = self.workers.lock().expect("runtime manager map poisoned");
            match workers.get_mut(instance_id) {
                Some(entry) => {
                    let _ = entry.cancel_tx.send(true);
                    entry.status = WorkerStatus::Paused;
                    entry.status_message = Some("stopped".to_string());
                    entry.status_since_utc = Utc::now();
                    entry.task.take()
                }
                None => None,
            }
        };

        if let Some(task) = task_to_await {
            let abort_handle = task.abort_handle();
            if tokio::time::timeout(STOP_WAIT_CAP, task).await.is_err() {
                warn!(instance_id, "worker did not stop within the wait cap, aborting");
                abort_handle.abort();
            }
        }
    }

    /// `restart`: stop then start.
    pub async fn restart(&self, instance_id: &str) {
        self.stop(instance_id).await;
        self.start(instance_id);
    }

    /// `tryGet`: current status for one instance, for UI display.
    pub fn try_get(&self, instance_id: &str) -> Option<WorkerSnapshot> {
        let workers = self.workers.lock().expect("runtime manager map poisoned");
        workers.get(instance_id).map(|entry| entry.snapshot(instance_id))
    }

    /// `getAll`: current statuses for every known Worker, for UI display
    /// and the Alert Evaluator's per-tick walk.
    pub fn get_all(&self) -> Vec<WorkerSnapshot> {
        let workers = self.workers.lock().expect("runtime manager map poisoned");
        workers.iter().map(|(instance_id, entry)| entry.snapshot(instance_id)).collect()
    }

    /// Marks a Worker `Crashed` if its task ended without `stop()` ever
    /// being called. Called periodically by the crash-reaper sweep and
    /// records the breadcrumb via `InstanceRepository`.
    #[instrument(skip(self))]
    pub async fn sweep_crashed(&self) {
        let crashed_ids: Vec<String> = {
            let mut workers = self.workers.lock().expect("runtime manager map poisoned");
            let mut found = Vec::new();
            for (instance_id, entry) in workers.iter_mut() {
                if entry.has_crashed() {
                    entry.status = WorkerStatus::Crashed;
                    entry.status_message = Some("scheduler task ended unexpectedly".to_string());
                    entry.status_since_utc = Utc::now();
                    entry.task = None;
                    found.push(instance_id.clone());
                }
            }
            found
        };

        for instance_id in &crashed_ids {
            warn!(instance_id, "worker crashed, recording breadcrumb");
            if let Err(error) = self
                .instance_repo
                .record_crash(instance_id, "scheduler task ended unexpectedly", Utc::now())
                .await
            {
                warn!(%error, instance_id, "failed to persist crash breadcrumb");
            }
        }
    }

    /// Auto-start-on-boot: queries all `enabled = true` Instances and
    /// invokes `start` on each.
    #[instrument(skip(self))]
    pub async fn auto_start_enabled(&self) {
        match self.instance_repo.list_enabled().await {
            Ok(instances) => {
                for instance in instances {
                    self.start(&instance.instance_id);
                }
            }
            Err(error) => warn!(%error, "failed to list enabled instances for auto-start"),
        }
    }
}
