// [apps/monitor/src/probe_cycle.rs]
//! One instance's probe cycle, step by step: read the Instance, decide
//! whether to probe at all, fan the enabled Targets out under a
//! concurrency limit, hand the batch to the Persister, and report back
//! how long the worker loop should sleep before the next cycle.

use std::sync::Arc;

use chrono::Utc;
use monitor_core_probe::{ProbeEngine, ProbeResult};
use monitor_infra_store::{InstanceRepository, Persister, TargetRepository};
use tokio::sync::Semaphore;
use tracing::{instrument, warn};

/// Cadence used when an Instance row is missing or disabled — wait and
/// retry in both cases.
const IDLE_RETRY_SECONDS: u64 = 30;

pub struct ProbeCycle {
    instance_repo: InstanceRepository,
    target_repo: TargetRepository,
    probe_engine: Arc<ProbeEngine>,
    persister: Arc<Persister>,
}

impl ProbeCycle {
    pub fn new(instance_repo: InstanceRepository, target_repo: TargetRepository, probe_engine: Arc<ProbeEngine>, persister: Arc<Persister>) -> Self {
        Self { instance_repo, target_repo, probe_engine, persister }
    }

    /// Runs one cycle for `instance_id`, returning the number of seconds
    /// the caller's worker loop should sleep before the next one.
    #[instrument(skip(self))]
    pub async fn run_once(&self, instance_id: &str) -> u64 {
        let instance = match self.instance_repo.get(instance_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => {
                warn!(instance_id, "instance row missing, backing off");
                return IDLE_RETRY_SECONDS;
            }
            Err(error) => {
                warn!(%error, instance_id, "failed to read instance, backing off");
                return IDLE_RETRY_SECONDS;
            }
        };

        if !instance.enabled {
            return IDLE_RETRY_SECONDS;
        }

        let now = Utc::now();
        if instance.is_paused_at(now) {
            return instance.check_interval_seconds as u64;
        }

        let targets = match self.target_repo.list_enabled_for_instance(instance_id).await {
            Ok(targets) => targets,
            Err(error) => {
                warn!(%error, instance_id, "failed to list targets, skipping this cycle");
                return instance.check_interval_seconds as u64;
            }
        };

        if targets.is_empty() {
            return instance.check_interval_seconds as u64;
        }

        let semaphore = Arc::new(Semaphore::new(instance.concurrency_limit.max(1) as usize));
        let mut tasks = Vec::with_capacity(targets.len());

        for target in targets {
            let semaphore = semaphore.clone();
            let engine = self.probe_engine.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                engine.probe(&target).await
            }));
        }

        let mut results: Vec<ProbeResult> = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => results.push(result),
                Err(error) => warn!(%error, instance_id, "probe task panicked, dropping its result"),
            }
        }

        self.persister.persist_cycle(&results, Utc::now()).await;

        instance.check_interval_seconds as u64
    }
}
