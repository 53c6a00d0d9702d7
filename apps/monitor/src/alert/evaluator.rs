// [apps/monitor/src/alert/evaluator.rs]
//! The periodic ticker itself: a ticker (default 15s) iterates all
//! Workers. For each Running instance it evaluates every TargetState in
//! a fresh read/write session and emits at most one notification per
//! target per tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use monitor_core_timezone::{TimeZoneResolver, Zone};
use monitor_domain_models::{EventType, Instance, Target, TargetState};
use monitor_domain_notification::AlertSignal;
use monitor_infra_store::{EventRepository, InstanceRepository, StoreGate, TargetRepository, TargetStateRepository};
use tracing::{instrument, warn};

use super::decision::{apply_delivered, decide};
use super::ladder::{resolve_for_instance, AlertDefaults};
use super::notifier::{Delivery, Notifier};
use crate::scheduler::{RuntimeManager, WorkerStatus};

pub struct AlertEvaluator {
    runtime_manager: Arc<RuntimeManager>,
    instance_repo: InstanceRepository,
    target_repo: TargetRepository,
    target_state_repo: TargetStateRepository,
    event_repo: EventRepository,
    notifier: Notifier,
    timezone_resolver: Arc<dyn TimeZoneResolver>,
    gate: StoreGate,
    tick_seconds: u64,
    alert_defaults: AlertDefaults,
}

impl AlertEvaluator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime_manager: Arc<RuntimeManager>,
        instance_repo: InstanceRepository,
        target_repo: TargetRepository,
        target_state_repo: TargetStateRepository,
        event_repo: EventRepository,
        notifier: Notifier,
        timezone_resolver: Arc<dyn TimeZoneResolver>,
        gate: StoreGate,
        tick_seconds: u64,
        alert_defaults: AlertDefaults,
    ) -> Self {
        Self {
            runtime_manager,
            instance_repo,
            target_repo,
            target_state_repo,
            event_repo,
            notifier,
            timezone_resolver,
            gate,
            tick_seconds,
            alert_defaults,
        }
    }

    /// Runs the ticker loop forever. Intended to be spawned once at
    /// startup alongside the scheduler.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.tick_seconds.max(1)));
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Runs one evaluation pass over every Running instance. Exposed
    /// (mirroring `ProbeCycle::run_once`) so tests can drive a single
    /// tick deterministically instead of waiting on the ticker loop.
    #[instrument(skip(self))]
    pub async fn tick(&self) {
        let running_instance_ids: Vec<String> = self
            .runtime_manager
            .get_all()
            .into_iter()
            .filter(|worker| worker.status == WorkerStatus::Running)
            .map(|worker| worker.instance_id)
            .collect();

        for instance_id in running_instance_ids {
            self.evaluate_instance(&instance_id).await;
        }
    }

    async fn evaluate_instance(&self, instance_id: &str) {
        let instance = match self.instance_repo.get(instance_id).await {
            Ok(Some(instance)) => instance,
            Ok(None) => return,
            Err(error) => {
                warn!(%error, instance_id, "failed to read instance for alert evaluation");
                return;
            }
        };

        let states = match self.target_state_repo.load_for_instance(instance_id).await {
            Ok(states) => states,
            Err(error) => {
                warn!(%error, instance_id, "failed to load target states");
                return;
            }
        };
        if states.is_empty() {
            return;
        }

        let targets = match self.target_repo.list_all_for_instance(instance_id).await {
            Ok(targets) => targets,
            Err(error) => {
                warn!(%error, instance_id, "failed to load targets");
                return;
            }
        };
        let targets_by_id: HashMap<i64, Target> = targets.into_iter().map(|target| (target.target_id, target)).collect();

        let zone = self.timezone_resolver.resolve(&instance.time_zone_id);
        let ladder = resolve_for_instance(&instance, &self.alert_defaults);

        for state in &states {
            let Some(target) = targets_by_id.get(&state.target_id) else {
                continue;
            };
            self.evaluate_target(&instance, &ladder, &zone, state, target).await;
        }
    }

    async fn evaluate_target(
        &self,
        instance: &Instance,
        ladder: &AlertDefaults,
        zone: &Zone,
        state: &TargetState,
        target: &Target,
    ) {
        let now = Utc::now();
        let evaluation = decide(state, now, ladder);

        let Some(kind) = evaluation.due else {
            if evaluation.pending_state != *state {
                self.persist_state(&evaluation.pending_state).await;
            }
            return;
        };

        let signal = AlertSignal {
            instance_id: instance.instance_id.clone(),
            instance_display_name: instance.display_name.clone(),
            target_id: target.target_id,
            url: target.url.clone(),
            kind,
            is_up: state.is_up,
            state_since_utc: state.state_since_utc,
            timestamp_utc: now,
            consecutive_failures: state.consecutive_failures,
            summary: state.last_summary.clone(),
            login_detected_ever: state.login_detected_ever,
            login_detected_last: state.login_detected_last,
        };

        match self.notifier.dispatch(&signal, zone).await {
            Delivery::Delivered => {
                let final_state = apply_delivered(evaluation.pending_state, kind, now, zone, ladder);
                self.persist_state(&final_state).await;
                self.append_event(
                    instance,
                    Some(target.target_id),
                    kind.as_event_type(),
                    &format!("{} notification delivered for {}", signal.kind_label(), target.url),
                    now,
                )
                .await;
            }
            Delivery::Unconfigured => {
                if evaluation.pending_state != *state {
                    self.persist_state(&evaluation.pending_state).await;
                }
            }
            Delivery::Failed(reason) => {
                self.append_event(
                    instance,
                    Some(target.target_id),
                    EventType::Error,
                    &format!("{} notification failed for {}: {reason}", signal.kind_label(), target.url),
                    now,
                )
                .await;
            }
        }
    }

    async fn persist_state(&self, state: &TargetState) {
        let outcome = self.gate.write(|| async { self.target_state_repo.upsert(state).await }).await;
        if let Err(error) = outcome {
            warn!(%error, target_id = state.target_id, "failed to persist alert-evaluator state update");
        }
    }

    async fn append_event(&self, instance: &Instance, target_id: Option<i64>, event_type: EventType, message: &str, at: DateTime<Utc>) {
        let outcome = self
            .gate
            .write(|| self.event_repo.append(&instance.instance_id, target_id, event_type, message, at))
            .await;
        if let Err(error) = outcome {
            warn!(%error, instance_id = %instance.instance_id, "failed to append alert event");
        }
    }
}
