// [apps/monitor/src/bootstrap.rs]
/*!
 * =================================================================
 * APARATO: MONITOR KERNEL (V1.0)
 * CLASIFICACION: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: ENSAMBLAJE DE TODOS LOS COMPONENTES Y SU IGNICION
 *
 * Un unico punto donde se conectan Store, Notify, Probe y Scheduler
 * antes de levantar ningun daemon. Sin capa HTTP/GraphQL — este proceso
 * no escucha ningun puerto.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use monitor_core_probe::{ProbeEngine, ReqwestProbeClient, TokioTcpDialer, TrustDnsResolver};
use monitor_core_timezone::SystemTimeZoneResolver;
use monitor_infra_notify::{LettreSmtpSender, Protector, ReqwestWebhookSender};
use monitor_infra_store::{
    EventRepository, InstanceRepository, NotificationChannelRepository, Persister, StoreClient,
    StoreGate, TargetRepository, TargetStateRepository,
};
use tracing::{info, instrument};

use crate::alert::{AlertEvaluator, Notifier};
use crate::config::Config;
use crate::probe_cycle::ProbeCycle;
use crate::scheduler::RuntimeManager;

/// How often the crash-reaper sweep runs ("periodically
/// mark abandoned tasks `Crashed`"). Not user-configurable — same
/// cadence regardless of instance count.
const CRASH_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Owns every long-lived component the process needs, assembled once
/// at startup and handed to the daemons that actually run.
pub struct MonitorKernel {
    pub runtime_manager: Arc<RuntimeManager>,
    pub alert_evaluator: Arc<AlertEvaluator>,
}

impl MonitorKernel {
    /// Connects the store, derives every repository and service from
    /// it, and wires the scheduler and alert evaluator together. Panics
    /// on unrecoverable startup failures (bad DATABASE_URL, DNS
    /// resolver init failure) — there is nothing useful to degrade to.
    #[instrument(skip(config))]
    pub async fn ignite(config: &Config) -> Self {
        tokio::fs::create_dir_all(&config.data_root)
            .await
            .expect("FATAL: unable to create data root directory");

        let store_client = StoreClient::connect(&config.database_url, config.database_auth_token.clone())
            .await
            .expect("FATAL: store connection failed, ignition aborted");
        let gate = StoreGate::new();

        let instance_repo = InstanceRepository::new(store_client.clone());
        let target_repo = TargetRepository::new(store_client.clone());
        let target_state_repo = TargetStateRepository::new(store_client.clone());
        let event_repo = EventRepository::new(store_client.clone());
        let channel_repo = NotificationChannelRepository::new(store_client.clone());

        let protector = Arc::new(
            Protector::open(&config.data_root)
                .await
                .expect("FATAL: credential protector failed to open"),
        );

        let dns = Box::new(TrustDnsResolver::from_system_config().expect("FATAL: dns resolver init failed"));
        let tcp = Box::new(TokioTcpDialer);
        let http = Box::new(ReqwestProbeClient::new().expect("FATAL: http probe client init failed"));
        let probe_engine = Arc::new(ProbeEngine::new(dns, tcp, http));

        let persister = Arc::new(Persister::new(store_client.clone(), gate.clone()));
        let probe_cycle = Arc::new(ProbeCycle::new(instance_repo.clone(), target_repo.clone(), probe_engine, persister));

        let runtime_manager = Arc::new(RuntimeManager::new(probe_cycle, instance_repo.clone()));

        let smtp_sender = Arc::new(LettreSmtpSender);
        let webhook_sender = Arc::new(ReqwestWebhookSender::new());
        let notifier = Notifier::new(channel_repo, protector, smtp_sender, webhook_sender);

        let timezone_resolver = Arc::new(SystemTimeZoneResolver);

        let alert_evaluator = Arc::new(AlertEvaluator::new(
            runtime_manager.clone(),
            instance_repo,
            target_repo,
            target_state_repo,
            event_repo,
            notifier,
            timezone_resolver,
            gate,
            config.scheduler_tick_seconds,
            config.alert_defaults.clone(),
        ));

        info!("monitor kernel ignited");

        Self { runtime_manager, alert_evaluator }
    }

    /// Starts a worker for every already-enabled Instance, then spawns
    /// the alert ticker and the crash-reaper sweep as background
    /// daemons. Returns immediately — the caller blocks the process.
    pub async fn launch(self) {
        self.runtime_manager.auto_start_enabled().await;

        let evaluator = self.alert_evaluator.clone();
        tokio::spawn(async move { evaluator.run().await });

        let runtime_manager = self.runtime_manager.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CRASH_SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                runtime_manager.sweep_crashed().await;
            }
        });

        info!("scheduler and alert evaluator online");
    }
}
