// [apps/monitor/tests/alert_evaluator_test.rs]
//! Integration coverage for the Alert Evaluator against a real in-memory
//! store and fake notification senders: the cold-down threshold, channel
//! isolation (one channel failing must not block the other), the
//! "neither channel configured" no-op path, and that a Degraded target
//! never reaches the evaluator's DOWN branch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use monitor_app::alert::{AlertDefaults, AlertEvaluator, Notifier};
use monitor_app::scheduler::RuntimeManager;
use monitor_core_probe::{ProbeEngine, ReqwestProbeClient, TokioTcpDialer, TrustDnsResolver};
use monitor_core_timezone::SystemTimeZoneResolver;
use monitor_domain_models::{Instance, SmtpSecurityMode, SmtpSettings, Target, TargetState};
use monitor_domain_notification::EmailMessage;
use monitor_infra_notify::{NotifyError, Protector, SmtpSender, WebhookSender, SMTP_PASSWORD_PURPOSE};
use monitor_infra_store::{
    EventRepository, InstanceRepository, NotificationChannelRepository, Persister, StoreClient,
    StoreGate, TargetRepository, TargetStateRepository,
};

struct RecordingSmtpSender {
    fail: bool,
    sent_to: Mutex<Vec<String>>,
}

#[async_trait]
impl SmtpSender for RecordingSmtpSender {
    async fn send(&self, _settings: &SmtpSettings, _password_plain: Option<&str>, to: &str, _message: &EmailMessage) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::SmtpConnectFailure("refused by relay".into()));
        }
        self.sent_to.lock().unwrap().push(to.to_string());
        Ok(())
    }
}

struct RecordingWebhookSender {
    fail: bool,
    posted: Mutex<Vec<String>>,
}

#[async_trait]
impl WebhookSender for RecordingWebhookSender {
    async fn send(&self, endpoint: &monitor_domain_models::WebhookEndpoint, _payload: &monitor_domain_notification::WebhookPayload) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::WebhookRejection { status: 500, body: "boom".into() });
        }
        self.posted.lock().unwrap().push(endpoint.url.clone());
        Ok(())
    }
}

async fn fresh_store() -> StoreClient {
    StoreClient::connect("file::memory:?cache=shared", None)
        .await
        .expect("in-memory store should connect")
}

fn instance(instance_id: &str) -> Instance {
    Instance {
        instance_id: instance_id.into(),
        display_name: "Acme Prod".into(),
        enabled: true,
        is_paused: false,
        paused_until_utc: None,
        check_interval_seconds: 3600,
        concurrency_limit: 4,
        time_zone_id: "Etc/UTC".into(),
        created_utc: Utc::now(),
        down_after_seconds: Some(60),
        recovered_after_seconds: Some(60),
        repeat_every_seconds_under24h: Some(1800),
        repeat_every_seconds_24h_to72h: Some(3600),
        daily_after_hours: Some(72),
        daily_hour_local: Some(10),
        daily_minute_local: Some(0),
        last_crash_message: None,
        last_crash_utc: None,
    }
}

fn target(target_id: i64, instance_id: &str) -> Target {
    Target {
        target_id,
        instance_id: instance_id.into(),
        url: "https://acme.example/".into(),
        enabled: true,
        http_expected_status_min: 200,
        http_expected_status_max: 399,
        login_rule: None,
    }
}

fn down_state(target_id: i64, since: chrono::DateTime<Utc>) -> TargetState {
    TargetState {
        target_id,
        is_up: false,
        last_check_utc: since,
        state_since_utc: since,
        last_change_utc: since,
        consecutive_failures: 5,
        last_summary: "TCP FAIL; HTTP FAIL".into(),
        last_final_url: None,
        last_used_ip: None,
        last_detected_login_type: None,
        login_detected_last: false,
        login_detected_ever: false,
        down_first_notified_utc: None,
        last_notified_utc: None,
        next_notify_utc: None,
        recovered_due_utc: None,
        recovered_notified_utc: None,
    }
}

/// Builds an evaluator wired against `client`, with a Running-but-idle
/// worker for `instance_id` (no targets reach the probe engine, so no
/// real network I/O happens) so `AlertEvaluator::tick` walks it.
async fn harness(
    client: &StoreClient,
    instance_id: &str,
    smtp: Arc<dyn SmtpSender>,
    webhook: Arc<dyn WebhookSender>,
) -> (Arc<AlertEvaluator>, Arc<RuntimeManager>) {
    let instance_repo = InstanceRepository::new(client.clone());
    let target_repo = TargetRepository::new(client.clone());
    let target_state_repo = TargetStateRepository::new(client.clone());
    let event_repo = EventRepository::new(client.clone());
    let channel_repo = NotificationChannelRepository::new(client.clone());

    let dns = Box::new(TrustDnsResolver::from_system_config().expect("dns resolver"));
    let tcp = Box::new(TokioTcpDialer);
    let http = Box::new(ReqwestProbeClient::new().expect("http client"));
    let probe_engine = Arc::new(ProbeEngine::new(dns, tcp, http));
    let gate = StoreGate::new();
    let persister = Arc::new(Persister::new(client.clone(), gate.clone()));
    let probe_cycle = Arc::new(monitor_app::probe_cycle::ProbeCycle::new(
        instance_repo.clone(),
        target_repo.clone(),
        probe_engine,
        persister,
    ));

    let runtime_manager = Arc::new(RuntimeManager::new(probe_cycle, instance_repo.clone()));
    runtime_manager.start(instance_id);

    let protector = Arc::new(Protector::from_raw_material([3u8; 32]));
    let notifier = Notifier::new(channel_repo, protector, smtp, webhook);

    let evaluator = Arc::new(AlertEvaluator::new(
        runtime_manager.clone(),
        instance_repo,
        target_repo,
        target_state_repo,
        event_repo,
        notifier,
        Arc::new(SystemTimeZoneResolver),
        gate,
        15,
        AlertDefaults {
            down_after_seconds: 60,
            recovered_after_seconds: 60,
            repeat_every_seconds_under24h: 1800,
            repeat_every_seconds_24h_to72h: 3600,
            daily_after_hours: 72,
            daily_hour_local: 10,
            daily_minute_local: 0,
        },
    ));

    (evaluator, runtime_manager)
}

#[tokio::test]
async fn sends_down_alert_via_webhook_when_email_unconfigured() {
    let client = fresh_store().await;
    let instance_id = "acme-prod";
    InstanceRepository::new(client.clone()).upsert(&instance(instance_id)).await.unwrap();
    let target_id = TargetRepository::new(client.clone()).insert(&target(0, instance_id)).await.unwrap();

    let since = Utc::now() - chrono::Duration::seconds(120);
    TargetStateRepository::new(client.clone()).upsert(&down_state(target_id, since)).await.unwrap();

    let connection = client.get_connection().unwrap();
    connection
        .execute(
            "INSERT INTO webhook_endpoints (instance_id, url, enabled) VALUES (?1, ?2, 1)",
            libsql::params![instance_id, "https://hooks.example/acme"],
        )
        .await
        .unwrap();

    let webhook = Arc::new(RecordingWebhookSender { fail: false, posted: Mutex::new(Vec::new()) });
    let smtp = Arc::new(RecordingSmtpSender { fail: false, sent_to: Mutex::new(Vec::new()) });
    let (evaluator, runtime_manager) = harness(&client, instance_id, smtp, webhook.clone()).await;

    evaluator.tick().await;
    runtime_manager.stop(instance_id).await;

    assert_eq!(webhook.posted.lock().unwrap().as_slice(), ["https://hooks.example/acme".to_string()]);

    let states = TargetStateRepository::new(client).load_for_instance(instance_id).await.unwrap();
    assert!(states[0].down_first_notified_utc.is_some(), "a delivered Down alert must stamp downFirstNotifiedUtc");
}

#[tokio::test]
async fn email_failure_does_not_block_webhook_delivery() {
    let client = fresh_store().await;
    let instance_id = "acme-prod";
    InstanceRepository::new(client.clone()).upsert(&instance(instance_id)).await.unwrap();
    let target_id = TargetRepository::new(client.clone()).insert(&target(0, instance_id)).await.unwrap();

    let since = Utc::now() - chrono::Duration::seconds(120);
    TargetStateRepository::new(client.clone()).upsert(&down_state(target_id, since)).await.unwrap();

    let channel_repo = NotificationChannelRepository::new(client.clone());
    channel_repo
        .upsert_smtp_settings(&SmtpSettings {
            instance_id: instance_id.into(),
            host: "smtp.acme.example".into(),
            port: 587,
            security_mode: SmtpSecurityMode::StartTls,
            username: None,
            password_protected: None,
            from_address: "alerts@acme.example".into(),
        })
        .await
        .unwrap();

    let connection = client.get_connection().unwrap();
    connection
        .execute(
            "INSERT INTO recipients (instance_id, email, enabled) VALUES (?1, ?2, 1)",
            libsql::params![instance_id, "ops@acme.example"],
        )
        .await
        .unwrap();
    connection
        .execute(
            "INSERT INTO webhook_endpoints (instance_id, url, enabled) VALUES (?1, ?2, 1)",
            libsql::params![instance_id, "https://hooks.example/acme"],
        )
        .await
        .unwrap();

    let webhook = Arc::new(RecordingWebhookSender { fail: false, posted: Mutex::new(Vec::new()) });
    let smtp = Arc::new(RecordingSmtpSender { fail: true, sent_to: Mutex::new(Vec::new()) });
    let (evaluator, runtime_manager) = harness(&client, instance_id, smtp, webhook.clone()).await;

    evaluator.tick().await;
    runtime_manager.stop(instance_id).await;

    assert_eq!(webhook.posted.lock().unwrap().len(), 1, "webhook must still deliver despite the smtp failure");

    let states = TargetStateRepository::new(client).load_for_instance(instance_id).await.unwrap();
    assert!(states[0].down_first_notified_utc.is_some(), "overall delivery succeeded via webhook, so bookkeeping still advances");
}

#[tokio::test]
async fn unconfigured_instance_never_calls_either_sender() {
    let client = fresh_store().await;
    let instance_id = "acme-prod";
    InstanceRepository::new(client.clone()).upsert(&instance(instance_id)).await.unwrap();
    let target_id = TargetRepository::new(client.clone()).insert(&target(0, instance_id)).await.unwrap();

    let since = Utc::now() - chrono::Duration::seconds(120);
    TargetStateRepository::new(client.clone()).upsert(&down_state(target_id, since)).await.unwrap();

    let webhook = Arc::new(RecordingWebhookSender { fail: false, posted: Mutex::new(Vec::new()) });
    let smtp = Arc::new(RecordingSmtpSender { fail: false, sent_to: Mutex::new(Vec::new()) });
    let (evaluator, runtime_manager) = harness(&client, instance_id, smtp, webhook.clone()).await;

    evaluator.tick().await;
    runtime_manager.stop(instance_id).await;

    assert!(webhook.posted.lock().unwrap().is_empty());

    let states = TargetStateRepository::new(client).load_for_instance(instance_id).await.unwrap();
    assert!(states[0].down_first_notified_utc.is_none(), "with nothing configured, no delivery means no bookkeeping advance");
}

#[tokio::test]
async fn stop_cancels_a_running_worker_within_the_wait_cap() {
    let client = fresh_store().await;
    let instance_id = "acme-prod";
    InstanceRepository::new(client.clone()).upsert(&instance(instance_id)).await.unwrap();

    let webhook: Arc<dyn WebhookSender> = Arc::new(RecordingWebhookSender { fail: false, posted: Mutex::new(Vec::new()) });
    let smtp: Arc<dyn SmtpSender> = Arc::new(RecordingSmtpSender { fail: false, sent_to: Mutex::new(Vec::new()) });
    let (_evaluator, runtime_manager) = harness(&client, instance_id, smtp, webhook).await;

    assert!(runtime_manager.try_get(instance_id).is_some());
    tokio::time::timeout(Duration::from_secs(5), runtime_manager.stop(instance_id))
        .await
        .expect("stop must never hang past its own wait cap");
}
