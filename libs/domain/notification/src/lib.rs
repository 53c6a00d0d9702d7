// [libs/domain/notification/src/lib.rs]
/*!
 * =================================================================
 * APARATO: ALERT SIGNAL CONTRACTS (V1.0)
 * CLASIFICACION: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICION DE LAS SENALES QUE EMITE EL ALERT EVALUATOR
 *
 * AlertSignal es la unica forma en que el evaluador de alertas habla con
 * los remitentes (monitor-infra-notify::{smtp,webhook}): un tipo, dos
 * proyecciones (EmailMessage, WebhookPayload). El evaluador nunca
 * construye un mensaje SMTP o un cuerpo JSON directamente.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use monitor_domain_models::EventType;
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// What kind of transition this signal reports. Mirrors
/// `monitor_domain_models::EventType` minus the non-alerting `Error` arm.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    Down,
    DownRepeat,
    Recovered,
}

impl AlertKind {
    pub fn as_event_type(self) -> EventType {
        match self {
            AlertKind::Down => EventType::AlertDown,
            AlertKind::DownRepeat => EventType::AlertDownRepeat,
            AlertKind::Recovered => EventType::AlertRecovered,
        }
    }
}

/// An outage or recovery notice the Alert Evaluator has decided to send.
/// Built once, then handed to every enabled channel (SMTP recipients and
/// webhook endpoints) for that instance.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSignal {
    pub instance_id: String,
    pub instance_display_name: String,
    pub target_id: i64,
    pub url: String,
    pub kind: AlertKind,
    pub is_up: bool,
    pub state_since_utc: DateTime<Utc>,
    pub timestamp_utc: DateTime<Utc>,
    pub consecutive_failures: u32,
    pub summary: String,
    pub login_detected_ever: bool,
    pub login_detected_last: bool,
}

impl AlertSignal {
    pub fn is_degraded(&self) -> bool {
        self.login_detected_ever && !self.login_detected_last
    }

    /// Short human label for subject lines and webhook payloads.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            AlertKind::Down => "DOWN",
            AlertKind::DownRepeat => "STILL DOWN",
            AlertKind::Recovered => "RECOVERED",
        }
    }
}

/// Rendered email ready to hand to the SMTP sender.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// JSON body posted to a webhook endpoint. The first eight fields are the
/// wire contract verbatim
/// (`{eventType, instanceId, targetId, url, isUp, stateSinceUtc,
/// timestampUtc, summary}`) and must not be renamed without a version
/// bump; `degraded` is an additive field carrying the display-only
/// classification.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event_type: AlertKind,
    pub instance_id: String,
    pub target_id: i64,
    pub url: String,
    pub is_up: bool,
    pub state_since_utc: DateTime<Utc>,
    pub timestamp_utc: DateTime<Utc>,
    pub summary: String,
    pub degraded: bool,
}

impl From<&AlertSignal> for WebhookPayload {
    fn from(signal: &AlertSignal) -> Self {
        Self {
            event_type: signal.kind,
            instance_id: signal.instance_id.clone(),
            target_id: signal.target_id,
            url: signal.url.clone(),
            is_up: signal.is_up,
            state_since_utc: signal.state_since_utc,
            timestamp_utc: signal.timestamp_utc,
            summary: signal.summary.clone(),
            degraded: signal.is_degraded(),
        }
    }
}
