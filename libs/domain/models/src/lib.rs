// [libs/domain/models/src/lib.rs]
/*!
 * =================================================================
 * APARATO: MONITOR DOMAIN CONTRACTS (V1.0)
 * CLASIFICACION: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICION DE LAS ENTIDADES DEL MOTOR DE MONITOREO
 *
 * Instance / Target / Check / TargetState / Event / SmtpSettings /
 * Recipient / WebhookEndpoint son tipos de dominio puros: no conocen
 * al store, al scheduler ni a los canales de notificacion. El resto
 * del workspace depende de este crate; este crate no depende de nadie
 * salvo serde/chrono.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// A logically isolated monitoring tenant with its own targets, cadence,
/// recipients and webhooks.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Slug primary key, 1-64 chars, `[a-z0-9-]`.
    pub instance_id: String,
    pub display_name: String,
    pub enabled: bool,
    pub is_paused: bool,
    pub paused_until_utc: Option<DateTime<Utc>>,
    /// Cadence between probe cycles. Invariant: >= 5.
    pub check_interval_seconds: u32,
    /// Bounds probe fan-out within a cycle. Invariant: >= 1.
    pub concurrency_limit: u32,
    /// IANA zone identifier, resolved by `monitor-core-timezone`.
    pub time_zone_id: String,
    pub created_utc: DateTime<Utc>,

    // --- Per-instance alert ladder overrides ("per-instance
    // optional, otherwise global defaults"). None means inherit AlertDefaults.
    pub down_after_seconds: Option<u64>,
    pub recovered_after_seconds: Option<u64>,
    pub repeat_every_seconds_under24h: Option<u64>,
    pub repeat_every_seconds_24h_to72h: Option<u64>,
    pub daily_after_hours: Option<u64>,
    pub daily_hour_local: Option<u32>,
    pub daily_minute_local: Option<u32>,

    /// Breadcrumb for the UI control surface: the Runtime Manager is
    /// in-memory, so a crashed worker's last message needs to survive
    /// a process restart.
    pub last_crash_message: Option<String>,
    pub last_crash_utc: Option<DateTime<Utc>>,
}

impl Instance {
    /// A slug is `[a-z0-9-]{1,64}`, per this rule
    pub fn is_valid_slug(slug: &str) -> bool {
        !slug.is_empty()
            && slug.len() <= 64
            && slug
                .bytes()
                .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-'))
    }

    /// Whether the instance should be probed at all right now: `enabled`
    /// and not currently paused (either the sticky flag or a timed pause).
    pub fn is_actively_monitored(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.is_paused_at(now)
    }

    pub fn is_paused_at(&self, now: DateTime<Utc>) -> bool {
        self.is_paused || self.paused_until_utc.map(|until| until > now).unwrap_or(false)
    }
}

/// A single URL under surveillance within an instance.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub target_id: i64,
    pub instance_id: String,
    pub url: String,
    pub enabled: bool,
    pub http_expected_status_min: u16,
    pub http_expected_status_max: u16,
    pub login_rule: Option<String>,
}

impl Target {
    pub const DEFAULT_STATUS_MIN: u16 = 200;
    pub const DEFAULT_STATUS_MAX: u16 = 399;

    pub fn expects(&self, status: u16) -> bool {
        (self.http_expected_status_min..=self.http_expected_status_max).contains(&status)
    }
}

/// An append-only probe outcome record.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub check_id: i64,
    pub target_id: i64,
    pub timestamp_utc: DateTime<Utc>,
    pub tcp_ok: bool,
    pub http_ok: bool,
    pub http_status_code: Option<u16>,
    pub tcp_latency_ms: Option<u64>,
    pub http_latency_ms: Option<u64>,
    pub final_url: Option<String>,
    pub used_ip: Option<String>,
    pub detected_login_type: Option<String>,
    pub login_detected: bool,
    pub summary: String,
}

/// Display-only classification surfaced by the UI and alert bodies.
/// `Degraded` never triggers an alert.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DisplayStatus {
    Up,
    Down,
    Degraded,
}

/// Mutable 1:1 projection of a Target's current health and alert bookkeeping.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetState {
    pub target_id: i64,
    pub is_up: bool,
    pub last_check_utc: DateTime<Utc>,
    /// Instant of the last up<->down transition.
    pub state_since_utc: DateTime<Utc>,
    pub last_change_utc: DateTime<Utc>,
    pub consecutive_failures: u32,
    pub last_summary: String,
    pub last_final_url: Option<String>,
    pub last_used_ip: Option<String>,
    pub last_detected_login_type: Option<String>,
    pub login_detected_last: bool,
    /// Monotonic: never clears back to false once set.
    pub login_detected_ever: bool,

    // --- Alert-tracking fields ---
    pub down_first_notified_utc: Option<DateTime<Utc>>,
    pub last_notified_utc: Option<DateTime<Utc>>,
    pub next_notify_utc: Option<DateTime<Utc>>,
    pub recovered_due_utc: Option<DateTime<Utc>>,
    pub recovered_notified_utc: Option<DateTime<Utc>>,
}

impl TargetState {
    /// GLOSSARY: Degraded = isUp && loginDetectedEver && !loginDetectedLast.
    pub fn display_status(&self) -> DisplayStatus {
        if !self.is_up {
            DisplayStatus::Down
        } else if self.login_detected_ever && !self.login_detected_last {
            DisplayStatus::Degraded
        } else {
            DisplayStatus::Up
        }
    }

    /// Resets outage bookkeeping to the post-recovery null state
    /// ("recoveredNotifiedUtc set implies the
    /// outage's alert bookkeeping resets to null on next outage start").
    pub fn clear_outage_bookkeeping(&mut self) {
        self.down_first_notified_utc = None;
        self.last_notified_utc = None;
        self.next_notify_utc = None;
        self.recovered_due_utc = None;
        self.recovered_notified_utc = None;
    }
}

/// Append-only audit trail entry.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    AlertDown,
    AlertDownRepeat,
    AlertRecovered,
    Error,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_id: i64,
    pub instance_id: String,
    pub target_id: Option<i64>,
    pub timestamp_utc: DateTime<Utc>,
    pub event_type: EventType,
    pub message: String,
}

#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SmtpSecurityMode {
    None,
    SslTls,
    StartTls,
}

/// 1:1 SMTP configuration per instance. `password_protected` is opaque
/// ciphertext produced by the Protector (see `monitor-infra-notify::protector`).
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmtpSettings {
    pub instance_id: String,
    pub host: String,
    pub port: u16,
    pub security_mode: SmtpSecurityMode,
    pub username: Option<String>,
    pub password_protected: Option<String>,
    pub from_address: String,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub instance_id: String,
    pub email: String,
    pub enabled: bool,
}

#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEndpoint {
    pub instance_id: String,
    pub url: String,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_accepts_lowercase_alnum_and_dash() {
        assert!(Instance::is_valid_slug("site-1"));
        assert!(!Instance::is_valid_slug(""));
        assert!(!Instance::is_valid_slug("Has-Caps"));
        assert!(!Instance::is_valid_slug(&"a".repeat(65)));
    }

    #[test]
    fn degraded_requires_up_and_ever_but_not_last() {
        let mut state = TargetState {
            target_id: 1,
            is_up: true,
            last_check_utc: Utc::now(),
            state_since_utc: Utc::now(),
            last_change_utc: Utc::now(),
            consecutive_failures: 0,
            last_summary: String::new(),
            last_final_url: None,
            last_used_ip: None,
            last_detected_login_type: None,
            login_detected_last: false,
            login_detected_ever: true,
            down_first_notified_utc: None,
            last_notified_utc: None,
            next_notify_utc: None,
            recovered_due_utc: None,
            recovered_notified_utc: None,
        };
        assert_eq!(state.display_status(), DisplayStatus::Degraded);
        state.login_detected_last = true;
        assert_eq!(state.display_status(), DisplayStatus::Up);
        state.is_up = false;
        assert_eq!(state.display_status(), DisplayStatus::Down);
    }

    #[test]
    fn clear_outage_bookkeeping_nulls_all_alert_fields() {
        let mut state = TargetState {
            target_id: 1,
            is_up: true,
            last_check_utc: Utc::now(),
            state_since_utc: Utc::now(),
            last_change_utc: Utc::now(),
            consecutive_failures: 0,
            last_summary: String::new(),
            last_final_url: None,
            last_used_ip: None,
            last_detected_login_type: None,
            login_detected_last: false,
            login_detected_ever: false,
            down_first_notified_utc: Some(Utc::now()),
            last_notified_utc: Some(Utc::now()),
            next_notify_utc: Some(Utc::now()),
            recovered_due_utc: Some(Utc::now()),
            recovered_notified_utc: Some(Utc::now()),
        };
        state.clear_outage_bookkeeping();
        assert!(state.down_first_notified_utc.is_none());
        assert!(state.last_notified_utc.is_none());
        assert!(state.next_notify_utc.is_none());
        assert!(state.recovered_due_utc.is_none());
        assert!(state.recovered_notified_utc.is_none());
    }
}
