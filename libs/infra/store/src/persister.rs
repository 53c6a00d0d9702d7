// [libs/infra/store/src/persister.rs]
/*!
 * APARATO: PERSISTER (V1.0)
 *
 * Un lote de `ProbeResult` se convierte, dentro de una unica
 * transaccion bajo el Store Gate, en filas `Check` append-only y un
 * upsert de `TargetState` por objetivo.
 */

use chrono::{DateTime, Utc};
use monitor_core_probe::ProbeResult;
use monitor_domain_models::TargetState;
use tracing::{instrument, warn};

use crate::client::StoreClient;
use crate::errors::StoreError;
use crate::gate::StoreGate;
use crate::repositories::check_repository::CheckRepository;
use crate::repositories::target_state_repository::TargetStateRepository;

pub struct Persister {
    client: StoreClient,
    gate: StoreGate,
    target_state_repo: TargetStateRepository,
}

impl Persister {
    pub fn new(client: StoreClient, gate: StoreGate) -> Self {
        let target_state_repo = TargetStateRepository::new(client.clone());
        Self {
            client,
            gate,
            target_state_repo,
        }
    }

    /// Persists one probe cycle's results. On a non-transient store
    /// error the batch is dropped and logged — the scheduler must never
    /// block on a failed persist.
    #[instrument(skip(self, results))]
    pub async fn persist_cycle(&self, results: &[ProbeResult], now: DateTime<Utc>) {
        if results.is_empty() {
            return;
        }

        let outcome = self
            .gate
            .write(|| self.persist_once(results, now))
            .await;

        if let Err(error) = outcome {
            warn!(%error, batch_size = results.len(), "dropping probe-cycle batch after persist failure");
        }
    }

    async fn persist_once(&self, results: &[ProbeResult], now: DateTime<Utc>) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        let transaction = connection.transaction().await.map_err(StoreError::from_libsql)?;

        let target_ids: Vec<i64> = {
            let mut ids: Vec<i64> = results.iter().map(|result| result.target_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let prior_states = self
            .target_state_repo
            .load_many_with_connection(&transaction, &target_ids)
            .await?;

        for result in results {
            CheckRepository::insert_with_connection(&transaction, result, now).await?;

            let next_state = apply_result(prior_states.get(&result.target_id), result, now);
            self.target_state_repo
                .upsert_with_connection(&transaction, &next_state)
                .await?;
        }

        transaction.commit().await.map_err(StoreError::from_libsql)?;
        Ok(())
    }
}

/// Pure state-transition function, kept free of I/O
/// so the invariants in  are unit-testable without a database.
pub fn apply_result(prior: Option<&TargetState>, result: &ProbeResult, ts: DateTime<Utc>) -> TargetState {
    let new_is_up = result.tcp_ok && result.http_ok;

    match prior {
        None => TargetState {
            target_id: result.target_id,
            is_up: new_is_up,
            last_check_utc: ts,
            state_since_utc: ts,
            last_change_utc: ts,
            consecutive_failures: if new_is_up { 0 } else { 1 },
            last_summary: result.summary.clone(),
            last_final_url: result.final_url.clone(),
            last_used_ip: result.used_ip.clone(),
            last_detected_login_type: result.detected_login_type.clone(),
            login_detected_last: result.login_detected,
            login_detected_ever: result.login_detected,
            down_first_notified_utc: None,
            last_notified_utc: None,
            next_notify_utc: None,
            recovered_due_utc: None,
            recovered_notified_utc: None,
        },
        Some(prior) => {
            let flipped = new_is_up != prior.is_up;
            let mut next = prior.clone();

            next.last_check_utc = ts;
            next.last_summary = result.summary.clone();
            next.last_final_url = result.final_url.clone().or_else(|| prior.last_final_url.clone());
            next.last_used_ip = result.used_ip.clone().or_else(|| prior.last_used_ip.clone());

            if result.http_status_code.is_some() {
                next.login_detected_ever = prior.login_detected_ever || result.login_detected;
                next.login_detected_last = result.login_detected;
                next.last_detected_login_type = result.detected_login_type.clone();
            }

            next.is_up = new_is_up;
            if flipped {
                next.state_since_utc = ts;
                next.last_change_utc = ts;
                next.consecutive_failures = if new_is_up { 0 } else { 1 };
                if !new_is_up {
                    // A fresh outage starts: the prior outage's alert
                    // fields (if any) no longer describe anything live.
                    next.clear_outage_bookkeeping();
                }
            } else {
                next.consecutive_failures = if new_is_up { 0 } else { prior.consecutive_failures + 1 };
            }
            next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(target_id: i64, ok: bool, http_status: Option<u16>) -> ProbeResult {
        ProbeResult {
            target_id,
            tcp_ok: ok,
            tcp_latency_ms: Some(5),
            used_ip: Some("1.2.3.4".into()),
            http_ok: ok,
            http_status_code: http_status,
            http_latency_ms: Some(10),
            final_url: Some("https://example.com/".into()),
            login_detected: false,
            detected_login_type: None,
            summary: "TCP OK (5ms); HTTP OK (200, 10ms)".into(),
        }
    }

    #[test]
    fn cold_start_sets_state_since_to_first_timestamp() {
        let ts = Utc::now();
        let state = apply_result(None, &result(1, true, Some(200)), ts);
        assert!(state.is_up);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.state_since_utc, ts);
    }

    #[test]
    fn consecutive_failures_increment_while_down() {
        let t0 = Utc::now();
        let down = result(1, false, None);
        let first = apply_result(None, &down, t0);
        assert_eq!(first.consecutive_failures, 1);

        let t1 = t0 + chrono::Duration::seconds(60);
        let second = apply_result(Some(&first), &down, t1);
        assert_eq!(second.consecutive_failures, 2);
        assert_eq!(second.state_since_utc, t0, "state_since_utc must not move while isUp is unchanged");
    }

    #[test]
    fn flip_to_up_resets_failures_and_moves_state_since() {
        let t0 = Utc::now();
        let down_state = apply_result(None, &result(1, false, None), t0);
        let t1 = t0 + chrono::Duration::seconds(120);
        let recovered = apply_result(Some(&down_state), &result(1, true, Some(200)), t1);

        assert!(recovered.is_up);
        assert_eq!(recovered.consecutive_failures, 0);
        assert_eq!(recovered.state_since_utc, t1);
    }

    #[test]
    fn login_fields_frozen_when_status_code_is_null() {
        let t0 = Utc::now();
        let mut up = result(1, true, Some(200));
        up.login_detected = true;
        up.detected_login_type = Some("PasswordForm".into());
        let state = apply_result(None, &up, t0);
        assert!(state.login_detected_ever);

        let t1 = t0 + chrono::Duration::seconds(30);
        let mut transport_failure = result(1, false, None);
        transport_failure.login_detected = false;
        let next = apply_result(Some(&state), &transport_failure, t1);

        // httpStatusCode is null on a transport failure, so login fields
        // must not move even though the probe reports no login detected.
        assert!(next.login_detected_ever);
        assert!(next.login_detected_last, "login_detected_last must be frozen, not overwritten with false");
    }

    #[test]
    fn fresh_outage_clears_prior_outage_alert_bookkeeping() {
        let t0 = Utc::now();
        let mut recovered = apply_result(None, &result(1, true, Some(200)), t0);
        // Simulate a fully-notified prior outage: recoveredNotifiedUtc is
        // the only field `apply_delivered` leaves set after AlertRecovered.
        recovered.recovered_notified_utc = Some(t0);

        let t1 = t0 + chrono::Duration::seconds(60);
        let down_again = apply_result(Some(&recovered), &result(1, false, None), t1);

        assert!(!down_again.is_up);
        assert!(down_again.recovered_notified_utc.is_none());
        assert!(down_again.down_first_notified_utc.is_none());
        assert!(down_again.recovered_due_utc.is_none());
    }

    #[test]
    fn login_detected_ever_is_non_decreasing() {
        let t0 = Utc::now();
        let mut login_seen = result(1, true, Some(200));
        login_seen.login_detected = true;
        let state = apply_result(None, &login_seen, t0);
        assert!(state.login_detected_ever);

        let t1 = t0 + chrono::Duration::seconds(30);
        let mut no_login = result(1, true, Some(200));
        no_login.login_detected = false;
        let next = apply_result(Some(&state), &no_login, t1);

        assert!(next.login_detected_ever, "loginDetectedEver must never clear");
        assert!(!next.login_detected_last);
    }
}
