// [libs/infra/store/src/repositories/target_state_repository.rs]
//! `TargetState` reads/writes. The Persister loads a batch in one query
//! then upserts each row inside the same transaction
//! the matching `Check` insert lives in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use libsql::params;
use monitor_domain_models::TargetState;
use tracing::instrument;

use crate::client::StoreClient;
use crate::errors::StoreError;

pub struct TargetStateRepository {
    client: StoreClient,
}

impl TargetStateRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Loads every `TargetState` row for the given ids in one query.
    #[instrument(skip(self, target_ids))]
    pub async fn load_many(&self, target_ids: &[i64]) -> Result<HashMap<i64, TargetState>, StoreError> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let connection = self.client.get_connection()?;
        let placeholders = target_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT target_id, is_up, last_check_utc, state_since_utc, last_change_utc,
                    consecutive_failures, last_summary, last_final_url, last_used_ip,
                    last_detected_login_type, login_detected_last, login_detected_ever,
                    down_first_notified_utc, last_notified_utc, next_notify_utc,
                    recovered_due_utc, recovered_notified_utc
             FROM target_state WHERE target_id IN ({placeholders})"
        );
        let mut rows = connection.query(&sql, ()).await?;

        let mut by_target = HashMap::new();
        while let Some(row) = rows.next().await? {
            let state = map_row(&row)?;
            by_target.insert(state.target_id, state);
        }
        Ok(by_target)
    }

    /// Same query as `load_many`, but against a caller-supplied connection
    /// so the Persister can read prior state inside its own transaction.
    #[instrument(skip(self, connection, target_ids))]
    pub async fn load_many_with_connection(
        &self,
        connection: &libsql::Connection,
        target_ids: &[i64],
    ) -> Result<HashMap<i64, TargetState>, StoreError> {
        if target_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = target_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT target_id, is_up, last_check_utc, state_since_utc, last_change_utc,
                    consecutive_failures, last_summary, last_final_url, last_used_ip,
                    last_detected_login_type, login_detected_last, login_detected_ever,
                    down_first_notified_utc, last_notified_utc, next_notify_utc,
                    recovered_due_utc, recovered_notified_utc
             FROM target_state WHERE target_id IN ({placeholders})"
        );
        let mut rows = connection.query(&sql, ()).await?;

        let mut by_target = HashMap::new();
        while let Some(row) = rows.next().await? {
            let state = map_row(&row)?;
            by_target.insert(state.target_id, state);
        }
        Ok(by_target)
    }

    /// All states for an instance's targets, for the Alert Evaluator's
    /// per-tick snapshot.
    #[instrument(skip(self))]
    pub async fn load_for_instance(&self, instance_id: &str) -> Result<Vec<TargetState>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT ts.target_id, ts.is_up, ts.last_check_utc, ts.state_since_utc,
                        ts.last_change_utc, ts.consecutive_failures, ts.last_summary,
                        ts.last_final_url, ts.last_used_ip, ts.last_detected_login_type,
                        ts.login_detected_last, ts.login_detected_ever,
                        ts.down_first_notified_utc, ts.last_notified_utc, ts.next_notify_utc,
                        ts.recovered_due_utc, ts.recovered_notified_utc
                 FROM target_state ts
                 JOIN targets t ON t.target_id = ts.target_id
                 WHERE t.instance_id = ?1",
                params![instance_id],
            )
            .await?;

        let mut states = Vec::new();
        while let Some(row) = rows.next().await? {
            states.push(map_row(&row)?);
        }
        Ok(states)
    }

    /// Writes back a single `TargetState` row on its own connection — the
    /// Alert Evaluator's per-target commit ("updates
    /// alert-tracking fields on the state row"), outside of any probe-cycle
    /// transaction.
    #[instrument(skip(self, state))]
    pub async fn upsert(&self, state: &TargetState) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        self.upsert_with_connection(&connection, state).await
    }

    /// Same write, against a caller-supplied connection — the Persister's
    /// per-target upsert run inside its own probe-cycle transaction.
    #[instrument(skip(self, connection, state))]
    pub async fn upsert_with_connection(
        &self,
        connection: &libsql::Connection,
        state: &TargetState,
    ) -> Result<(), StoreError> {
        connection
            .execute(
                "INSERT INTO target_state (
                    target_id, is_up, last_check_utc, state_since_utc, last_change_utc,
                    consecutive_failures, last_summary, last_final_url, last_used_ip,
                    last_detected_login_type, login_detected_last, login_detected_ever,
                    down_first_notified_utc, last_notified_utc, next_notify_utc,
                    recovered_due_utc, recovered_notified_utc
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
                 ON CONFLICT(target_id) DO UPDATE SET
                    is_up = excluded.is_up,
                    last_check_utc = excluded.last_check_utc,
                    state_since_utc = excluded.state_since_utc,
                    last_change_utc = excluded.last_change_utc,
                    consecutive_failures = excluded.consecutive_failures,
                    last_summary = excluded.last_summary,
                    last_final_url = excluded.last_final_url,
                    last_used_ip = excluded.last_used_ip,
                    last_detected_login_type = excluded.last_detected_login_type,
                    login_detected_last = excluded.login_detected_last,
                    login_detected_ever = excluded.login_detected_ever,
                    down_first_notified_utc = excluded.down_first_notified_utc,
                    last_notified_utc = excluded.last_notified_utc,
                    next_notify_utc = excluded.next_notify_utc,
                    recovered_due_utc = excluded.recovered_due_utc,
                    recovered_notified_utc = excluded.recovered_notified_utc",
                params![
                    state.target_id,
                    state.is_up as i64,
                    state.last_check_utc.to_rfc3339(),
                    state.state_since_utc.to_rfc3339(),
                    state.last_change_utc.to_rfc3339(),
                    state.consecutive_failures,
                    state.last_summary.clone(),
                    state.last_final_url.clone(),
                    state.last_used_ip.clone(),
                    state.last_detected_login_type.clone(),
                    state.login_detected_last as i64,
                    state.login_detected_ever as i64,
                    state.down_first_notified_utc.map(|ts| ts.to_rfc3339()),
                    state.last_notified_utc.map(|ts| ts.to_rfc3339()),
                    state.next_notify_utc.map(|ts| ts.to_rfc3339()),
                    state.recovered_due_utc.map(|ts| ts.to_rfc3339()),
                    state.recovered_notified_utc.map(|ts| ts.to_rfc3339()),
                ],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(())
    }
}

pub(crate) fn parse_ts(value: String) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| StoreError::MappingError(error.to_string()))
}

pub(crate) fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(parse_ts).transpose()
}

pub(crate) fn map_row(row: &libsql::Row) -> Result<TargetState, StoreError> {
    Ok(TargetState {
        target_id: row.get(0)?,
        is_up: row.get::<i64>(1)? != 0,
        last_check_utc: parse_ts(row.get(2)?)?,
        state_since_utc: parse_ts(row.get(3)?)?,
        last_change_utc: parse_ts(row.get(4)?)?,
        consecutive_failures: row.get::<i64>(5)? as u32,
        last_summary: row.get(6)?,
        last_final_url: row.get(7)?,
        last_used_ip: row.get(8)?,
        last_detected_login_type: row.get(9)?,
        login_detected_last: row.get::<i64>(10)? != 0,
        login_detected_ever: row.get::<i64>(11)? != 0,
        down_first_notified_utc: parse_opt_ts(row.get(12)?)?,
        last_notified_utc: parse_opt_ts(row.get(13)?)?,
        next_notify_utc: parse_opt_ts(row.get(14)?)?,
        recovered_due_utc: parse_opt_ts(row.get(15)?)?,
        recovered_notified_utc: parse_opt_ts(row.get(16)?)?,
    })
}
