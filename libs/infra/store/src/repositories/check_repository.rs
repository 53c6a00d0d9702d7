// [libs/infra/store/src/repositories/check_repository.rs]
//! Append-only `Check` inserts, always issued inside the Persister's
//! transaction ("TargetState transitions happen
//! strictly after the corresponding Check row exists, same transaction").

use chrono::{DateTime, Utc};
use libsql::params;
use monitor_core_probe::ProbeResult;
use tracing::instrument;

use crate::errors::StoreError;

pub struct CheckRepository;

impl CheckRepository {
    #[instrument(skip(connection, result))]
    pub async fn insert_with_connection(
        connection: &libsql::Connection,
        result: &ProbeResult,
        timestamp_utc: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        connection
            .execute(
                "INSERT INTO checks (
                    target_id, timestamp_utc, tcp_ok, http_ok, http_status_code,
                    tcp_latency_ms, http_latency_ms, final_url, used_ip,
                    detected_login_type, login_detected, summary
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
                params![
                    result.target_id,
                    timestamp_utc.to_rfc3339(),
                    result.tcp_ok as i64,
                    result.http_ok as i64,
                    result.http_status_code,
                    result.tcp_latency_ms,
                    result.http_latency_ms,
                    result.final_url.clone(),
                    result.used_ip.clone(),
                    result.detected_login_type.clone(),
                    result.login_detected as i64,
                    result.summary.clone(),
                ],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(connection.last_insert_rowid())
    }
}
