// [libs/infra/store/src/repositories/instance_repository.rs]
//! Instance CRUD plus the scheduler's auto-start query ("a
//! separate auto-start component... queries all Instances with
//! enabled = true").

use chrono::{DateTime, Utc};
use libsql::params;
use monitor_domain_models::Instance;
use tracing::{error, instrument};

use crate::client::StoreClient;
use crate::errors::StoreError;

#[derive(Clone)]
pub struct InstanceRepository {
    client: StoreClient,
}

impl InstanceRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, instance_id: &str) -> Result<Option<Instance>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT instance_id, display_name, enabled, is_paused, paused_until_utc,
                        check_interval_seconds, concurrency_limit, time_zone_id, created_utc,
                        down_after_seconds, recovered_after_seconds, repeat_every_seconds_under24h,
                        repeat_every_seconds_24h_to72h, daily_after_hours, daily_hour_local,
                        daily_minute_local, last_crash_message, last_crash_utc
                 FROM instances WHERE instance_id = ?1",
                params![instance_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(map_row(&row)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<Instance>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT instance_id, display_name, enabled, is_paused, paused_until_utc,
                        check_interval_seconds, concurrency_limit, time_zone_id, created_utc,
                        down_after_seconds, recovered_after_seconds, repeat_every_seconds_under24h,
                        repeat_every_seconds_24h_to72h, daily_after_hours, daily_hour_local,
                        daily_minute_local, last_crash_message, last_crash_utc
                 FROM instances WHERE enabled = 1",
                (),
            )
            .await?;

        let mut instances = Vec::new();
        while let Some(row) = rows.next().await? {
            instances.push(map_row(&row)?);
        }
        Ok(instances)
    }

    #[instrument(skip(self, instance))]
    pub async fn upsert(&self, instance: &Instance) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO instances (
                    instance_id, display_name, enabled, is_paused, paused_until_utc,
                    check_interval_seconds, concurrency_limit, time_zone_id, created_utc,
                    down_after_seconds, recovered_after_seconds, repeat_every_seconds_under24h,
                    repeat_every_seconds_24h_to72h, daily_after_hours, daily_hour_local,
                    daily_minute_local, last_crash_message, last_crash_utc
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)
                 ON CONFLICT(instance_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    enabled = excluded.enabled,
                    is_paused = excluded.is_paused,
                    paused_until_utc = excluded.paused_until_utc,
                    check_interval_seconds = excluded.check_interval_seconds,
                    concurrency_limit = excluded.concurrency_limit,
                    time_zone_id = excluded.time_zone_id,
                    down_after_seconds = excluded.down_after_seconds,
                    recovered_after_seconds = excluded.recovered_after_seconds,
                    repeat_every_seconds_under24h = excluded.repeat_every_seconds_under24h,
                    repeat_every_seconds_24h_to72h = excluded.repeat_every_seconds_24h_to72h,
                    daily_after_hours = excluded.daily_after_hours,
                    daily_hour_local = excluded.daily_hour_local,
                    daily_minute_local = excluded.daily_minute_local,
                    last_crash_message = excluded.last_crash_message,
                    last_crash_utc = excluded.last_crash_utc",
                params![
                    instance.instance_id.clone(),
                    instance.display_name.clone(),
                    instance.enabled as i64,
                    instance.is_paused as i64,
                    instance.paused_until_utc.map(|ts| ts.to_rfc3339()),
                    instance.check_interval_seconds,
                    instance.concurrency_limit,
                    instance.time_zone_id.clone(),
                    instance.created_utc.to_rfc3339(),
                    instance.down_after_seconds.map(|v| v as i64),
                    instance.recovered_after_seconds.map(|v| v as i64),
                    instance.repeat_every_seconds_under24h.map(|v| v as i64),
                    instance.repeat_every_seconds_24h_to72h.map(|v| v as i64),
                    instance.daily_after_hours.map(|v| v as i64),
                    instance.daily_hour_local.map(|v| v as i64),
                    instance.daily_minute_local.map(|v| v as i64),
                    instance.last_crash_message.clone(),
                    instance.last_crash_utc.map(|ts| ts.to_rfc3339()),
                ],
            )
            .await
            .map_err(|error| {
                error!(%error, instance_id = %instance.instance_id, "instance upsert failed");
                StoreError::from_libsql(error)
            })?;
        Ok(())
    }

    /// Records a worker crash breadcrumb so the UI can show it after a
    /// process restart.
    #[instrument(skip(self, message))]
    pub async fn record_crash(&self, instance_id: &str, message: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "UPDATE instances SET last_crash_message = ?1, last_crash_utc = ?2 WHERE instance_id = ?3",
                params![message, at.to_rfc3339(), instance_id],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(())
    }
}

fn map_row(row: &libsql::Row) -> Result<Instance, StoreError> {
    let parse_ts = |value: String| -> Result<DateTime<Utc>, StoreError> {
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|error| StoreError::MappingError(error.to_string()))
    };
    let parse_opt_ts = |value: Option<String>| -> Result<Option<DateTime<Utc>>, StoreError> {
        value.map(parse_ts).transpose()
    };

    Ok(Instance {
        instance_id: row.get(0)?,
        display_name: row.get(1)?,
        enabled: row.get::<i64>(2)? != 0,
        is_paused: row.get::<i64>(3)? != 0,
        paused_until_utc: parse_opt_ts(row.get(4)?)?,
        check_interval_seconds: row.get::<i64>(5)? as u32,
        concurrency_limit: row.get::<i64>(6)? as u32,
        time_zone_id: row.get(7)?,
        created_utc: parse_ts(row.get(8)?)?,
        down_after_seconds: row.get::<Option<i64>>(9)?.map(|v| v as u64),
        recovered_after_seconds: row.get::<Option<i64>>(10)?.map(|v| v as u64),
        repeat_every_seconds_under24h: row.get::<Option<i64>>(11)?.map(|v| v as u64),
        repeat_every_seconds_24h_to72h: row.get::<Option<i64>>(12)?.map(|v| v as u64),
        daily_after_hours: row.get::<Option<i64>>(13)?.map(|v| v as u64),
        daily_hour_local: row.get::<Option<i64>>(14)?.map(|v| v as u32),
        daily_minute_local: row.get::<Option<i64>>(15)?.map(|v| v as u32),
        last_crash_message: row.get(16)?,
        last_crash_utc: parse_opt_ts(row.get(17)?)?,
    })
}
