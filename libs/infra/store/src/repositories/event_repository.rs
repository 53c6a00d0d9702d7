// [libs/infra/store/src/repositories/event_repository.rs]
//! Append-only audit trail: `AlertDown` / `AlertDownRepeat` /
//! `AlertRecovered` / `Error` rows emitted by the Alert Evaluator.

use chrono::{DateTime, Utc};
use libsql::params;
use monitor_domain_models::EventType;
use tracing::instrument;

use crate::client::StoreClient;
use crate::errors::StoreError;

pub struct EventRepository {
    client: StoreClient,
}

impl EventRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self, message))]
    pub async fn append(
        &self,
        instance_id: &str,
        target_id: Option<i64>,
        event_type: EventType,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO events (instance_id, target_id, timestamp_utc, event_type, message)
                 VALUES (?1,?2,?3,?4,?5)",
                params![instance_id, target_id, at.to_rfc3339(), event_type_label(event_type), message],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn recent_for_instance(&self, instance_id: &str, limit: i64) -> Result<Vec<(EventType, String, DateTime<Utc>)>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT event_type, message, timestamp_utc FROM events
                 WHERE instance_id = ?1 ORDER BY timestamp_utc DESC LIMIT ?2",
                params![instance_id, limit],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            let type_label: String = row.get(0)?;
            let message: String = row.get(1)?;
            let ts: String = row.get(2)?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|error| StoreError::MappingError(error.to_string()))?;
            events.push((parse_event_type(&type_label)?, message, timestamp));
        }
        Ok(events)
    }
}

fn event_type_label(event_type: EventType) -> &'static str {
    match event_type {
        EventType::AlertDown => "AlertDown",
        EventType::AlertDownRepeat => "AlertDownRepeat",
        EventType::AlertRecovered => "AlertRecovered",
        EventType::Error => "Error",
    }
}

fn parse_event_type(label: &str) -> Result<EventType, StoreError> {
    match label {
        "AlertDown" => Ok(EventType::AlertDown),
        "AlertDownRepeat" => Ok(EventType::AlertDownRepeat),
        "AlertRecovered" => Ok(EventType::AlertRecovered),
        "Error" => Ok(EventType::Error),
        other => Err(StoreError::MappingError(format!("unknown event_type {other}"))),
    }
}
