// [libs/infra/store/src/repositories/notification_channel_repository.rs]
//! SMTP settings, recipients and webhook endpoints: the configuration the
//! Alert Evaluator's notification fan-out reads per instance.

use libsql::params;
use monitor_domain_models::{Recipient, SmtpSettings, SmtpSecurityMode, WebhookEndpoint};
use tracing::instrument;

use crate::client::StoreClient;
use crate::errors::StoreError;

pub struct NotificationChannelRepository {
    client: StoreClient,
}

impl NotificationChannelRepository {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn get_smtp_settings(&self, instance_id: &str) -> Result<Option<SmtpSettings>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT instance_id, host, port, security_mode, username, password_protected, from_address
                 FROM smtp_settings WHERE instance_id = ?1",
                params![instance_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let security_mode_label: String = row.get(3)?;
                Ok(Some(SmtpSettings {
                    instance_id: row.get(0)?,
                    host: row.get(1)?,
                    port: row.get::<i64>(2)? as u16,
                    security_mode: parse_security_mode(&security_mode_label)?,
                    username: row.get(4)?,
                    password_protected: row.get(5)?,
                    from_address: row.get(6)?,
                }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, settings))]
    pub async fn upsert_smtp_settings(&self, settings: &SmtpSettings) -> Result<(), StoreError> {
        let connection = self.client.get_connection()?;
        connection
            .execute(
                "INSERT INTO smtp_settings (instance_id, host, port, security_mode, username, password_protected, from_address)
                 VALUES (?1,?2,?3,?4,?5,?6,?7)
                 ON CONFLICT(instance_id) DO UPDATE SET
                    host = excluded.host,
                    port = excluded.port,
                    security_mode = excluded.security_mode,
                    username = excluded.username,
                    password_protected = excluded.password_protected,
                    from_address = excluded.from_address",
                params![
                    settings.instance_id.clone(),
                    settings.host.clone(),
                    settings.port,
                    security_mode_label(settings.security_mode),
                    settings.username.clone(),
                    settings.password_protected.clone(),
                    settings.from_address.clone(),
                ],
            )
            .await
            .map_err(StoreError::from_libsql)?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_enabled_recipients(&self, instance_id: &str) -> Result<Vec<Recipient>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT instance_id, email, enabled FROM recipients WHERE instance_id = ?1 AND enabled = 1",
                params![instance_id],
            )
            .await?;

        let mut recipients = Vec::new();
        while let Some(row) = rows.next().await? {
            recipients.push(Recipient {
                instance_id: row.get(0)?,
                email: row.get(1)?,
                enabled: row.get::<i64>(2)? != 0,
            });
        }
        Ok(recipients)
    }

    #[instrument(skip(self))]
    pub async fn list_enabled_webhooks(&self, instance_id: &str) -> Result<Vec<WebhookEndpoint>, StoreError> {
        let connection = self.client.get_connection()?;
        let mut rows = connection
            .query(
                "SELECT instance_id, url, enabled FROM webhook_endpoints WHERE instance_id = ?1 AND enabled = 1",
                params![instance_id],
            )
            .await?;

        let mut endpoints = Vec::new();
        while let Some(row) = rows.next().await? {
            endpoints.push(WebhookEndpoint {
                instance_id: row.get(0)?,
                url: row.get(1)?,
                enabled: row.get::<i64>(2)? != 0,
            });
        }
        Ok(endpoints)
    }
}

fn security_mode_label(mode: SmtpSecurityMode) -> &'static str {
    match mode {
        SmtpSecurityMode::None => "None",
        SmtpSecurityMode::SslTls => "SslTls",
        SmtpSecurityMode::StartTls => "StartTls",
    }
}

fn parse_security_mode(label: &str) -> Result<SmtpSecurityMode, StoreError> {
    match label {
        "None" => Ok(SmtpSecurityMode::None),
        "SslTls" => Ok(SmtpSecurityMode::SslTls),
        "StartTls" => Ok(SmtpSecurityMode::StartTls),
        other => Err(StoreError::MappingError(format!("unknown security_mode {other}"))),
    }
}
