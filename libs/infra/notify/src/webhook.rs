// [libs/infra/notify/src/webhook.rs]
//! APARATO: WEBHOOK SENDER (V1.0)
//!
//! `POST url` con `Content-Type: application/json`, 10 segundos de
//! timeout, no-2xx levanta con status y fragmento del cuerpo. Cliente
//! construido una sola vez (builder con timeout + user-agent),
//! `.post(url).json(payload).send()` por cada entrega.

use std::time::Duration;

use async_trait::async_trait;
use monitor_domain_models::WebhookEndpoint;
use monitor_domain_notification::WebhookPayload;
use reqwest::Client;
use tracing::{instrument, warn};

use crate::errors::NotifyError;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_SNIPPET_MAX_BYTES: usize = 512;

#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, endpoint: &WebhookEndpoint, payload: &WebhookPayload) -> Result<(), NotifyError>;
}

pub struct ReqwestWebhookSender {
    client: Client,
}

impl ReqwestWebhookSender {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .user_agent("WebsiteMonitor/1.0")
            .build()
            .expect("webhook client should always build with static config");
        Self { client }
    }
}

impl Default for ReqwestWebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookSender for ReqwestWebhookSender {
    #[instrument(skip(self, payload), fields(url = %endpoint.url))]
    async fn send(&self, endpoint: &WebhookEndpoint, payload: &WebhookPayload) -> Result<(), NotifyError> {
        let response = self.client.post(&endpoint.url).json(payload).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(BODY_SNIPPET_MAX_BYTES).collect();
        warn!(%status, endpoint = %endpoint.url, "webhook endpoint rejected notification");
        Err(NotifyError::WebhookRejection { status: status.as_u16(), body: snippet })
    }
}
