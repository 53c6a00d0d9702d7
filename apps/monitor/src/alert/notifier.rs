// [apps/monitor/src/alert/notifier.rs]
//! Notification fan-out: resolve configured
//! channels, send independently to each recipient/endpoint, isolate
//! per-channel failures, report whether at least one delivery succeeded.

use std::sync::Arc;

use monitor_core_timezone::Zone;
use monitor_domain_notification::{AlertSignal, WebhookPayload};
use monitor_infra_notify::{Protector, SmtpSender, WebhookSender, SMTP_PASSWORD_PURPOSE};
use monitor_infra_store::repositories::NotificationChannelRepository;
use tracing::warn;

use super::templates::render_email;

/// Outcome of one `Notifier::dispatch` call.
pub enum Delivery {
    /// At least one recipient or endpoint accepted the message.
    Delivered,
    /// Neither SMTP nor webhook is configured for this instance — the
    /// evaluator must not treat this as a failure ("If
    /// neither channel is configured... skip sending, do not error").
    Unconfigured,
    /// Configured, but every attempt failed. Carries a joined summary
    /// for the Error Event message.
    Failed(String),
}

pub struct Notifier {
    channels: NotificationChannelRepository,
    protector: Arc<Protector>,
    smtp: Arc<dyn SmtpSender>,
    webhook: Arc<dyn WebhookSender>,
}

impl Notifier {
    pub fn new(
        channels: NotificationChannelRepository,
        protector: Arc<Protector>,
        smtp: Arc<dyn SmtpSender>,
        webhook: Arc<dyn WebhookSender>,
    ) -> Self {
        Self { channels, protector, smtp, webhook }
    }

    pub async fn dispatch(&self, signal: &AlertSignal, zone: &Zone) -> Delivery {
        let instance_id = &signal.instance_id;

        let smtp_settings = match self.channels.get_smtp_settings(instance_id).await {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, instance_id, "failed to load smtp settings, treating as unconfigured");
                None
            }
        };
        let recipients = match self.channels.list_enabled_recipients(instance_id).await {
            Ok(recipients) => recipients,
            Err(error) => {
                warn!(%error, instance_id, "failed to load recipients");
                Vec::new()
            }
        };
        let webhooks = match self.channels.list_enabled_webhooks(instance_id).await {
            Ok(webhooks) => webhooks,
            Err(error) => {
                warn!(%error, instance_id, "failed to load webhook endpoints");
                Vec::new()
            }
        };

        let email_configured = smtp_settings
            .as_ref()
            .map(|settings| settings.port > 0 && !settings.host.is_empty() && !settings.from_address.is_empty())
            .unwrap_or(false)
            && !recipients.is_empty();
        let webhook_configured = !webhooks.is_empty();

        if !email_configured && !webhook_configured {
            return Delivery::Unconfigured;
        }

        let mut any_success = false;
        let mut failures: Vec<String> = Vec::new();

        if email_configured {
            let settings = smtp_settings.as_ref().expect("email_configured implies settings present");

            let password_plain = match &settings.password_protected {
                None => Ok(None),
                Some(opaque) => self
                    .protector
                    .unprotect(SMTP_PASSWORD_PURPOSE, opaque)
                    .map(Some)
                    .map_err(|error| error.to_string()),
            };

            match password_plain {
                Err(error) => {
                    failures.push(format!("smtp: credential decrypt failed: {error}"));
                }
                Ok(password_plain) => {
                    let to_addresses: Vec<String> = recipients.iter().map(|recipient| recipient.email.clone()).collect();
                    let message = render_email(signal, to_addresses, zone);

                    for recipient in &recipients {
                        match self.smtp.send(settings, password_plain.as_deref(), &recipient.email, &message).await {
                            Ok(()) => any_success = true,
                            Err(error) => failures.push(format!("smtp:{}: {error}", recipient.email)),
                        }
                    }
                }
            }
        }

        if webhook_configured {
            let payload = WebhookPayload::from(signal);
            for endpoint in &webhooks {
                match self.webhook.send(endpoint, &payload).await {
                    Ok(()) => any_success = true,
                    Err(error) => failures.push(format!("webhook:{}: {error}", endpoint.url)),
                }
            }
        }

        if any_success {
            Delivery::Delivered
        } else {
            Delivery::Failed(failures.join("; "))
        }
    }
}
