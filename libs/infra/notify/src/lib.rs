// [libs/infra/notify/src/lib.rs]
/*!
 * =================================================================
 * MONITOR-INFRA-NOTIFY
 * CLASIFICACION: INFRASTRUCTURE LAYER (ESTRATO L3)
 *
 * Remitentes de notificacion consumidos por el Alert Evaluator: SMTP
 * (lettre), webhook (reqwest) y el Protector de credenciales
 * (AES-256-GCM) que las resguarda en reposo.
 * =================================================================
 */

pub mod errors;
pub mod protector;
pub mod smtp;
pub mod webhook;

pub use errors::NotifyError;
pub use protector::{Protector, SMTP_PASSWORD_PURPOSE};
pub use smtp::{LettreSmtpSender, SmtpSender};
pub use webhook::{ReqwestWebhookSender, WebhookSender};
