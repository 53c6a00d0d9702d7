// [libs/infra/notify/src/errors.rs]
//! Failure catalog for the notification senders and Protector,
//! bracket-tagged by failure domain.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("[L3_SMTP_CONNECT_FAULT]: could not reach mail relay -> {0}")]
    SmtpConnectFailure(String),

    #[error("[L3_SMTP_SEND_FAULT]: message rejected by relay -> {0}")]
    SmtpSendFailure(String),

    #[error("[L3_WEBHOOK_TRANSPORT_FAULT]: webhook uplink failed -> {0}")]
    WebhookTransportFailure(#[from] reqwest::Error),

    #[error("[L3_WEBHOOK_REJECTION]: endpoint returned {status} -> {body}")]
    WebhookRejection { status: u16, body: String },

    #[error("[L3_PROTECTOR_FAULT]: credential protect/unprotect failed -> {0}")]
    ProtectorFailure(String),
}
