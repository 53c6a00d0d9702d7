// [libs/infra/notify/src/smtp.rs]
/*!
 * APARATO: SMTP SENDER (V1.0)
 *
 * Conexion por security mode (None/SslTls/StartTls), autenticacion
 * opcional, envio y desconexion. Cada llamada
 * abre su propia conexion — el fan-out por destinatario (aislando
 * fallos por recipiente) vive en el Alert Evaluator, no aqui.
 */

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use monitor_domain_models::{SmtpSecurityMode, SmtpSettings};
use monitor_domain_notification::EmailMessage;
use tracing::{instrument, warn};

use crate::errors::NotifyError;

#[async_trait]
pub trait SmtpSender: Send + Sync {
    async fn send(&self, settings: &SmtpSettings, password_plain: Option<&str>, to: &str, message: &EmailMessage) -> Result<(), NotifyError>;
}

pub struct LettreSmtpSender;

#[async_trait]
impl SmtpSender for LettreSmtpSender {
    #[instrument(skip(self, settings, password_plain, message), fields(host = %settings.host, port = settings.port))]
    async fn send(&self, settings: &SmtpSettings, password_plain: Option<&str>, to: &str, message: &EmailMessage) -> Result<(), NotifyError> {
        let transport = build_transport(settings, password_plain)?;

        let from: Mailbox = settings
            .from_address
            .parse()
            .map_err(|error| NotifyError::SmtpSendFailure(format!("invalid from address: {error}")))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|error| NotifyError::SmtpSendFailure(format!("invalid recipient address: {error}")))?;

        let email = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(message.subject.clone())
            .multipart(MultiPart::alternative_plain_html(message.text_body.clone(), message.html_body.clone()))
            .map_err(|error| NotifyError::SmtpSendFailure(format!("message assembly failed: {error}")))?;

        transport.send(email).await.map_err(|error| {
            warn!(%error, %to, "smtp send failed");
            NotifyError::SmtpSendFailure(error.to_string())
        })?;
        Ok(())
    }
}

fn build_transport(settings: &SmtpSettings, password_plain: Option<&str>) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let builder = match settings.security_mode {
        SmtpSecurityMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host),
        SmtpSecurityMode::SslTls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|error| NotifyError::SmtpConnectFailure(error.to_string()))?,
        SmtpSecurityMode::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|error| NotifyError::SmtpConnectFailure(error.to_string()))?,
    };

    let mut builder = builder.port(settings.port);

    if let Some(username) = &settings.username {
        let password = password_plain.unwrap_or_default();
        builder = builder.credentials(Credentials::new(username.clone(), password.to_string()));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_transport_for_each_security_mode() {
        for mode in [SmtpSecurityMode::None, SmtpSecurityMode::SslTls, SmtpSecurityMode::StartTls] {
            let settings = SmtpSettings {
                instance_id: "acme".into(),
                host: "mail.example.test".into(),
                port: 587,
                security_mode: mode,
                username: Some("alerts@example.test".into()),
                password_protected: None,
                from_address: "alerts@example.test".into(),
            };
            let transport = build_transport(&settings, Some("hunter2"));
            assert!(transport.is_ok());
        }
    }
}
