use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use super::{NotificationSender, SenderError};
use crate::notifications::models::SmtpSettings;

const IMPLICIT_TLS_PORT: u16 = 465;
const SMTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Direct submission to a mail relay with plain-auth credentials.
///
/// Port 465 uses implicit TLS, every other port upgrades with STARTTLS.
pub struct SmtpSender {
    settings: SmtpSettings,
}

impl SmtpSender {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, SenderError> {
        let (Some(host), Some(username), Some(password)) = (
            self.settings.host.as_deref(),
            self.settings.username.as_deref(),
            self.settings.password.as_deref(),
        ) else {
            return Err(SenderError::NotConfigured("smtp"));
        };

        let builder = if self.settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| SenderError::Smtp(e.to_string()))?;

        Ok(builder
            .port(self.settings.port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(SMTP_TIMEOUT))
            .build())
    }
}

#[async_trait]
impl NotificationSender for SmtpSender {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let to: Mailbox = destination
            .parse()
            .map_err(|_| SenderError::InvalidDestination(destination.to_string()))?;
        let from: Mailbox = self
            .settings
            .from_email
            .parse()
            .map_err(|e| SenderError::Smtp(format!("invalid sender address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SenderError::Smtp(e.to_string()))?;

        self.transport()?
            .send(email)
            .await
            .map_err(|e| SenderError::Smtp(e.to_string()))?;
        Ok(())
    }
}
