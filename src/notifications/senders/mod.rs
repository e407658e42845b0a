use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod email_api;
pub mod log;
pub mod sms_api;
pub mod smtp;
pub mod webhook;

pub use email_api::EmailApiSender;
pub use log::LogSender;
pub use sms_api::SmsApiSender;
pub use smtp::SmtpSender;
pub use webhook::ChatWebhookSender;

/// Upper bound on one HTTP provider attempt, so a silent provider still
/// fails over to the next one in the chain.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Sender is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
}

/// One delivery provider. Implementations never panic and never retry; a
/// failed attempt is reported so the chain can move to the next provider.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Unconfigured providers are skipped by the chain without an attempt.
    fn is_configured(&self) -> bool {
        true
    }

    /// Sends one message. `subject` is ignored by channels without one.
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<(), SenderError>;
}
