use async_trait::async_trait;
use tracing::info;

use super::{NotificationSender, SenderError};

/// Last-resort provider: records the message in the log instead of reaching
/// the recipient. Always succeeds.
pub struct LogSender {
    channel: &'static str,
    from: String,
}

impl LogSender {
    pub fn new(channel: &'static str, from: impl Into<String>) -> Self {
        Self {
            channel,
            from: from.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        info!(
            fallback = "log",
            channel = self.channel,
            to = destination,
            from = %self.from,
            subject = subject,
            body = body,
            "Notification not delivered: no provider configured, logging instead."
        );
        Ok(())
    }
}
