use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NotificationSender, SEND_TIMEOUT, SenderError};

/// Slack-compatible incoming webhook. The subscription destination is the URL.
pub struct ChatWebhookSender {
    client: Client,
    username: String,
    timeout: Duration,
}

impl ChatWebhookSender {
    pub fn new(client: Client, username: impl Into<String>) -> Self {
        Self {
            client,
            username: username.into(),
            timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
}

#[async_trait]
impl NotificationSender for ChatWebhookSender {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, destination: &str, _subject: &str, body: &str) -> Result<(), SenderError> {
        let url = reqwest::Url::parse(destination)
            .map_err(|e| SenderError::InvalidDestination(format!("{destination}: {e}")))?;

        let message = WebhookMessage {
            text: body,
            username: &self.username,
            icon_emoji: ":warning:",
        };
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{spawn_receiver, spawn_silent_listener};
    use super::*;

    #[tokio::test]
    async fn posts_chat_payload() {
        let (addr, captured) = spawn_receiver().await;
        let sender = ChatWebhookSender::new(Client::new(), "PulseWatch");

        sender
            .send(&format!("http://{addr}/ok"), "", "HIGH Alert: down")
            .await
            .unwrap();

        let seen = captured.lock().await;
        let (auth, body) = &seen[0];
        assert!(auth.is_none());
        assert_eq!(body["text"], "HIGH Alert: down");
        assert_eq!(body["username"], "PulseWatch");
        assert_eq!(body["icon_emoji"], ":warning:");
    }

    #[tokio::test]
    async fn non_2xx_is_a_failure() {
        let (addr, _captured) = spawn_receiver().await;
        let sender = ChatWebhookSender::new(Client::new(), "PulseWatch");
        let result = sender.send(&format!("http://{addr}/fail"), "", "body").await;
        assert!(matches!(result, Err(SenderError::SendFailed(_))));
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let sender = ChatWebhookSender::new(Client::new(), "PulseWatch");
        let result = sender.send("hooks.example.com/abc", "", "body").await;
        assert!(matches!(result, Err(SenderError::InvalidDestination(_))));
    }

    #[tokio::test]
    async fn silent_hook_times_out() {
        let addr = spawn_silent_listener().await;
        let sender = ChatWebhookSender::new(Client::new(), "PulseWatch")
            .with_timeout(Duration::from_millis(200));

        let result = sender.send(&format!("http://{addr}/hook"), "", "body").await;
        assert!(matches!(result, Err(SenderError::Network(e)) if e.is_timeout()));
    }
}
