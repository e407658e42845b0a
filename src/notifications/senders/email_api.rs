use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NotificationSender, SEND_TIMEOUT, SenderError};
use crate::notifications::models::EmailApiSettings;

/// Managed transactional email API, SendGrid v3 `mail/send` request shape.
pub struct EmailApiSender {
    client: Client,
    settings: EmailApiSettings,
    from_email: String,
    timeout: Duration,
}

impl EmailApiSender {
    /// `default_from` is used when the API settings carry no sender address.
    pub fn new(client: Client, settings: EmailApiSettings, default_from: &str) -> Self {
        let from_email = settings
            .from_email
            .clone()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| default_from.to_string());
        Self {
            client,
            settings,
            from_email,
            timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailSendRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[async_trait]
impl NotificationSender for EmailApiSender {
    fn name(&self) -> &'static str {
        "email_api"
    }

    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(SenderError::NotConfigured("email_api"));
        };

        let payload = MailSendRequest {
            personalizations: [Personalization {
                to: [Address { email: destination }],
            }],
            from: Address {
                email: &self.from_email,
            },
            subject,
            content: [Content {
                content_type: "text/plain",
                value: body,
            }],
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Email API returned non-success status: {status}. Body: {error_body}"
            )));
        }
        Ok(())
    }
}
