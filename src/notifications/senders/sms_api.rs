use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{NotificationSender, SEND_TIMEOUT, SenderError};
use crate::notifications::models::SmsApiSettings;

/// Managed messaging API accepting `{to, from, body}` with a bearer key.
pub struct SmsApiSender {
    client: Client,
    settings: SmsApiSettings,
    timeout: Duration,
}

impl SmsApiSender {
    pub fn new(client: Client, settings: SmsApiSettings) -> Self {
        Self {
            client,
            settings,
            timeout: SEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct SmsMessage<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    body: &'a str,
}

#[async_trait]
impl NotificationSender for SmsApiSender {
    fn name(&self) -> &'static str {
        "sms_api"
    }

    fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    async fn send(&self, destination: &str, _subject: &str, body: &str) -> Result<(), SenderError> {
        let (Some(endpoint), Some(api_key)) = (
            self.settings.endpoint.as_deref(),
            self.settings.api_key.as_deref(),
        ) else {
            return Err(SenderError::NotConfigured("sms_api"));
        };
        if destination.trim().is_empty() {
            return Err(SenderError::InvalidDestination(destination.to_string()));
        }

        let message = SmsMessage {
            to: destination,
            from: self.settings.sender.as_deref(),
            body,
        };
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SenderError::SendFailed(format!(
                "SMS API returned non-success status: {status}"
            )));
        }
        Ok(())
    }
}
