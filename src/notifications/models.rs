use serde::Deserialize;

use crate::db::models::Alert;

/// Provider credentials and branding used to build the delivery chains.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    /// Shown in email subjects and as the chat webhook username.
    pub brand: String,
    pub smtp: SmtpSettings,
    pub email_api: EmailApiSettings,
    pub sms_api: SmsApiSettings,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            brand: "PulseWatch".to_string(),
            smtp: SmtpSettings::default(),
            email_api: EmailApiSettings::default(),
            sms_api: SmsApiSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from_email: "noreply@pulsewatch.local".to_string(),
        }
    }
}

impl SmtpSettings {
    pub fn is_configured(&self) -> bool {
        present(&self.host) && present(&self.username) && present(&self.password)
    }
}

/// Managed transactional email API (SendGrid v3 request shape).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailApiSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Falls back to the SMTP sender address when unset.
    pub from_email: Option<String>,
}

impl Default for EmailApiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.sendgrid.com/v3/mail/send".to_string(),
            api_key: None,
            from_email: None,
        }
    }
}

impl EmailApiSettings {
    pub fn is_configured(&self) -> bool {
        present(&self.api_key) && !self.endpoint.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmsApiSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender: Option<String>,
}

impl SmsApiSettings {
    pub fn is_configured(&self) -> bool {
        present(&self.endpoint) && present(&self.api_key)
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Human-facing alert text, e.g. `HIGH Alert: Service is down: api`.
pub fn format_alert_body(alert: &Alert) -> String {
    format!("{} Alert: {}", alert.severity.label(), alert.message)
}

pub fn format_alert_subject(brand: &str, alert: &Alert) -> String {
    format!("{brand} Alert: {}", alert.message)
}
