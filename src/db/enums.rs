use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protocol used to probe a service.
///
/// Parsed leniently from the stored `type` column: anything outside the known
/// set is kept as `Unsupported` so the prober can report it instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceType {
    Http,
    Tcp,
    /// Approximated by a TCP connect; ICMP needs raw sockets.
    Ping,
    Unsupported(String),
}

impl From<&str> for ServiceType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" | "https" => ServiceType::Http,
            "tcp" => ServiceType::Tcp,
            "ping" => ServiceType::Ping,
            _ => ServiceType::Unsupported(raw.to_string()),
        }
    }
}

impl From<String> for ServiceType {
    fn from(raw: String) -> Self {
        ServiceType::from(raw.as_str())
    }
}

impl From<ServiceType> for String {
    fn from(value: ServiceType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Http => write!(f, "http"),
            ServiceType::Tcp => write!(f, "tcp"),
            ServiceType::Ping => write!(f, "ping"),
            ServiceType::Unsupported(raw) => write!(f, "{raw}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
    /// Transient classification; treated like `Up` by every alert policy.
    Degraded,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Up => "up",
            ProbeStatus::Down => "down",
            ProbeStatus::Degraded => "degraded",
        }
    }
}

impl FromStr for ProbeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(ProbeStatus::Up),
            "down" => Ok(ProbeStatus::Down),
            "degraded" => Ok(ProbeStatus::Degraded),
            other => Err(ParseEnumError::new("probe status", other)),
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Downtime,
    Latency,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Downtime => "downtime",
            AlertType::Latency => "latency",
        }
    }

    /// Fixed severity mapping for alerts raised by the evaluator.
    pub fn severity(&self) -> Severity {
        match self {
            AlertType::Downtime => Severity::High,
            AlertType::Latency => Severity::Medium,
        }
    }
}

impl FromStr for AlertType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "downtime" => Ok(AlertType::Downtime),
            "latency" => Ok(AlertType::Latency),
            other => Err(ParseEnumError::new("alert type", other)),
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Prefix used in human-facing notification bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(ParseEnumError::new("severity", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery channel of an alert subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    #[serde(rename = "slack", alias = "chat_webhook", alias = "webhook")]
    ChatWebhook,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::ChatWebhook => "slack",
        }
    }
}

impl FromStr for Channel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "slack" | "chat_webhook" | "webhook" => Ok(Channel::ChatWebhook),
            other => Err(ParseEnumError::new("channel", other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
