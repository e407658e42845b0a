//! One timeout-bounded protocol check per call.
//!
//! Probing never fails as a Rust error: every transport, timeout or status
//! problem becomes a `down` outcome carrying a readable message.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::db::enums::{ProbeStatus, ServiceType};
use crate::db::models::{NewProbeResult, Service};

pub mod http;
pub mod tcp;

pub use http::HttpProber;
pub use tcp::TcpProber;

/// Why a probe classified its target as down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0}")]
    Transport(String),
    #[error("{what} timed out after {}s", .after.as_secs())]
    Timeout { what: &'static str, after: Duration },
    #[error("Expected status {expected}, got {actual}")]
    StatusMismatch { expected: i32, actual: u16 },
    #[error("HTTP {0}")]
    UnexpectedStatus(u16),
    #[error("unknown service type")]
    UnsupportedProtocol,
}

/// Normalized result of one probe, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    pub response_time_ms: Option<i64>,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    pub fn up(response_time_ms: i64, status_code: Option<u16>) -> Self {
        Self {
            status: ProbeStatus::Up,
            response_time_ms: Some(response_time_ms),
            status_code: status_code.map(i32::from),
            error_message: None,
        }
    }

    pub fn down(
        error: ProbeError,
        response_time_ms: Option<i64>,
        status_code: Option<u16>,
    ) -> Self {
        Self {
            status: ProbeStatus::Down,
            response_time_ms,
            status_code: status_code.map(i32::from),
            error_message: Some(error.to_string()),
        }
    }

    pub fn into_new_result(self, service_id: Uuid) -> NewProbeResult {
        NewProbeResult {
            service_id,
            status: self.status,
            response_time_ms: self.response_time_ms,
            status_code: self.status_code,
            error_message: self.error_message,
        }
    }
}

/// Probing capability used by the scheduler.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, service: &Service) -> ProbeOutcome;
}

/// Production prober: dispatches on `service.service_type`.
#[derive(Clone, Default)]
pub struct Prober {
    http: HttpProber,
    tcp: TcpProber,
}

impl Prober {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(client: reqwest::Client) -> Self {
        Self {
            http: HttpProber::new(client),
            tcp: TcpProber,
        }
    }
}

#[async_trait]
impl Probe for Prober {
    async fn probe(&self, service: &Service) -> ProbeOutcome {
        let timeout = service.timeout();
        match &service.service_type {
            ServiceType::Http => {
                self.http
                    .check(&service.target, timeout, service.expected_status_code)
                    .await
            }
            ServiceType::Tcp => self.tcp.check(&service.target, timeout).await,
            // ICMP needs raw sockets; a TCP connect stands in for it.
            ServiceType::Ping => self.tcp.check(&service.target, timeout).await,
            ServiceType::Unsupported(_) => {
                ProbeOutcome::down(ProbeError::UnsupportedProtocol, None, None)
            }
        }
    }
}

pub(crate) fn elapsed_ms(start: std::time::Instant) -> i64 {
    i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX)
}
