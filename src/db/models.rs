use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::enums::{AlertType, Channel, ProbeStatus, ServiceType, Severity};

/// A monitored endpoint. Owned by the CRUD API; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// URL for http services, `host:port` for tcp and ping.
    pub target: String,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub check_interval_secs: i32,
    pub timeout_secs: i32,
    pub expected_status_code: Option<i32>,
    pub latency_threshold_ms: Option<i64>,
    pub is_active: bool,
}

impl Service {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1) as u64)
    }

    /// Configured interval, raised to `floor_secs` when it is shorter.
    pub fn effective_interval(&self, floor_secs: u64) -> Duration {
        Duration::from_secs((self.check_interval_secs.max(0) as u64).max(floor_secs.max(1)))
    }
}

/// One persisted probe. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub id: Uuid,
    pub service_id: Uuid,
    pub status: ProbeStatus,
    pub response_time_ms: Option<i64>,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// A probe result before the store assigns its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProbeResult {
    pub service_id: Uuid,
    pub status: ProbeStatus,
    pub response_time_ms: Option<i64>,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub service_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An alert decided by the evaluator, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub service_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub severity: Severity,
}

impl NewAlert {
    pub fn new(service_id: Uuid, alert_type: AlertType, message: String) -> Self {
        Self {
            service_id,
            alert_type,
            message,
            severity: alert_type.severity(),
        }
    }
}

/// Where a tenant wants alerts delivered. `service_id == None` covers every
/// service of the tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub service_id: Option<Uuid>,
    pub channel: Channel,
    pub destination: String,
    pub is_active: bool,
}

impl AlertSubscription {
    pub fn covers(&self, tenant_id: Uuid, service_id: Uuid) -> bool {
        self.tenant_id == tenant_id && self.service_id.is_none_or(|id| id == service_id)
    }
}
