use crate::db::enums::{AlertType, ProbeStatus};
use crate::db::models::{NewAlert, ProbeResult, Service};

/// Edge-triggered alert policies over a pair of consecutive probe results.
///
/// Stateless: `previous` must come from the result store so that decisions
/// survive restarts and are consistent across scheduler instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Returns zero, one or two alerts. Downtime and latency are independent.
    pub fn evaluate(
        &self,
        service: &Service,
        current: &ProbeResult,
        previous: Option<&ProbeResult>,
    ) -> Vec<NewAlert> {
        let mut alerts = Vec::new();
        if let Some(alert) = Self::downtime(service, current, previous) {
            alerts.push(alert);
        }
        if let Some(alert) = Self::latency(service, current, previous) {
            alerts.push(alert);
        }
        alerts
    }

    fn downtime(
        service: &Service,
        current: &ProbeResult,
        previous: Option<&ProbeResult>,
    ) -> Option<NewAlert> {
        if current.status != ProbeStatus::Down {
            return None;
        }
        // Degraded counts as "was up"; only a down predecessor suppresses.
        if previous.is_some_and(|p| p.status == ProbeStatus::Down) {
            return None;
        }

        let mut message = format!("Service is down: {}", service.name);
        if let Some(error) = current.error_message.as_deref().filter(|e| !e.is_empty()) {
            message.push_str(" - ");
            message.push_str(error);
        }
        Some(NewAlert::new(service.id, AlertType::Downtime, message))
    }

    fn latency(
        service: &Service,
        current: &ProbeResult,
        previous: Option<&ProbeResult>,
    ) -> Option<NewAlert> {
        let threshold = service.latency_threshold_ms?;
        let response_time = current.response_time_ms?;
        if response_time <= threshold {
            return None;
        }
        let already_breached = previous
            .and_then(|p| p.response_time_ms)
            .is_some_and(|rt| rt > threshold);
        if already_breached {
            return None;
        }

        let message = format!(
            "Service latency threshold breached: {} (Response time: {}ms, Threshold: {}ms)",
            service.name, response_time, threshold
        );
        Some(NewAlert::new(service.id, AlertType::Latency, message))
    }
}
