//! Process-local store used when no database is configured, and by tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{AlertStore, ResultStore, ServiceDirectory, StoreError, SubscriptionDirectory};
use crate::db::models::{
    Alert, AlertSubscription, NewAlert, NewProbeResult, ProbeResult, Service,
};

#[derive(Default)]
pub struct MemoryStore {
    services: DashMap<Uuid, Service>,
    // Per service, ordered by (checked_at, insertion).
    results: DashMap<Uuid, Vec<ProbeResult>>,
    alerts: DashMap<Uuid, Vec<Alert>>,
    subscriptions: DashMap<Uuid, AlertSubscription>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_service(&self, service: Service) {
        self.services.insert(service.id, service);
    }

    pub fn remove_service(&self, service_id: Uuid) {
        self.services.remove(&service_id);
        self.results.remove(&service_id);
        self.alerts.remove(&service_id);
    }

    pub fn insert_subscription(&self, subscription: AlertSubscription) {
        self.subscriptions.insert(subscription.id, subscription);
    }

    /// Inserts a fully formed result, keeping the per-service history sorted.
    pub fn seed_probe_result(&self, result: ProbeResult) {
        let mut history = self.results.entry(result.service_id).or_default();
        let position = history.partition_point(|r| r.checked_at <= result.checked_at);
        history.insert(position, result);
    }
}

#[async_trait]
impl ServiceDirectory for MemoryStore {
    async fn list_active_services(&self) -> Result<Vec<Service>, StoreError> {
        let mut services: Vec<Service> = self
            .services
            .iter()
            .filter(|entry| entry.is_active)
            .map(|entry| entry.value().clone())
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, StoreError> {
        Ok(self.services.get(&service_id).map(|s| s.value().clone()))
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save_probe_result(&self, result: NewProbeResult) -> Result<ProbeResult, StoreError> {
        let mut history = self.results.entry(result.service_id).or_default();
        let mut checked_at = Utc::now();
        // Keep the ledger time-ordered even if the wall clock steps backwards.
        if let Some(last) = history.last() {
            checked_at = checked_at.max(last.checked_at);
        }
        let saved = ProbeResult {
            id: Uuid::new_v4(),
            service_id: result.service_id,
            status: result.status,
            response_time_ms: result.response_time_ms,
            status_code: result.status_code,
            error_message: result.error_message,
            checked_at,
        };
        history.push(saved.clone());
        Ok(saved)
    }

    async fn get_last_probe_result(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        Ok(self
            .results
            .get(&service_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn get_probe_result_before(
        &self,
        service_id: Uuid,
        before_result_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        let Some(history) = self.results.get(&service_id) else {
            return Ok(None);
        };
        let previous = history
            .iter()
            .position(|r| r.id == before_result_id)
            .and_then(|index| index.checked_sub(1))
            .map(|index| history[index].clone());
        Ok(previous)
    }

    async fn list_probe_results(
        &self,
        service_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ProbeResult>, StoreError> {
        Ok(self
            .results
            .get(&service_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn save_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let saved = Alert {
            id: Uuid::new_v4(),
            service_id: alert.service_id,
            alert_type: alert.alert_type,
            message: alert.message,
            severity: alert.severity,
            is_resolved: false,
            resolved_at: None,
            created_at: Utc::now(),
        };
        self.alerts
            .entry(saved.service_id)
            .or_default()
            .push(saved.clone());
        Ok(saved)
    }

    async fn list_alerts(&self, service_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        Ok(self
            .alerts
            .get(&service_id)
            .map(|alerts| alerts.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> Result<Alert, StoreError> {
        for mut entry in self.alerts.iter_mut() {
            if let Some(alert) = entry.iter_mut().find(|a| a.id == alert_id) {
                if !alert.is_resolved {
                    alert.is_resolved = true;
                    alert.resolved_at = Some(Utc::now());
                }
                return Ok(alert.clone());
            }
        }
        Err(StoreError::NotFound(format!("alert {alert_id}")))
    }
}

#[async_trait]
impl SubscriptionDirectory for MemoryStore {
    async fn list_active_subscriptions(
        &self,
        tenant_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<AlertSubscription>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|sub| sub.is_active && sub.tenant_id == tenant_id)
            .filter(|sub| match (sub.service_id, service_id) {
                (None, _) => true,
                (Some(scoped), Some(wanted)) => scoped == wanted,
                (Some(_), None) => false,
            })
            .map(|sub| sub.value().clone())
            .collect())
    }
}
