//! Persistence seam consumed by the engine.
//!
//! Services and subscriptions are read-only here. Probe results and alerts are
//! append-only; the only in-place mutation is the external alert resolve action.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Alert, AlertSubscription, NewAlert, NewProbeResult, ProbeResult, Service};

pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn list_active_services(&self) -> Result<Vec<Service>, StoreError>;

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, StoreError>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Appends a result, assigning its id and timestamp.
    async fn save_probe_result(&self, result: NewProbeResult) -> Result<ProbeResult, StoreError>;

    async fn get_last_probe_result(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError>;

    /// The most recent result of `service_id` strictly before `before_result_id`.
    async fn get_probe_result_before(
        &self,
        service_id: Uuid,
        before_result_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError>;

    /// Newest first.
    async fn list_probe_results(
        &self,
        service_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ProbeResult>, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn save_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    /// Newest first.
    async fn list_alerts(&self, service_id: Uuid) -> Result<Vec<Alert>, StoreError>;

    async fn resolve_alert(&self, alert_id: Uuid) -> Result<Alert, StoreError>;
}

#[async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// Active subscriptions of `tenant_id` scoped to `service_id` or tenant-wide.
    async fn list_active_subscriptions(
        &self,
        tenant_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<AlertSubscription>, StoreError>;
}

/// Everything the engine needs from storage.
pub trait MonitorStore: ServiceDirectory + ResultStore + AlertStore + SubscriptionDirectory {}

impl<T> MonitorStore for T where
    T: ServiceDirectory + ResultStore + AlertStore + SubscriptionDirectory
{
}
