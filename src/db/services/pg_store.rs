//! PostgreSQL-backed store.
//!
//! Result ordering is `(checked_at, seq)`: `seq` is a BIGSERIAL, so "the result
//! before X" stays strict even when two probes share a timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use super::{AlertStore, ResultStore, ServiceDirectory, StoreError, SubscriptionDirectory};
use crate::db::enums::ServiceType;
use crate::db::models::{
    Alert, AlertSubscription, NewAlert, NewProbeResult, ProbeResult, Service,
};

const SCHEMA: &str = include_str!("../../../migrations/0001_init.sql");

const SERVICE_COLUMNS: &str = "id, tenant_id, name, target, type, check_interval, timeout, \
     expected_status_code, latency_threshold_ms, is_active";

const RESULT_COLUMNS: &str =
    "id, service_id, status, response_time_ms, status_code, error_message, checked_at";

const ALERT_COLUMNS: &str =
    "id, service_id, type, message, severity, is_resolved, resolved_at, created_at";

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    target: String,
    #[sqlx(rename = "type")]
    service_type: String,
    check_interval: i32,
    timeout: i32,
    expected_status_code: Option<i32>,
    latency_threshold_ms: Option<i64>,
    is_active: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            target: row.target,
            service_type: ServiceType::from(row.service_type),
            check_interval_secs: row.check_interval,
            timeout_secs: row.timeout,
            expected_status_code: row.expected_status_code,
            latency_threshold_ms: row.latency_threshold_ms,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProbeResultRow {
    id: Uuid,
    service_id: Uuid,
    status: String,
    response_time_ms: Option<i64>,
    status_code: Option<i32>,
    error_message: Option<String>,
    checked_at: DateTime<Utc>,
}

impl TryFrom<ProbeResultRow> for ProbeResult {
    type Error = StoreError;

    fn try_from(row: ProbeResultRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("probe result {}: {e}", row.id)))?;
        Ok(ProbeResult {
            id: row.id,
            service_id: row.service_id,
            status,
            response_time_ms: row.response_time_ms,
            status_code: row.status_code,
            error_message: row.error_message,
            checked_at: row.checked_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    service_id: Uuid,
    #[sqlx(rename = "type")]
    alert_type: String,
    message: String,
    severity: String,
    is_resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::db::enums::ParseEnumError| {
            StoreError::Corrupt(format!("alert {}: {e}", row.id))
        };
        Ok(Alert {
            id: row.id,
            service_id: row.service_id,
            alert_type: row.alert_type.parse().map_err(corrupt)?,
            message: row.message.clone(),
            severity: row.severity.parse().map_err(corrupt)?,
            is_resolved: row.is_resolved,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    service_id: Option<Uuid>,
    channel: String,
    destination: String,
    is_active: bool,
}

impl TryFrom<SubscriptionRow> for AlertSubscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let channel = row
            .channel
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("subscription {}: {e}", row.id)))?;
        Ok(AlertSubscription {
            id: row.id,
            tenant_id: row.tenant_id,
            service_id: row.service_id,
            channel,
            destination: row.destination,
            is_active: row.is_active,
        })
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Creates the engine tables if they do not exist yet.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Database schema is up to date.");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ServiceDirectory for PgStore {
    async fn list_active_services(&self) -> Result<Vec<Service>, StoreError> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE is_active = TRUE ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Service::from).collect())
    }

    async fn get_service(&self, service_id: Uuid) -> Result<Option<Service>, StoreError> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = $1"
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Service::from))
    }
}

#[async_trait]
impl ResultStore for PgStore {
    async fn save_probe_result(&self, result: NewProbeResult) -> Result<ProbeResult, StoreError> {
        let row = sqlx::query_as::<_, ProbeResultRow>(&format!(
            "INSERT INTO probe_results \
                 (id, service_id, status, response_time_ms, status_code, \
                  error_message, checked_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
             RETURNING {RESULT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(result.service_id)
        .bind(result.status.as_str())
        .bind(result.response_time_ms)
        .bind(result.status_code)
        .bind(result.error_message)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_last_probe_result(
        &self,
        service_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        let row = sqlx::query_as::<_, ProbeResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM probe_results \
             WHERE service_id = $1 \
             ORDER BY checked_at DESC, seq DESC LIMIT 1"
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProbeResult::try_from).transpose()
    }

    async fn get_probe_result_before(
        &self,
        service_id: Uuid,
        before_result_id: Uuid,
    ) -> Result<Option<ProbeResult>, StoreError> {
        let row = sqlx::query_as::<_, ProbeResultRow>(
            "SELECT p.id, p.service_id, p.status, p.response_time_ms, p.status_code, \
                    p.error_message, p.checked_at \
             FROM probe_results p \
             JOIN probe_results cur ON cur.id = $2 \
             WHERE p.service_id = $1 AND (p.checked_at, p.seq) < (cur.checked_at, cur.seq) \
             ORDER BY p.checked_at DESC, p.seq DESC LIMIT 1",
        )
        .bind(service_id)
        .bind(before_result_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ProbeResult::try_from).transpose()
    }

    async fn list_probe_results(
        &self,
        service_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ProbeResult>, StoreError> {
        let rows = sqlx::query_as::<_, ProbeResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM probe_results \
             WHERE service_id = $1 \
             ORDER BY checked_at DESC, seq DESC LIMIT $2"
        ))
        .bind(service_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ProbeResult::try_from).collect()
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn save_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "INSERT INTO alerts (id, service_id, type, message, severity, is_resolved, created_at) \
             VALUES ($1, $2, $3, $4, $5, FALSE, NOW()) \
             RETURNING {ALERT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(alert.service_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.message)
        .bind(alert.severity.as_str())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_alerts(&self, service_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE service_id = $1 ORDER BY created_at DESC"
        ))
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn resolve_alert(&self, alert_id: Uuid) -> Result<Alert, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "UPDATE alerts \
             SET is_resolved = TRUE, resolved_at = COALESCE(resolved_at, NOW()) \
             WHERE id = $1 \
             RETURNING {ALERT_COLUMNS}"
        ))
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("alert {alert_id}")))?;
        row.try_into()
    }
}

#[async_trait]
impl SubscriptionDirectory for PgStore {
    async fn list_active_subscriptions(
        &self,
        tenant_id: Uuid,
        service_id: Option<Uuid>,
    ) -> Result<Vec<AlertSubscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT id, tenant_id, service_id, channel, destination, is_active \
             FROM alert_subscriptions \
             WHERE tenant_id = $1 AND is_active = TRUE \
               AND (service_id IS NULL OR service_id = $2)",
        )
        .bind(tenant_id)
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AlertSubscription::try_from).collect()
    }
}
