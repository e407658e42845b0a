use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::{Alert, ProbeResult};
use crate::web::{AppError, AppState};

const DEFAULT_RESULT_LIMIT: usize = 100;
const MAX_RESULT_LIMIT: usize = 1000;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}/check", post(trigger_check))
        .route("/{id}/results", get(list_results))
        .route("/{id}/alerts", get(list_alerts))
}

/// Runs the probe pipeline now and returns the persisted result.
async fn trigger_check(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<ProbeResult>, AppError> {
    let result = app_state.scheduler.trigger_probe(service_id).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct ResultsQuery {
    limit: Option<usize>,
}

async fn list_results(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<ProbeResult>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_RESULT_LIMIT);
    if !(1..=MAX_RESULT_LIMIT).contains(&limit) {
        return Err(AppError::InvalidInput(format!(
            "limit must be between 1 and {MAX_RESULT_LIMIT}"
        )));
    }
    ensure_service_exists(&app_state, service_id).await?;

    let results = app_state.results.list_probe_results(service_id, limit).await?;
    Ok(Json(results))
}

async fn list_alerts(
    State(app_state): State<Arc<AppState>>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Vec<Alert>>, AppError> {
    ensure_service_exists(&app_state, service_id).await?;
    let alerts = app_state.alerts.list_alerts(service_id).await?;
    Ok(Json(alerts))
}

async fn ensure_service_exists(app_state: &AppState, service_id: Uuid) -> Result<(), AppError> {
    match app_state.services.get_service(service_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("service {service_id}"))),
    }
}
