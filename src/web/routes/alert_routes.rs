use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::models::Alert;
use crate::web::{AppError, AppState};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new().route("/{id}/resolve", post(resolve_alert))
}

/// Marks an alert resolved. Resolving twice keeps the first timestamp.
async fn resolve_alert(
    State(app_state): State<Arc<AppState>>,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<Alert>, AppError> {
    let alert = app_state.alerts.resolve_alert(alert_id).await?;
    Ok(Json(alert))
}
