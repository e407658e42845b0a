use axum::{Router, http::Method, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::services::{AlertStore, ResultStore, ServiceDirectory};
use crate::scheduler::Scheduler;

pub mod error;
pub mod routes;

pub use error::AppError;

pub struct AppState {
    pub scheduler: Scheduler,
    pub services: Arc<dyn ServiceDirectory>,
    pub results: Arc<dyn ResultStore>,
    pub alerts: Arc<dyn AlertStore>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/services", routes::service_check_routes::create_router())
        .nest("/api/alerts", routes::alert_routes::create_router())
        .with_state(app_state)
        .layer(cors)
}
