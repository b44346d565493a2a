//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::models::HealthReport;
use crate::AppState;

/// GET /health
///
/// Always answers 200; component problems show up in the report body.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.health().await)
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
