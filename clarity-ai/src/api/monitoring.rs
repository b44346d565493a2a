//! Error monitoring endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::services::{derive_indicators, ErrorSummary, HealthIndicators};
use crate::AppState;

/// Response body of `GET /monitoring/errors`
#[derive(Debug, Serialize)]
pub struct ErrorMonitoringResponse {
    pub error_summary: ErrorSummary,
    pub health_indicators: HealthIndicators,
    pub timestamp: String,
}

/// GET /monitoring/errors
///
/// Read-only view of the error aggregator.
pub async fn error_monitoring(State(state): State<AppState>) -> Json<ErrorMonitoringResponse> {
    let error_summary = state.errors.summarize();
    let health_indicators = derive_indicators(&error_summary, &state.thresholds);

    Json(ErrorMonitoringResponse {
        error_summary,
        health_indicators,
        timestamp: clarity_common::time::envelope_timestamp(),
    })
}

/// Build monitoring routes
pub fn monitoring_routes() -> Router<AppState> {
    Router::new().route("/monitoring/errors", get(error_monitoring))
}
