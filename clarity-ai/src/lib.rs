//! clarity-ai library interface
//!
//! Exposes the router and shared state so integration tests can drive the
//! service in-process with a stubbed inference backend.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::AiEngineConfig;
use crate::models::ModelRegistry;
use crate::services::{
    AnalysisEngine, ErrorAggregator, ErrorRateThresholds, HealthService, HuggingFaceClient,
    InferenceBackend, MonitoringReporter,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AnalysisEngine>,
    pub health: Arc<HealthService>,
    /// Process-wide error aggregator, shared with the engine and reporter
    pub errors: Arc<ErrorAggregator>,
    pub reporter: Arc<MonitoringReporter>,
    pub registry: Arc<ModelRegistry>,
    pub thresholds: ErrorRateThresholds,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the service against the hosted inference API
    pub fn new(config: &AiEngineConfig) -> ApiResult<Self> {
        let client = HuggingFaceClient::new(&config.huggingface)
            .map_err(|e| ApiError::Internal(format!("Failed to build inference client: {}", e)))?;
        Self::with_backend(config, Arc::new(client))
    }

    /// Wire the service against any inference backend
    ///
    /// The engine is marked initialized once every component is in place.
    pub fn with_backend(
        config: &AiEngineConfig,
        backend: Arc<dyn InferenceBackend>,
    ) -> ApiResult<Self> {
        let startup_time = Utc::now();
        let errors = Arc::new(ErrorAggregator::new());
        let reporter = MonitoringReporter::new(&config.monitoring, Arc::clone(&errors))
            .map_err(|e| ApiError::Internal(format!("Failed to build monitoring client: {}", e)))?;
        let reporter = Arc::new(reporter);
        let registry = Arc::new(ModelRegistry::standard());

        let engine = Arc::new(AnalysisEngine::new(
            backend,
            Arc::clone(&errors),
            Arc::clone(&reporter),
            config.analysis.clone(),
            config.huggingface.request_timeout,
        ));

        let health = Arc::new(HealthService::new(
            Arc::clone(&engine),
            Arc::clone(&registry),
            config.health.clone(),
            startup_time,
        ));

        engine.set_initialized(true);

        Ok(Self {
            engine,
            health,
            errors,
            reporter,
            registry,
            thresholds: config.monitoring.thresholds,
            startup_time,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analysis_routes())
        .merge(api::health_routes())
        .merge(api::monitoring_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
