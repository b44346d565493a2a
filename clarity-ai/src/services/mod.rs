//! Business logic services for the AI Engine

pub mod analysis_engine;
pub mod error_aggregator;
pub mod error_classifier;
pub mod health_service;
pub mod inference_client;
pub mod model_router;
pub mod monitoring_reporter;
pub mod retry;

pub use analysis_engine::AnalysisEngine;
pub use error_aggregator::{
    derive_indicators, ErrorAggregator, ErrorRate, ErrorRateThresholds, ErrorSummary,
    HealthIndicators,
};
pub use error_classifier::{classify, classify_failure, ErrorCode, ErrorEvent};
pub use health_service::HealthService;
pub use inference_client::{HuggingFaceClient, InferenceBackend, InferenceFailure};
pub use model_router::{resolve_model, route, RouteError};
pub use monitoring_reporter::{should_file, MonitoringReporter};
