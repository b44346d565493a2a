//! HTTP API handlers for clarity-ai

pub mod analyze;
pub mod health;
pub mod monitoring;

pub use analyze::analysis_routes;
pub use health::health_routes;
pub use monitoring::monitoring_routes;
