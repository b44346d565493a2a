//! Data models for the AI Engine

pub mod analysis;
pub mod health;
pub mod model_info;

pub use analysis::{AnalysisRequest, AnalysisResult, AnalysisType, UnsupportedAnalysisType};
pub use health::{ComponentHealth, HealthComponents, HealthReport, HealthStatus};
pub use model_info::{ModelInfo, ModelRegistry, BART_LARGE_MNLI, FLAN_T5_BASE};
