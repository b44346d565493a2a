//! Model Router
//!
//! Maps an analysis type to the hosted model that serves it. A caller-supplied
//! model id takes precedence and bypasses the table entirely; it is only
//! checked for being non-blank.

use thiserror::Error;

use crate::models::{AnalysisType, FLAN_T5_BASE};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("model override must not be blank")]
    BlankOverride,
}

/// Static routing table
pub fn route(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::CodeReview => FLAN_T5_BASE,
        AnalysisType::RequirementExtraction => FLAN_T5_BASE,
        AnalysisType::TechRecommendation => FLAN_T5_BASE,
        AnalysisType::RiskAssessment => FLAN_T5_BASE,
    }
}

/// Resolve the generation model for a request
pub fn resolve_model(
    analysis_type: AnalysisType,
    override_model: Option<&str>,
) -> Result<String, RouteError> {
    match override_model {
        Some(model) if model.trim().is_empty() => Err(RouteError::BlankOverride),
        Some(model) => {
            tracing::debug!(model, "Using caller-supplied model override");
            Ok(model.trim().to_string())
        }
        None => Ok(route(analysis_type).to_string()),
    }
}
