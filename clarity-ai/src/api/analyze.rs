//! Analysis and model catalogue endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use clarity_common::api::StandardResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisRequest, AnalysisResult, AnalysisType, ModelInfo};
use crate::AppState;

/// POST /ai-engine/analyze request body
///
/// `analysis_type` stays a plain string here so an unknown value surfaces as
/// ANALYSIS_TYPE_UNSUPPORTED rather than a generic JSON error.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequestBody {
    pub content: String,
    pub analysis_type: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// POST /ai-engine/analyze
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequestBody>, JsonRejection>,
) -> ApiResult<Json<StandardResponse<AnalysisResult>>> {
    let Json(body) = payload.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    // Type check first: nothing else runs for an unknown type
    let analysis_type: AnalysisType = body.analysis_type.parse()?;

    let mut request = AnalysisRequest::new(body.content, analysis_type)
        .with_parameters(body.parameters.unwrap_or_default());
    if let Some(model) = body.model {
        request = request.with_model(model);
    }

    let result = state.engine.analyze(request).await?;
    Ok(Json(StandardResponse::success(result)))
}

/// GET /ai-engine/models
pub async fn list_models(State(state): State<AppState>) -> Json<StandardResponse<ModelsResponse>> {
    Json(StandardResponse::success(ModelsResponse {
        models: state.registry.all().to_vec(),
    }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/ai-engine/analyze", post(analyze))
        .route("/ai-engine/models", get(list_models))
}
