//! Error types for clarity-ai
//!
//! Every failure leaves the service as an [`ErrorResponse`] envelope. Raw
//! upstream detail stays in the recorded [`ErrorEvent`]; callers only see the
//! caller-facing class plus the classified `error_code`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use clarity_common::api::ErrorResponse;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::UnsupportedAnalysisType;
use crate::services::error_classifier::{ErrorCode, ErrorEvent};
use crate::services::inference_client::InferenceFailure;
use crate::services::model_router::RouteError;

/// Caller-facing class of a failed inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimitExceeded,
    ModelUnavailable,
    ProcessingTimeout,
    AnalysisError,
}

impl FailureClass {
    /// Map a raw failure and its classification to the caller-facing class
    pub fn from_failure(failure: &InferenceFailure, code: ErrorCode) -> Self {
        match failure {
            InferenceFailure::MissingToken => FailureClass::ModelUnavailable,
            InferenceFailure::Timeout(_) => FailureClass::ProcessingTimeout,
            _ => match code {
                ErrorCode::RateLimit => FailureClass::RateLimitExceeded,
                ErrorCode::ServiceUnavailable | ErrorCode::AuthError => {
                    FailureClass::ModelUnavailable
                }
                _ => FailureClass::AnalysisError,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            FailureClass::ModelUnavailable => "MODEL_UNAVAILABLE",
            FailureClass::ProcessingTimeout => "PROCESSING_TIMEOUT",
            FailureClass::AnalysisError => "ANALYSIS_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FailureClass::RateLimitExceeded => StatusCode::SERVICE_UNAVAILABLE,
            FailureClass::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            FailureClass::ProcessingTimeout => StatusCode::GATEWAY_TIMEOUT,
            FailureClass::AnalysisError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self, model_id: &str) -> String {
        match self {
            FailureClass::RateLimitExceeded => {
                "Inference API rate limit exceeded, retry later".to_string()
            }
            FailureClass::ModelUnavailable => format!("Model {} is currently unavailable", model_id),
            FailureClass::ProcessingTimeout => "Analysis processing timed out".to_string(),
            FailureClass::AnalysisError => "Analysis failed due to an inference error".to_string(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown analysis type (400), rejected before any network call
    #[error("Unsupported analysis type: {0}")]
    AnalysisTypeUnsupported(String),

    /// Content above the configured limit (413)
    #[error("Content too large: {length} characters (max {max})")]
    ContentTooLarge { length: usize, max: usize },

    /// Engine not accepting work (503)
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Classified and recorded inference failure
    #[error("{}: {}", .class.as_str(), .event.message)]
    Inference {
        class: FailureClass,
        event: ErrorEvent,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::AnalysisTypeUnsupported(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inference { class, .. } => class.status(),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable `error` field of the envelope
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::AnalysisTypeUnsupported(_) => "ANALYSIS_TYPE_UNSUPPORTED",
            ApiError::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            ApiError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ApiError::Inference { class, .. } => class.as_str(),
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_response_body(&self) -> ErrorResponse {
        let mut details = Map::new();

        let message = match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::AnalysisTypeUnsupported(analysis_type) => {
                details.insert("analysis_type".to_string(), Value::from(analysis_type.clone()));
                format!("Unsupported analysis type: {}", analysis_type)
            }
            ApiError::ContentTooLarge { length, max } => {
                details.insert("length".to_string(), Value::from(*length));
                details.insert("max_length".to_string(), Value::from(*max));
                format!("Content length {} exceeds maximum of {} characters", length, max)
            }
            ApiError::ModelUnavailable(msg) => msg.clone(),
            ApiError::Inference { class, event } => {
                details.insert("error_code".to_string(), Value::from(event.error_code.as_str()));
                details.insert("model_id".to_string(), Value::from(event.model_id.clone()));
                details.insert("request_id".to_string(), Value::from(event.request_id.to_string()));
                class.message(&event.model_id)
            }
            ApiError::Internal(msg) => msg.clone(),
        };

        ErrorResponse::new(self.code(), message).with_details(details)
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::BlankOverride => ApiError::Validation(err.to_string()),
        }
    }
}

impl From<UnsupportedAnalysisType> for ApiError {
    fn from(err: UnsupportedAnalysisType) -> Self {
        ApiError::AnalysisTypeUnsupported(err.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(self.to_response_body())).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
