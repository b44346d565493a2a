//! Shared API request/response types
//!
//! Every ClarityForge façade wraps successful payloads in a
//! [`StandardResponse`] and failures in an [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::envelope_timestamp;

// ========================================
// Success Envelope
// ========================================

/// Standard success envelope
///
/// # Examples
///
/// ```
/// use clarity_common::api::types::StandardResponse;
///
/// let response = StandardResponse::success(vec!["google/flan-t5-base"]);
/// assert_eq!(response.status, "success");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StandardResponse<T> {
    /// Endpoint-specific payload
    pub data: T,

    /// Response generation time (`%Y-%m-%dT%H:%M:%SZ`)
    pub timestamp: String,

    /// Always "success" for this envelope
    pub status: String,
}

impl<T> StandardResponse<T> {
    /// Wrap a payload, stamped with the current time
    pub fn success(data: T) -> Self {
        Self {
            data,
            timestamp: envelope_timestamp(),
            status: "success".to_string(),
        }
    }
}

// ========================================
// Error Envelope
// ========================================

/// Standard error body
///
/// # Examples
///
/// ```
/// use clarity_common::api::types::ErrorResponse;
///
/// let body = ErrorResponse::new("VALIDATION_ERROR", "content must not be empty");
/// assert!(body.details.is_none());
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. `ANALYSIS_TYPE_UNSUPPORTED`)
    pub error: String,

    /// Human-readable description
    pub message: String,

    /// Error generation time (`%Y-%m-%dT%H:%M:%SZ`)
    pub timestamp: String,

    /// Additional context, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: envelope_timestamp(),
            details: None,
        }
    }

    /// Attach a details map; an empty map is dropped
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = if details.is_empty() { None } else { Some(details) };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_serialization() {
        let response = StandardResponse::success(json!({"models": []}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["models"], json!([]));
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorResponse::new("VALIDATION_ERROR", "bad").with_details(Map::new());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["error"], "VALIDATION_ERROR");
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_error_body_with_details() {
        let mut details = Map::new();
        details.insert("field".to_string(), json!("analysis_type"));
        let body = ErrorResponse::new("ANALYSIS_TYPE_UNSUPPORTED", "nope").with_details(details);
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["details"]["field"], "analysis_type");
    }
}
