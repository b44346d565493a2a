//! Error Classifier
//!
//! Maps a raw [`InferenceFailure`] onto the fixed seven-kind taxonomy used
//! for aggregation and alerting.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::services::inference_client::InferenceFailure;

/// Classified inference failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthError,
    RateLimit,
    ServiceUnavailable,
    QuotaExceeded,
    HttpError,
    NetworkError,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Escalated to the issue tracker on first occurrence
    pub fn is_critical(&self) -> bool {
        matches!(self, ErrorCode::AuthError | ErrorCode::QuotaExceeded)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub error_code: ErrorCode,
    pub model_id: String,
    pub message: String,
    pub timestamp: String,
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Classify a raw failure
///
/// **Priority order:**
/// 1. 401/403 or missing credentials → AUTH_ERROR
/// 2. 429 → RATE_LIMIT
/// 3. 503 → SERVICE_UNAVAILABLE
/// 4. 402 → QUOTA_EXCEEDED
/// 5. any other status → HTTP_ERROR
/// 6. timeout / connection / DNS → NETWORK_ERROR
/// 7. anything else → UNKNOWN_ERROR
pub fn classify_failure(failure: &InferenceFailure) -> ErrorCode {
    match failure {
        InferenceFailure::MissingToken => ErrorCode::AuthError,
        InferenceFailure::Http { status, .. } => match status {
            401 | 403 => ErrorCode::AuthError,
            429 => ErrorCode::RateLimit,
            503 => ErrorCode::ServiceUnavailable,
            402 => ErrorCode::QuotaExceeded,
            _ => ErrorCode::HttpError,
        },
        InferenceFailure::Timeout(_) | InferenceFailure::Transport(_) => ErrorCode::NetworkError,
        InferenceFailure::Parse(_) => ErrorCode::UnknownError,
    }
}

/// Build the event recorded for a failed call
pub fn classify(failure: &InferenceFailure, model_id: &str, request_id: Uuid) -> ErrorEvent {
    ErrorEvent {
        error_code: classify_failure(failure),
        model_id: model_id.to_string(),
        message: failure.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        request_id,
        status_code: failure.status_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn http(status: u16) -> InferenceFailure {
        InferenceFailure::Http {
            status,
            body: String::new(),
            estimated_time: None,
        }
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_failure(&http(401)), ErrorCode::AuthError);
        assert_eq!(classify_failure(&http(403)), ErrorCode::AuthError);
        assert_eq!(classify_failure(&http(429)), ErrorCode::RateLimit);
        assert_eq!(classify_failure(&http(503)), ErrorCode::ServiceUnavailable);
        assert_eq!(classify_failure(&http(402)), ErrorCode::QuotaExceeded);
        assert_eq!(classify_failure(&http(500)), ErrorCode::HttpError);
        assert_eq!(classify_failure(&http(404)), ErrorCode::HttpError);
    }

    #[test]
    fn test_non_http_classification() {
        assert_eq!(
            classify_failure(&InferenceFailure::MissingToken),
            ErrorCode::AuthError
        );
        assert_eq!(
            classify_failure(&InferenceFailure::Timeout(Duration::from_secs(1))),
            ErrorCode::NetworkError
        );
        assert_eq!(
            classify_failure(&InferenceFailure::Transport("connection refused".into())),
            ErrorCode::NetworkError
        );
        assert_eq!(
            classify_failure(&InferenceFailure::Parse("bad json".into())),
            ErrorCode::UnknownError
        );
    }

    #[test]
    fn test_event_carries_context() {
        let request_id = Uuid::new_v4();
        let event = classify(&http(429), "google/flan-t5-base", request_id);

        assert_eq!(event.error_code, ErrorCode::RateLimit);
        assert_eq!(event.model_id, "google/flan-t5-base");
        assert_eq!(event.request_id, request_id);
        assert_eq!(event.status_code, Some(429));
        assert!(event.message.starts_with("HTTP 429"));
    }

    #[test]
    fn test_error_code_serialization() {
        let value = serde_json::to_value(ErrorCode::ServiceUnavailable).unwrap();
        assert_eq!(value, "SERVICE_UNAVAILABLE");
        assert_eq!(ErrorCode::QuotaExceeded.to_string(), "QUOTA_EXCEEDED");
    }

    #[test]
    fn test_critical_codes() {
        assert!(ErrorCode::AuthError.is_critical());
        assert!(ErrorCode::QuotaExceeded.is_critical());
        assert!(!ErrorCode::RateLimit.is_critical());
    }
}
