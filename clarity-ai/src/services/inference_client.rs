//! Inference Client
//!
//! One outbound call per invocation to the hosted inference API, bearer
//! authenticated and bounded by a hard timeout. The client never retries;
//! see [`crate::services::retry`] for the caller-side policy.
//!
//! Wire format:
//! - `POST {base}/models/{model_id}` with `{"inputs": ..., "parameters": ...}`
//! - text generation answers `[{"generated_text": "..."}]`
//! - zero-shot classification answers `{"labels": [...], "scores": [...]}`
//! - `GET {base}/status/{model_id}` is the lightweight health probe

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Map, Value};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::HuggingFaceSettings;

/// Longest upstream body excerpt kept in an error
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Raw inference failure, prior to classification
#[derive(Debug, Clone, Error)]
pub enum InferenceFailure {
    #[error("inference API token not configured")]
    MissingToken,

    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
        /// Seconds until a loading model is expected to be ready
        estimated_time: Option<f64>,
    },

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Parse(String),
}

impl InferenceFailure {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            InferenceFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Worth re-invoking after a backoff (429 and 503)
    pub fn is_transient(&self) -> bool {
        matches!(self.status_code(), Some(429) | Some(503))
    }

    /// Upstream hint for how long a cold model needs to load
    pub fn retry_hint(&self) -> Option<Duration> {
        match self {
            InferenceFailure::Http {
                estimated_time: Some(secs),
                ..
            } if secs.is_finite() && *secs > 0.0 => Some(Duration::from_secs_f64(*secs)),
            _ => None,
        }
    }
}

/// Seam between the analysis façade and the model host
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Run one inference call
    async fn infer(
        &self,
        model_id: &str,
        content: &str,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, InferenceFailure>;

    /// Lightweight reachability check; returns round-trip time
    async fn probe(&self, model_id: &str) -> Result<Duration, InferenceFailure>;

    /// Whether credentials are present at all
    fn is_configured(&self) -> bool;
}

/// Hosted inference API client
pub struct HuggingFaceClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    rate_limiter: DefaultDirectRateLimiter,
}

impl HuggingFaceClient {
    pub fn new(settings: &HuggingFaceSettings) -> Result<Self, InferenceFailure> {
        let http_client = reqwest::Client::builder()
            .user_agent(clarity_common::config::get_user_agent())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| InferenceFailure::Transport(e.to_string()))?;

        let rps = NonZeroU32::new(settings.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }

    fn token(&self) -> Result<&str, InferenceFailure> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(InferenceFailure::MissingToken)
    }

    async fn send_inference(
        &self,
        model_id: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, InferenceFailure> {
        let token = self.token()?;

        self.rate_limiter.until_ready().await;

        let url = format!("{}/models/{}", self.base_url, model_id);
        tracing::debug!(model_id, %url, "Sending inference request");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_failure(status.as_u16(), &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceFailure::Timeout(timeout)
                } else {
                    InferenceFailure::Parse(e.to_string())
                }
            })
    }
}

#[async_trait]
impl InferenceBackend for HuggingFaceClient {
    async fn infer(
        &self,
        model_id: &str,
        content: &str,
        parameters: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value, InferenceFailure> {
        let payload = build_payload(content, parameters);
        let start = Instant::now();

        // Hard bound covers the rate limiter wait as well as the HTTP exchange
        let result = tokio::time::timeout(timeout, self.send_inference(model_id, &payload, timeout))
            .await
            .unwrap_or(Err(InferenceFailure::Timeout(timeout)));

        match &result {
            Ok(_) => tracing::info!(
                model_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Inference call successful"
            ),
            Err(e) => tracing::debug!(
                model_id,
                duration_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Inference call failed"
            ),
        }

        result
    }

    async fn probe(&self, model_id: &str) -> Result<Duration, InferenceFailure> {
        let token = self.token()?;
        let url = format!("{}/status/{}", self.base_url, model_id);
        let timeout = Duration::from_secs(5);
        let start = Instant::now();

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_failure(status.as_u16(), &body));
        }

        Ok(start.elapsed())
    }

    fn is_configured(&self) -> bool {
        self.token().is_ok()
    }
}

/// Request body for one inference call; empty parameters are omitted
pub fn build_payload(content: &str, parameters: &Map<String, Value>) -> Value {
    if parameters.is_empty() {
        json!({ "inputs": content })
    } else {
        json!({ "inputs": content, "parameters": parameters })
    }
}

/// Extract the generated text from a text-generation response
pub fn parse_generated_text(output: &Value) -> Result<String, InferenceFailure> {
    let entry = match output {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(output),
        _ => None,
    };

    entry
        .and_then(|e| e.get("generated_text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InferenceFailure::Parse("missing generated_text".to_string()))
}

/// Labels from a zero-shot response whose score exceeds `threshold`
pub fn parse_zero_shot_labels(
    output: &Value,
    threshold: f64,
) -> Result<Vec<String>, InferenceFailure> {
    let labels = output
        .get("labels")
        .and_then(Value::as_array)
        .ok_or_else(|| InferenceFailure::Parse("missing labels".to_string()))?;
    let scores = output
        .get("scores")
        .and_then(Value::as_array)
        .ok_or_else(|| InferenceFailure::Parse("missing scores".to_string()))?;

    Ok(labels
        .iter()
        .zip(scores)
        .filter_map(|(label, score)| {
            let label = label.as_str()?;
            let score = score.as_f64()?;
            (score > threshold).then(|| label.to_string())
        })
        .collect())
}

fn http_failure(status: u16, body: &str) -> InferenceFailure {
    let estimated_time = if status == 503 {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("estimated_time").and_then(Value::as_f64))
    } else {
        None
    };

    InferenceFailure::Http {
        status,
        body: truncate_body(body),
        estimated_time,
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> InferenceFailure {
    if err.is_timeout() {
        InferenceFailure::Timeout(timeout)
    } else {
        InferenceFailure::Transport(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    if body.is_empty() {
        return "No response text".to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_without_token() {
        let client = HuggingFaceClient::new(&HuggingFaceSettings::default()).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn test_blank_token_is_not_configured() {
        let settings = HuggingFaceSettings {
            api_token: Some("  ".to_string()),
            ..HuggingFaceSettings::default()
        };
        let client = HuggingFaceClient::new(&settings).unwrap();
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_network() {
        let settings = HuggingFaceSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..HuggingFaceSettings::default()
        };
        let client = HuggingFaceClient::new(&settings).unwrap();

        let result = client
            .infer("google/flan-t5-base", "hi", &Map::new(), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(InferenceFailure::MissingToken)));
    }

    #[test]
    fn test_build_payload_omits_empty_parameters() {
        let payload = build_payload("hello", &Map::new());
        assert_eq!(payload, json!({"inputs": "hello"}));

        let mut params = Map::new();
        params.insert("max_new_tokens".to_string(), json!(64));
        let payload = build_payload("hello", &params);
        assert_eq!(payload["parameters"]["max_new_tokens"], 64);
    }

    #[test]
    fn test_parse_generated_text_list_and_object() {
        let list = json!([{"generated_text": "looks fine"}]);
        assert_eq!(parse_generated_text(&list).unwrap(), "looks fine");

        let object = json!({"generated_text": "also fine"});
        assert_eq!(parse_generated_text(&object).unwrap(), "also fine");

        assert!(matches!(
            parse_generated_text(&json!([])),
            Err(InferenceFailure::Parse(_))
        ));
    }

    #[test]
    fn test_parse_zero_shot_threshold() {
        let output = json!({
            "labels": ["functional requirement", "constraint", "non-functional requirement"],
            "scores": [0.71, 0.5, 0.12]
        });
        let labels = parse_zero_shot_labels(&output, 0.5).unwrap();
        assert_eq!(labels, vec!["functional requirement".to_string()]);
    }

    #[test]
    fn test_http_failure_reads_estimated_time() {
        let failure = http_failure(503, r#"{"error":"loading","estimated_time":12.5}"#);
        assert!(failure.is_transient());
        assert_eq!(failure.retry_hint(), Some(Duration::from_secs_f64(12.5)));

        let failure = http_failure(500, r#"{"estimated_time":12.5}"#);
        assert!(!failure.is_transient());
        assert_eq!(failure.retry_hint(), None);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_body(&long).len(), MAX_ERROR_BODY_CHARS);
        assert_eq!(truncate_body(""), "No response text");
    }
}
