//! Test Helper Utilities
//!
//! Shared utilities for testing clarity-ai: a scripted inference backend,
//! fast configuration, router plumbing and throwaway HTTP servers.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use clarity_ai::config::{AiEngineConfig, RetryPolicy};
use clarity_ai::models::BART_LARGE_MNLI;
use clarity_ai::services::{InferenceBackend, InferenceFailure};
use clarity_ai::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const GENERATED_TEXT: &str = "The function is a stub; add a docstring and tests.";

/// Scripted inference backend with call counting
pub struct StubBackend {
    infer_result: Result<Value, InferenceFailure>,
    probe_result: Result<(), InferenceFailure>,
    probe_delay: Duration,
    /// Per-model latency added to `infer`
    infer_delays: Vec<(String, Duration)>,
    /// Remaining probes that panic instead of answering
    probe_panics: AtomicUsize,
    configured: bool,
    infer_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl StubBackend {
    /// Succeeds for every model
    pub fn ok() -> Self {
        Self {
            infer_result: Ok(json!([{ "generated_text": GENERATED_TEXT }])),
            probe_result: Ok(()),
            probe_delay: Duration::ZERO,
            infer_delays: Vec::new(),
            probe_panics: AtomicUsize::new(0),
            configured: true,
            infer_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }

    /// Fails every inference call with `failure`
    pub fn failing(failure: InferenceFailure) -> Self {
        Self {
            infer_result: Err(failure),
            ..Self::ok()
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            infer_result: Err(InferenceFailure::MissingToken),
            probe_result: Err(InferenceFailure::MissingToken),
            configured: false,
            ..Self::ok()
        }
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn with_infer_delay(mut self, model_id: &str, delay: Duration) -> Self {
        self.infer_delays.push((model_id.to_string(), delay));
        self
    }

    pub fn with_probe_panics(self, count: usize) -> Self {
        self.probe_panics.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_probe_failure(mut self, failure: InferenceFailure) -> Self {
        self.probe_result = Err(failure);
        self
    }

    pub fn infer_calls(&self) -> usize {
        self.infer_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    async fn infer(
        &self,
        model_id: &str,
        _content: &str,
        parameters: &Map<String, Value>,
        _timeout: Duration,
    ) -> Result<Value, InferenceFailure> {
        self.infer_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((_, delay)) = self.infer_delays.iter().find(|(m, _)| m == model_id) {
            tokio::time::sleep(*delay).await;
        }

        match &self.infer_result {
            Ok(_) if model_id == BART_LARGE_MNLI => {
                let labels = parameters
                    .get("candidate_labels")
                    .cloned()
                    .unwrap_or_else(|| json!([]));
                let count = labels.as_array().map(Vec::len).unwrap_or(0);
                let mut scores = vec![json!(0.1); count];
                if let Some(first) = scores.first_mut() {
                    *first = json!(0.9);
                }
                Ok(json!({ "sequence": "stub", "labels": labels, "scores": scores }))
            }
            Ok(value) => Ok(value.clone()),
            Err(failure) => Err(failure.clone()),
        }
    }

    async fn probe(&self, _model_id: &str) -> Result<Duration, InferenceFailure> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .probe_panics
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            panic!("stub backend probe panicked");
        }
        tokio::time::sleep(self.probe_delay).await;
        self.probe_result.clone().map(|_| self.probe_delay)
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Defaults with millisecond-scale retry backoff
pub fn fast_config() -> AiEngineConfig {
    let mut config = AiEngineConfig::default();
    config.analysis.retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
        cold_start_allowance: Duration::from_millis(5),
    };
    config
}

pub fn test_state(backend: Arc<StubBackend>) -> AppState {
    AppState::with_backend(&fast_config(), backend).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `router` on an ephemeral local port
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Poll `check` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
