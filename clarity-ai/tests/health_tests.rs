//! Health report tests
//!
//! The report must stay fast and never fail, whatever the upstream does.

mod helpers;

use clarity_ai::models::HealthStatus;
use clarity_ai::services::InferenceFailure;
use clarity_ai::AppState;
use helpers::{fast_config, test_state, StubBackend};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_healthy_when_everything_answers() {
    let state = test_state(Arc::new(StubBackend::ok()));

    let report = state.health.health().await;

    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.service, "ai-engine");
    assert_eq!(report.components.ai_engine.status, HealthStatus::Healthy);
    assert_eq!(report.components.huggingface_api.status, HealthStatus::Healthy);
    assert!(report.components.huggingface_api.response_time_ms.is_some());
    assert_eq!(report.components.models.available_count, Some(2));
}

#[tokio::test]
async fn test_unhealthy_when_engine_not_initialized() {
    let state = test_state(Arc::new(StubBackend::ok()));
    state.engine.set_initialized(false);

    let report = state.health.health().await;

    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.components.ai_engine.status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_delayed_probe_does_not_block_health() {
    let backend = Arc::new(StubBackend::ok().with_probe_delay(Duration::from_millis(400)));
    let state = test_state(backend.clone());

    let start = Instant::now();
    let report = state.health.health().await;
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_millis(300), "health took {:?}", elapsed);
    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(report
        .components
        .huggingface_api
        .message
        .contains("pending"));

    // Detached probe finishes and refreshes the cache
    tokio::time::sleep(Duration::from_millis(600)).await;
    let report = state.health.health().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(backend.probe_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_health_checks_share_one_probe() {
    let backend = Arc::new(StubBackend::ok().with_probe_delay(Duration::from_millis(300)));
    let state = test_state(backend.clone());

    let (a, b) = tokio::join!(state.health.health(), state.health.health());

    assert_eq!(a.status, HealthStatus::Degraded);
    assert_eq!(b.status, HealthStatus::Degraded);
    assert_eq!(backend.probe_calls(), 1);
}

#[tokio::test]
async fn test_probe_failure_degrades() {
    let backend = Arc::new(
        StubBackend::ok().with_probe_failure(InferenceFailure::Transport("dns failure".into())),
    );
    let state = test_state(backend);

    let report = state.health.health().await;

    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.components.huggingface_api.status, HealthStatus::Unhealthy);
    assert!(report
        .components
        .huggingface_api
        .last_error
        .as_deref()
        .unwrap()
        .contains("dns failure"));
    assert_eq!(report.components.models.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_slow_probe_degrades() {
    let mut config = fast_config();
    config.health.probe_timeout = Duration::from_millis(500);
    config.health.slow_threshold = Duration::from_millis(10);
    let backend = Arc::new(StubBackend::ok().with_probe_delay(Duration::from_millis(50)));
    let state = AppState::with_backend(&config, backend).unwrap();

    let report = state.health.health().await;

    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.components.huggingface_api.status, HealthStatus::Degraded);
}

#[tokio::test]
async fn test_missing_token_degrades_without_probe() {
    let backend = Arc::new(StubBackend::unconfigured());
    let state = test_state(backend.clone());

    let report = state.health.health().await;

    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(report
        .components
        .huggingface_api
        .message
        .contains("not configured"));
    assert_eq!(backend.probe_calls(), 0);
}

#[tokio::test]
async fn test_panicking_upstream_check_does_not_block_later_checks() {
    let backend = Arc::new(StubBackend::ok().with_probe_panics(1));
    let state = test_state(backend.clone());

    let report = state.health.health().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.components.huggingface_api.status, HealthStatus::Unhealthy);
    assert_eq!(
        report.components.huggingface_api.message,
        "Inference API check failed"
    );

    // Upstream recovered; the next check probes again
    let report = state.health.health().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.components.huggingface_api.status, HealthStatus::Healthy);
    assert_eq!(backend.probe_calls(), 2);
}
