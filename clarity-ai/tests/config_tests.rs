//! AI Engine configuration resolution tests
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Every test here clears the engine's environment variables first.

use clarity_ai::config::{
    AiEngineConfig, DEFAULT_HUGGINGFACE_API_URL, ENV_HUGGINGFACE_API_TOKEN,
    ENV_HUGGINGFACE_API_URL, ENV_ISSUE_TRACKER_TOKEN, ENV_ISSUE_TRACKER_URL, ENV_MONITORING_TOKEN,
    ENV_MONITORING_URL,
};
use clarity_common::config::{load_toml_config, TomlConfig};
use serial_test::serial;
use std::env;
use std::time::Duration;
use tempfile::TempDir;

fn clear_env() {
    for name in [
        ENV_HUGGINGFACE_API_TOKEN,
        ENV_HUGGINGFACE_API_URL,
        ENV_MONITORING_URL,
        ENV_MONITORING_TOKEN,
        ENV_ISSUE_TRACKER_URL,
        ENV_ISSUE_TRACKER_TOKEN,
    ] {
        env::remove_var(name);
    }
}

fn toml(content: &str) -> TomlConfig {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ai-engine.toml");
    std::fs::write(&path, content).unwrap();
    load_toml_config(&path).unwrap()
}

#[test]
#[serial]
fn test_defaults_without_sources() {
    clear_env();

    let config = AiEngineConfig::resolve(&TomlConfig::default()).unwrap();

    assert!(config.huggingface.api_token.is_none());
    assert_eq!(config.huggingface.base_url, DEFAULT_HUGGINGFACE_API_URL);
    assert!(config.monitoring.monitoring.is_none());
    assert!(config.monitoring.issue_tracker.is_none());
    assert_eq!(config.analysis.max_content_chars, 100_000);
}

#[test]
#[serial]
fn test_env_token_overrides_toml() {
    clear_env();
    env::set_var(ENV_HUGGINGFACE_API_TOKEN, "hf_env");

    let config = AiEngineConfig::resolve(&toml(r#"huggingface_api_token = "hf_toml""#)).unwrap();
    assert_eq!(config.huggingface.api_token.as_deref(), Some("hf_env"));

    clear_env();
}

#[test]
#[serial]
fn test_toml_token_used_when_env_blank() {
    clear_env();
    env::set_var(ENV_HUGGINGFACE_API_TOKEN, "   ");

    let config = AiEngineConfig::resolve(&toml(r#"huggingface_api_token = "hf_toml""#)).unwrap();
    assert_eq!(config.huggingface.api_token.as_deref(), Some("hf_toml"));

    clear_env();
}

#[test]
#[serial]
fn test_base_url_trailing_slash_trimmed() {
    clear_env();
    env::set_var(ENV_HUGGINGFACE_API_URL, "http://localhost:9999/");

    let config = AiEngineConfig::resolve(&TomlConfig::default()).unwrap();
    assert_eq!(config.huggingface.base_url, "http://localhost:9999");

    clear_env();
}

#[test]
#[serial]
fn test_endpoint_needs_url_and_token() {
    clear_env();
    env::set_var(ENV_MONITORING_URL, "https://monitor.example/events");
    env::set_var(ENV_ISSUE_TRACKER_URL, "https://tracker.example/issues");
    env::set_var(ENV_ISSUE_TRACKER_TOKEN, "tracker-token");

    let config = AiEngineConfig::resolve(&TomlConfig::default()).unwrap();

    assert!(config.monitoring.monitoring.is_none(), "token missing");
    let tracker = config.monitoring.issue_tracker.unwrap();
    assert_eq!(tracker.url, "https://tracker.example/issues");
    assert_eq!(tracker.token, "tracker-token");

    clear_env();
}

#[test]
#[serial]
fn test_endpoint_halves_may_come_from_different_sources() {
    clear_env();
    env::set_var(ENV_MONITORING_TOKEN, "env-token");

    let config = AiEngineConfig::resolve(&toml(
        r#"
[monitoring]
url = "https://monitor.example/events"
"#,
    ))
    .unwrap();

    let monitoring = config.monitoring.monitoring.unwrap();
    assert_eq!(monitoring.url, "https://monitor.example/events");
    assert_eq!(monitoring.token, "env-token");

    clear_env();
}

#[test]
#[serial]
fn test_ai_engine_section_tuning() {
    clear_env();

    let config = AiEngineConfig::resolve(&toml(
        r#"
[ai_engine]
request_timeout_secs = 15
analysis_timeout_secs = 45
max_content_chars = 2000
retry_max_attempts = 5
retry_initial_backoff_ms = 100
error_rate_medium_threshold = 2
error_rate_high_threshold = 8
issue_count_threshold = 3
issue_cooldown_secs = 600
health_probe_timeout_ms = 50
"#,
    ))
    .unwrap();

    assert_eq!(config.huggingface.request_timeout, Duration::from_secs(15));
    assert_eq!(config.analysis.timeout, Duration::from_secs(45));
    assert_eq!(config.analysis.max_content_chars, 2000);
    assert_eq!(config.analysis.retry.max_attempts, 5);
    assert_eq!(config.analysis.retry.initial_backoff, Duration::from_millis(100));
    // Unset keys keep their defaults
    assert_eq!(config.analysis.retry.max_backoff, Duration::from_millis(8000));
    assert_eq!(config.monitoring.thresholds.medium, 2);
    assert_eq!(config.monitoring.thresholds.high, 8);
    assert_eq!(config.monitoring.issue_count_threshold, 3);
    assert_eq!(config.monitoring.issue_cooldown, Some(Duration::from_secs(600)));
    assert_eq!(config.health.probe_timeout, Duration::from_millis(50));
}

#[test]
#[serial]
fn test_zero_attempts_clamped_to_one() {
    clear_env();

    let config = AiEngineConfig::resolve(&toml(
        r#"
[ai_engine]
retry_max_attempts = 0
"#,
    ))
    .unwrap();

    assert_eq!(config.analysis.retry.max_attempts, 1);
}

#[test]
#[serial]
fn test_invalid_section_is_error() {
    clear_env();

    let result = AiEngineConfig::resolve(&toml(
        r#"
[ai_engine]
request_timeout_secs = "soon"
"#,
    ));

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_medium_threshold_above_high_rejected() {
    clear_env();

    let result = AiEngineConfig::resolve(&toml(
        r#"
[ai_engine]
error_rate_medium_threshold = 30
error_rate_high_threshold = 10
"#,
    ));

    let err = result.unwrap_err().to_string();
    assert!(err.contains("error_rate_medium_threshold"), "{}", err);
}

#[test]
#[serial]
fn test_equal_thresholds_accepted() {
    clear_env();

    let config = AiEngineConfig::resolve(&toml(
        r#"
[ai_engine]
error_rate_medium_threshold = 10
error_rate_high_threshold = 10
"#,
    ))
    .unwrap();

    assert_eq!(config.monitoring.thresholds.medium, 10);
    assert_eq!(config.monitoring.thresholds.high, 10);
}
