//! Configuration resolution for clarity-ai
//!
//! Every secret and endpoint resolves with **ENV → TOML → default** priority.
//! Tuning values (timeouts, retries, thresholds) come from the `[ai_engine]`
//! TOML table and fall back to compiled defaults.

use clarity_common::config::{EndpointConfig, TomlConfig};
use clarity_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::services::error_aggregator::ErrorRateThresholds;

pub const ENV_HUGGINGFACE_API_TOKEN: &str = "HUGGINGFACE_API_TOKEN";
pub const ENV_HUGGINGFACE_API_URL: &str = "HUGGINGFACE_API_URL";
pub const ENV_MONITORING_URL: &str = "ERROR_MONITORING_URL";
pub const ENV_MONITORING_TOKEN: &str = "ERROR_MONITORING_TOKEN";
pub const ENV_ISSUE_TRACKER_URL: &str = "ISSUE_TRACKER_URL";
pub const ENV_ISSUE_TRACKER_TOKEN: &str = "ISSUE_TRACKER_TOKEN";

pub const DEFAULT_HUGGINGFACE_API_URL: &str = "https://api-inference.huggingface.co";

/// `[ai_engine]` TOML table
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineTuning {
    pub request_timeout_secs: Option<u64>,
    pub analysis_timeout_secs: Option<u64>,
    pub cold_start_allowance_secs: Option<u64>,
    pub max_content_chars: Option<usize>,
    pub retry_max_attempts: Option<u32>,
    pub retry_initial_backoff_ms: Option<u64>,
    pub retry_max_backoff_ms: Option<u64>,
    pub requests_per_second: Option<u32>,
    pub error_rate_medium_threshold: Option<u64>,
    pub error_rate_high_threshold: Option<u64>,
    pub issue_count_threshold: Option<u64>,
    pub issue_cooldown_secs: Option<u64>,
    pub health_probe_timeout_ms: Option<u64>,
    pub health_probe_cache_secs: Option<u64>,
    pub health_slow_threshold_ms: Option<u64>,
}

/// Upstream inference API settings
#[derive(Debug, Clone)]
pub struct HuggingFaceSettings {
    /// Absent token leaves the engine in an explicit "unavailable" state
    pub api_token: Option<String>,
    pub base_url: String,
    /// Hard bound on a single inference call
    pub request_timeout: Duration,
    /// Client-side rate limit
    pub requests_per_second: u32,
}

impl Default for HuggingFaceSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_HUGGINGFACE_API_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            requests_per_second: 10,
        }
    }
}

/// Retry policy for transient inference failures (RATE_LIMIT, SERVICE_UNAVAILABLE)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retries
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Upper bound on honouring a loading model's `estimated_time`
    pub cold_start_allowance: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(8000),
            cold_start_allowance: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Budget for a whole analysis, retries included
    pub timeout: Duration,
    pub max_content_chars: usize,
    pub retry: RetryPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_content_chars: 100_000,
            retry: RetryPolicy::default(),
        }
    }
}

/// Fully resolved outbound side channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct MonitoringSettings {
    pub monitoring: Option<Endpoint>,
    pub issue_tracker: Option<Endpoint>,
    /// Per-(error_code, model) count that triggers issue filing
    pub issue_count_threshold: u64,
    /// `None`: file at most once per pair for the process lifetime
    pub issue_cooldown: Option<Duration>,
    pub thresholds: ErrorRateThresholds,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            monitoring: None,
            issue_tracker: None,
            issue_count_threshold: 5,
            issue_cooldown: None,
            thresholds: ErrorRateThresholds::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// How long `/health` waits for a live upstream probe
    pub probe_timeout: Duration,
    /// How long a completed probe may stand in for a live one
    pub probe_cache_ttl: Duration,
    /// Probes slower than this report the upstream as degraded
    pub slow_threshold: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(80),
            probe_cache_ttl: Duration::from_secs(30),
            slow_threshold: Duration::from_millis(2000),
        }
    }
}

/// Complete AI Engine configuration
#[derive(Debug, Clone, Default)]
pub struct AiEngineConfig {
    pub huggingface: HuggingFaceSettings,
    pub analysis: AnalysisSettings,
    pub monitoring: MonitoringSettings,
    pub health: HealthSettings,
}

impl AiEngineConfig {
    /// Resolve from environment + TOML
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let tuning: EngineTuning = toml_config.section("ai_engine")?;
        let defaults = AiEngineConfig::default();

        let api_token = resolve_secret(
            "Inference API token",
            ENV_HUGGINGFACE_API_TOKEN,
            toml_config.huggingface_api_token.as_deref(),
        );
        if api_token.is_none() {
            warn!(
                "Inference API token not configured ({} unset); analysis requests will report MODEL_UNAVAILABLE",
                ENV_HUGGINGFACE_API_TOKEN
            );
        }

        let base_url = resolve_secret(
            "Inference API URL",
            ENV_HUGGINGFACE_API_URL,
            toml_config.huggingface_api_url.as_deref(),
        )
        .unwrap_or(defaults.huggingface.base_url);

        let huggingface = HuggingFaceSettings {
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: tuning
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.huggingface.request_timeout),
            requests_per_second: tuning
                .requests_per_second
                .filter(|rps| *rps > 0)
                .unwrap_or(defaults.huggingface.requests_per_second),
        };

        let retry = RetryPolicy {
            max_attempts: tuning
                .retry_max_attempts
                .unwrap_or(defaults.analysis.retry.max_attempts)
                .max(1),
            initial_backoff: tuning
                .retry_initial_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.analysis.retry.initial_backoff),
            max_backoff: tuning
                .retry_max_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.analysis.retry.max_backoff),
            cold_start_allowance: tuning
                .cold_start_allowance_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis.retry.cold_start_allowance),
        };

        let analysis = AnalysisSettings {
            timeout: tuning
                .analysis_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.analysis.timeout),
            max_content_chars: tuning
                .max_content_chars
                .unwrap_or(defaults.analysis.max_content_chars),
            retry,
        };

        let default_thresholds = ErrorRateThresholds::default();
        let thresholds = ErrorRateThresholds {
            medium: tuning
                .error_rate_medium_threshold
                .unwrap_or(default_thresholds.medium),
            high: tuning
                .error_rate_high_threshold
                .unwrap_or(default_thresholds.high),
        };
        if thresholds.medium > thresholds.high {
            return Err(Error::Config(format!(
                "[ai_engine] error_rate_medium_threshold ({}) exceeds error_rate_high_threshold ({})",
                thresholds.medium, thresholds.high
            )));
        }

        let monitoring = MonitoringSettings {
            monitoring: resolve_endpoint(
                "Error monitoring",
                ENV_MONITORING_URL,
                ENV_MONITORING_TOKEN,
                toml_config.monitoring.as_ref(),
            ),
            issue_tracker: resolve_endpoint(
                "Issue tracker",
                ENV_ISSUE_TRACKER_URL,
                ENV_ISSUE_TRACKER_TOKEN,
                toml_config.issue_tracker.as_ref(),
            ),
            issue_count_threshold: tuning
                .issue_count_threshold
                .unwrap_or(defaults.monitoring.issue_count_threshold)
                .max(1),
            issue_cooldown: tuning.issue_cooldown_secs.map(Duration::from_secs),
            thresholds,
        };

        let health = HealthSettings {
            probe_timeout: tuning
                .health_probe_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.health.probe_timeout),
            probe_cache_ttl: tuning
                .health_probe_cache_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.health.probe_cache_ttl),
            slow_threshold: tuning
                .health_slow_threshold_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.health.slow_threshold),
        };

        Ok(Self {
            huggingface,
            analysis,
            monitoring,
            health,
        })
    }
}

/// Resolve a single value from ENV, then TOML
///
/// Warns when both sources carry a valid value.
pub fn resolve_secret(label: &str, env_name: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_name).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some(value.trim().to_string());
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Some(value.trim().to_string());
    }

    None
}

/// Resolve a URL + token pair; both halves are required
pub fn resolve_endpoint(
    label: &str,
    url_env: &str,
    token_env: &str,
    toml_endpoint: Option<&EndpointConfig>,
) -> Option<Endpoint> {
    let url = resolve_secret(
        &format!("{} URL", label),
        url_env,
        toml_endpoint.and_then(|e| e.url.as_deref()),
    );
    let token = resolve_secret(
        &format!("{} token", label),
        token_env,
        toml_endpoint.and_then(|e| e.token.as_deref()),
    );

    match (url, token) {
        (Some(url), Some(token)) => {
            info!("{} enabled: {}", label, url);
            Some(Endpoint { url, token })
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!(
                "{} partially configured (need both {} and {}); disabled",
                label, url_env, token_env
            );
            None
        }
        (None, None) => {
            info!("{} not configured; disabled", label);
            None
        }
    }
}

/// Validate a secret value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
