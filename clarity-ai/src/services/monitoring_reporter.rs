//! Monitoring Reporter
//!
//! Best-effort delivery of classified errors to an external monitoring
//! endpoint and escalation of repeated or critical errors to an issue
//! tracker. Nothing here can fail or delay an analysis response: deliveries
//! run on spawned tasks and every failure is logged and swallowed.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::{Endpoint, MonitoringSettings};
use crate::services::error_aggregator::ErrorAggregator;
use crate::services::error_classifier::{ErrorCode, ErrorEvent};

const MONITORING_TIMEOUT: Duration = Duration::from_secs(5);
const ISSUE_TIMEOUT: Duration = Duration::from_secs(10);
const ISSUE_RECENT_ERRORS: usize = 5;
pub const ISSUE_LABELS: [&str; 3] = ["ai-engine", "inference-api-error", "auto-generated"];

/// Issue filing decision
///
/// Critical codes (AUTH_ERROR, QUOTA_EXCEEDED) file on first sight; everything
/// else once the `(error_code, model_id)` count reaches `threshold`.
pub fn should_file(count: u64, error_code: ErrorCode, threshold: u64) -> bool {
    error_code.is_critical() || count >= threshold
}

pub struct MonitoringReporter {
    http_client: reqwest::Client,
    monitoring: Option<Endpoint>,
    issue_tracker: Option<Endpoint>,
    aggregator: Arc<ErrorAggregator>,
    issue_count_threshold: u64,
    issue_cooldown: Option<Duration>,
    /// When each pair last triggered filing
    filed: Mutex<HashMap<(ErrorCode, String), Instant>>,
}

impl MonitoringReporter {
    pub fn new(
        settings: &MonitoringSettings,
        aggregator: Arc<ErrorAggregator>,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(clarity_common::config::get_user_agent())
            .build()?;

        Ok(Self {
            http_client,
            monitoring: settings.monitoring.clone(),
            issue_tracker: settings.issue_tracker.clone(),
            aggregator,
            issue_count_threshold: settings.issue_count_threshold,
            issue_cooldown: settings.issue_cooldown,
            filed: Mutex::new(HashMap::new()),
        })
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.is_some()
    }

    pub fn issue_tracker_enabled(&self) -> bool {
        self.issue_tracker.is_some()
    }

    /// Fan an already-recorded event out to the side channels
    ///
    /// Returns immediately; deliveries run on their own tasks so they outlive
    /// a dropped caller.
    pub fn dispatch(self: &Arc<Self>, event: &ErrorEvent, count: u64) {
        if self.monitoring_enabled() {
            let reporter = Arc::clone(self);
            let event = event.clone();
            tokio::spawn(async move {
                reporter.report(&event).await;
            });
        }

        if self.maybe_file_issue(event, count) && self.issue_tracker_enabled() {
            let reporter = Arc::clone(self);
            let event = event.clone();
            tokio::spawn(async move {
                reporter.file_issue(&event, count).await;
            });
        }
    }

    /// Decide whether this occurrence triggers issue filing, and claim the pair
    ///
    /// A pair triggers at most once per process, or once per cooldown window
    /// when one is configured.
    pub fn maybe_file_issue(&self, event: &ErrorEvent, count: u64) -> bool {
        if !should_file(count, event.error_code, self.issue_count_threshold) {
            return false;
        }

        let key = (event.error_code, event.model_id.clone());
        let mut filed = self.filed.lock().unwrap_or_else(|p| p.into_inner());

        let claimable = match filed.get(&key) {
            None => true,
            Some(at) => self
                .issue_cooldown
                .is_some_and(|cooldown| at.elapsed() >= cooldown),
        };

        if claimable {
            filed.insert(key, Instant::now());
            tracing::info!(
                error_code = %event.error_code,
                model_id = %event.model_id,
                count,
                "Issue filing triggered"
            );
        }

        claimable
    }

    /// Number of pairs that have triggered issue filing
    pub fn filed_count(&self) -> usize {
        self.filed.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Send one event to the monitoring endpoint
    ///
    /// Returns `true` on a 2xx answer. Never fails.
    pub async fn report(&self, event: &ErrorEvent) -> bool {
        let Some(endpoint) = &self.monitoring else {
            return false;
        };

        let payload = json!({
            "service": "ai-engine",
            "level": "error",
            "message": format!("Inference API error: {}", event.error_code),
            "metadata": event,
        });

        let result = self
            .http_client
            .post(&endpoint.url)
            .bearer_auth(&endpoint.token)
            .timeout(MONITORING_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(request_id = %event.request_id, "Error reported to monitoring service");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    request_id = %event.request_id,
                    "Monitoring service rejected error report"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, request_id = %event.request_id, "Failed to report error to monitoring service");
                false
            }
        }
    }

    /// Create an issue for a repeated or critical error
    ///
    /// Returns `true` when the tracker answers 200 or 201. Never fails.
    pub async fn file_issue(&self, event: &ErrorEvent, count: u64) -> bool {
        let Some(endpoint) = &self.issue_tracker else {
            return false;
        };

        let recent = self.aggregator.recent(ISSUE_RECENT_ERRORS);
        let payload = issue_payload(event, count, &recent);

        let result = self
            .http_client
            .post(&endpoint.url)
            .bearer_auth(&endpoint.token)
            .timeout(ISSUE_TIMEOUT)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if matches!(response.status().as_u16(), 200 | 201) => {
                tracing::info!(
                    error_code = %event.error_code,
                    model_id = %event.model_id,
                    count,
                    "Issue created for inference API error"
                );
                true
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    error_code = %event.error_code,
                    "Issue tracker rejected issue"
                );
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, error_code = %event.error_code, "Failed to create issue");
                false
            }
        }
    }
}

/// Issue tracker request body
pub fn issue_payload(event: &ErrorEvent, count: u64, recent: &[ErrorEvent]) -> Value {
    let title = format!(
        "[AI-Engine] Inference API error: {} ({} occurrences)",
        event.error_code, count
    );

    let recent_json = serde_json::to_string_pretty(recent).unwrap_or_else(|_| "[]".to_string());
    let status_line = event
        .status_code
        .map(|s| format!("**HTTP Status:** {}\n", s))
        .unwrap_or_default();

    let body = format!(
        "## Inference API Error Report\n\n\
         **Error Code:** {}\n\
         **Model:** {}\n\
         **Occurrences:** {}\n\
         {}\
         **Latest Message:** {}\n\
         **Timestamp:** {}\n\
         **Request ID:** {}\n\n\
         ### Recent Errors\n\n\
         ```json\n{}\n```\n",
        event.error_code,
        event.model_id,
        count,
        status_line,
        event.message,
        event.timestamp,
        event.request_id,
        recent_json
    );

    json!({
        "title": title,
        "body": body,
        "labels": ISSUE_LABELS,
    })
}
