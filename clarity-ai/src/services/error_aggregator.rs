//! Error Aggregator
//!
//! In-process counters per `(error_code, model_id)` plus a bounded history of
//! the most recent events. One instance is created at startup and shared by
//! handle; tests build their own isolated instances.
//!
//! All state sits behind a single mutex that is only held for in-memory
//! updates, never across a network call.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::services::error_classifier::{ErrorCode, ErrorEvent};

/// Recent-history capacity
pub const RECENT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Default)]
struct AggregatorState {
    counts: HashMap<(ErrorCode, String), u64>,
    /// Keys in first-seen order
    key_order: Vec<(ErrorCode, String)>,
    recent: VecDeque<ErrorEvent>,
    total: u64,
}

/// Point-in-time view of the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total_errors: u64,
    /// Keyed `"ERROR_CODE:model_id"`
    pub error_counts: BTreeMap<String, u64>,
    /// Oldest first
    pub recent_errors: Vec<ErrorEvent>,
    /// Aggregate per error code, in first-seen order
    #[serde(skip)]
    pub code_totals: Vec<(ErrorCode, u64)>,
}

#[derive(Debug, Default)]
pub struct ErrorAggregator {
    state: Mutex<AggregatorState>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // Counters stay usable even if a holder panicked mid-update
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the event and append it to the history
    ///
    /// Returns the updated count for the event's `(error_code, model_id)` pair.
    pub fn record(&self, event: ErrorEvent) -> u64 {
        let key = (event.error_code, event.model_id.clone());
        let mut state = self.lock();

        let count = match state.counts.get_mut(&key) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                state.counts.insert(key.clone(), 1);
                state.key_order.push(key);
                1
            }
        };
        state.total += 1;

        if state.recent.len() == RECENT_HISTORY_CAPACITY {
            state.recent.pop_front();
        }
        state.recent.push_back(event);

        count
    }

    pub fn count(&self, error_code: ErrorCode, model_id: &str) -> u64 {
        self.lock()
            .counts
            .get(&(error_code, model_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    /// Up to `limit` most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<ErrorEvent> {
        let state = self.lock();
        let skip = state.recent.len().saturating_sub(limit);
        state.recent.iter().skip(skip).cloned().collect()
    }

    /// Read-only snapshot
    pub fn summarize(&self) -> ErrorSummary {
        let state = self.lock();

        let error_counts = state
            .counts
            .iter()
            .map(|((code, model), count)| (format!("{}:{}", code, model), *count))
            .collect();

        let mut code_totals: Vec<(ErrorCode, u64)> = Vec::new();
        for key in &state.key_order {
            let count = state.counts.get(key).copied().unwrap_or(0);
            match code_totals.iter_mut().find(|(code, _)| *code == key.0) {
                Some((_, total)) => *total += count,
                None => code_totals.push((key.0, count)),
            }
        }

        ErrorSummary {
            total_errors: state.total,
            error_counts,
            recent_errors: state.recent.iter().cloned().collect(),
            code_totals,
        }
    }
}

// ============================================================================
// Health Indicators
// ============================================================================

/// Error-rate banding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorRate {
    Low,
    Medium,
    High,
}

/// Band boundaries on `total_errors`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRateThresholds {
    /// First total counted as medium
    pub medium: u64,
    /// First total counted as high
    pub high: u64,
}

impl Default for ErrorRateThresholds {
    fn default() -> Self {
        Self { medium: 5, high: 20 }
    }
}

impl ErrorRateThresholds {
    pub fn rate(&self, total_errors: u64) -> ErrorRate {
        if total_errors >= self.high {
            ErrorRate::High
        } else if total_errors >= self.medium {
            ErrorRate::Medium
        } else {
            ErrorRate::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIndicators {
    pub error_rate: ErrorRate,
    pub most_frequent_error: Option<ErrorCode>,
    pub recommendations: Vec<String>,
    pub total_error_count: u64,
    /// Distinct `(error_code, model_id)` keys
    pub unique_error_types: usize,
}

fn recommendation_for(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::RateLimit => {
            "Consider client-side rate limiting and exponential backoff for inference requests"
        }
        ErrorCode::AuthError => "Verify the inference API token configuration",
        ErrorCode::NetworkError => {
            "Check network connectivity to the inference API and consider a circuit breaker"
        }
        ErrorCode::QuotaExceeded => "Monitor API usage and consider upgrading the inference plan",
        ErrorCode::ServiceUnavailable => {
            "Models may be loading or overloaded; allow for cold-start delays"
        }
        ErrorCode::HttpError => "Inspect upstream HTTP error responses for malformed requests",
        ErrorCode::UnknownError => "Inspect recent errors for unexpected upstream responses",
    }
}

/// Derive health indicators from a summary
pub fn derive_indicators(
    summary: &ErrorSummary,
    thresholds: &ErrorRateThresholds,
) -> HealthIndicators {
    // Strict `>` keeps the first-seen code on ties
    let mut most_frequent: Option<(ErrorCode, u64)> = None;
    for (code, total) in &summary.code_totals {
        if most_frequent.map_or(true, |(_, best)| *total > best) {
            most_frequent = Some((*code, *total));
        }
    }
    let most_frequent_error = most_frequent.map(|(code, _)| code);

    let mut recommendations = Vec::new();
    if let Some(code) = most_frequent_error {
        recommendations.push(recommendation_for(code).to_string());
    }
    for (code, _) in &summary.code_totals {
        if Some(*code) != most_frequent_error {
            recommendations.push(recommendation_for(*code).to_string());
        }
    }

    let error_rate = thresholds.rate(summary.total_errors);
    if error_rate == ErrorRate::High {
        recommendations.push("High error rate detected - investigate service stability".to_string());
    }
    if recommendations.is_empty() {
        recommendations.push("Service error rates are within normal parameters".to_string());
    }

    HealthIndicators {
        error_rate,
        most_frequent_error,
        recommendations,
        total_error_count: summary.total_errors,
        unique_error_types: summary.error_counts.len(),
    }
}
