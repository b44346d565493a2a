//! Transient Failure Retry
//!
//! Exponential backoff around an inference call. Only RATE_LIMIT (429) and
//! SERVICE_UNAVAILABLE (503) are re-invoked; every other failure returns
//! immediately.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::RetryPolicy;
use crate::services::inference_client::InferenceFailure;

/// Retry an inference operation on transient failures.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If transient failure and attempts remain: log WARN, back off, retry
/// 4. Otherwise return the last failure
///
/// **Backoff Strategy:**
/// - Starts at `policy.initial_backoff`, doubles each attempt, capped at
///   `policy.max_backoff`
/// - A loading model's `estimated_time` replaces the computed delay, capped
///   at `policy.cold_start_allowance`
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "text generation")
/// * `policy` - Attempt cap and backoff schedule
/// * `operation` - Async closure performing one inference call
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, InferenceFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InferenceFailure>>,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying inference call");
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Inference call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }

                if attempt >= max_attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Transient inference failure: attempts exhausted"
                    );
                    return Err(err);
                }

                let delay = next_delay(&err, backoff, policy);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient inference failure, will retry after backoff"
                );

                tokio::time::sleep(delay).await;

                backoff = (backoff * 2).min(policy.max_backoff);
            }
        }
    }
}

fn next_delay(err: &InferenceFailure, backoff: Duration, policy: &RetryPolicy) -> Duration {
    match err.retry_hint() {
        Some(hint) => hint.min(policy.cold_start_allowance),
        None => backoff.min(policy.max_backoff),
    }
}
