//! Retrying remote calls.
//!
//! Every network operation the migrator performs goes through [`with_retry`],
//! which repeats transient failures (timeouts, dropped connections, 5xx and
//! rate-limit responses) with bounded exponential backoff and gives up
//! immediately on validation errors.

mod policy;

pub use policy::RetryPolicy;

use crate::remote::ApiError;
use policy::MAX_RETRY_AFTER_SECS;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempt budget is spent.
///
/// # Arguments
///
/// * `policy` - Attempt budget and backoff settings
/// * `label` - Short description of the call, used in log output
/// * `operation` - Produces a fresh future for each attempt
///
/// # Errors
///
/// Returns the last [`ApiError`] observed.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = retry_delay(policy, attempt, &e);
                warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                debug!(operation = label, attempt, error = %e, "Giving up");
                return Err(e);
            }
        }
    }
}

/// Picks the wait before the next attempt, preferring the remote's hint.
fn retry_delay(policy: &RetryPolicy, attempt: u32, error: &ApiError) -> Duration {
    match error {
        ApiError::RateLimited {
            retry_after_secs: Some(secs),
        } => Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)),
        _ => policy.backoff(attempt),
    }
}
