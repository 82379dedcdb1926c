// Retry-with-backoff for unreliable upstream calls.
//
// Linear backoff: after the failed attempt `n` (0-indexed) the loop sleeps
// `base_delay * (n + 1)`. Intermediate failures are logged; only the last
// one is reported, wrapped in `WbiError::RetryExhausted`.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::WbiError;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_retries: u32,
    /// Delay unit of the linear backoff.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

/// Runs `operation` until it succeeds or `policy.max_retries` attempts fail.
///
/// The closure receives the current attempt number (0-indexed). With a
/// budget of zero no attempt is made and the call fails immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, WbiError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut last_error: Option<String> = None;

    for attempt in 0..policy.max_retries {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let is_last = attempt + 1 >= policy.max_retries;
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_ms = if is_last { 0 } else { delay.as_millis() as u64 },
                    error = %err,
                    "Attempt failed"
                );
                last_error = Some(err.to_string());
                if !is_last {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(WbiError::RetryExhausted {
        attempts: policy.max_retries,
        last_error: last_error.unwrap_or_else(|| "unknown error".to_string()),
    })
}
