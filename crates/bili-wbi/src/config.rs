use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{client::DEFAULT_UA, retry::RetryPolicy};

/// Tunables for the signing client. Protocol constants are not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WbiConfig {
    /// Attempts made by the retried search call.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` (0-indexed) sleeps `base * (n + 1)`.
    pub retry_base_delay_ms: u64,
    /// Overall timeout of a single HTTP request.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for WbiConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 1000,
            timeout_secs: 30,
            user_agent: DEFAULT_UA.to_owned(),
        }
    }
}

impl WbiConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
