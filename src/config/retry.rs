use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::constants::DEFAULT_RETRY_DELAY_MS;

/// Bounded-attempt, fixed-delay retry policy.
///
/// No jitter and no backoff growth: the delay between attempts is constant.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts before the last failure is propagated
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    /// Pause between attempts (unit: milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}
fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
