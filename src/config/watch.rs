use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;
use crate::constants::DEFAULT_WATCH_TIMEOUT_MS;

/// Subscription style used by `watch`/`subscribe`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    /// A background task long-polls the registry and reissues after every
    /// event, timeout or transient failure.
    #[default]
    Poll,

    /// The registry client delivers events on its own task; the engine only
    /// registers and forwards.
    Push,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchSettings {
    #[serde(default)]
    pub mode: WatchMode,

    /// Long-poll timeout for one watch call (unit: milliseconds)
    #[serde(default = "default_watch_timeout_ms")]
    pub timeout_ms: u64,

    /// Capacity of a subscription's event channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl WatchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            mode: WatchMode::default(),
            timeout_ms: default_watch_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_watch_timeout_ms() -> u64 {
    DEFAULT_WATCH_TIMEOUT_MS
}
fn default_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}
