// -
// Retry defaults

/// Total attempts for a retried registry operation
pub(crate) const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Fixed pause between attempts (unit: milliseconds)
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 500;

// -
// Watch defaults

/// Long-poll timeout for one watch call (unit: milliseconds)
pub(crate) const DEFAULT_WATCH_TIMEOUT_MS: u64 = 5_000;

/// Capacity of the per-subscription event channel
pub(crate) const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

// -
// Registry defaults

pub(crate) const DEFAULT_REGISTRY_ENDPOINT: &str = "http://127.0.0.1:4001";

pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;

pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;
