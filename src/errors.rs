//! Error hierarchy for the configuration mirror.
//!
//! One taxonomy covers the whole crate: registry access, tree
//! reconstruction, watch delivery and local file parsing.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cannot establish or re-establish a registry session. Fatal once the
    /// construction-time retry budget is exhausted.
    #[error("Registry connection failed: {0}")]
    Connection(String),

    /// The queried key or prefix does not exist in the registry.
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A recursive query matched zero entries where at least one was
    /// structurally expected. Distinguishes a missing key from a key that
    /// exists but is empty.
    #[error("Query under '{0}' returned no entries")]
    EmptyResult(String),

    /// A long-poll watch call expired without observing a change. Expected
    /// and recoverable; the polling loop swallows it.
    #[error("Watch timed out without a change")]
    WatchTimeout,

    /// A user-supplied change callback failed. Isolated per event, never
    /// propagated into the watch loop.
    #[error("Change callback failed: {0}")]
    Callback(String),

    /// Any other failure reported by the remote registry.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Settings loading/deserialization failures.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A local config file that no known parser accepts.
    #[error("Bad config file: {0}")]
    BadConfigFile(String),
}

impl Error {
    /// `EmptyResult` is equivalent to `NotFound` for caller purposes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::EmptyResult(_))
    }
}
