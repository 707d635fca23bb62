//! Configuration for the mirror itself.
//!
//! Provides layered settings loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority)

mod registry;
mod retry;
mod watch;
pub use registry::*;
pub use retry::*;
pub use watch::*;

#[cfg(test)]
mod config_test;

//---
use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Remote registry endpoint and session parameters
    #[serde(default)]
    pub registry: RegistrySettings,

    /// Retry policy applied to every remote call
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Subscription style and delivery parameters
    #[serde(default)]
    pub watch: WatchSettings,

    /// Failure policy for an all-keys refresh
    #[serde(default)]
    pub refresh: RefreshPolicy,
}

/// What happens when one key fails during `refresh(None)`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// The first failing key aborts the remaining keys.
    #[default]
    FailFast,

    /// Failing keys are logged and skipped; the call succeeds.
    BestEffort,
}

impl Settings {
    /// Load configuration, merging an optional file with `CONFMIRROR__`
    /// environment variables.
    ///
    /// # Arguments
    /// * `path` - Optional path to a config file (format by extension)
    ///
    /// # Returns
    /// Merged configuration with proper priority ordering
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (highest priority)
        builder = builder.add_source(
            Environment::with_prefix("CONFMIRROR")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        builder.build()?.try_deserialize().map_err(Into::into)
    }
}
