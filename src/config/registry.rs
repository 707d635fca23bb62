use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use crate::constants::DEFAULT_REGISTRY_ENDPOINT;
use crate::constants::DEFAULT_REQUEST_TIMEOUT_MS;

/// Session parameters for the remote registry.
///
/// The concrete client implementation owns the wire protocol; these values
/// are handed to it verbatim.
#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Session establishment timeout (unit: milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Single remote call timeout (unit: milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl RegistrySettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            username: None,
            password: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_REGISTRY_ENDPOINT.to_string()
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
