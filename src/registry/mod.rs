//! Client capability for the remote configuration registry.
//!
//! The mirror never speaks a wire protocol itself; everything it needs from
//! the remote store goes through [`RegistryClient`]:
//! - [`RegistryClient::read_subtree`] - recursive, sorted subtree listing
//! - [`RegistryClient::watch_once`] - one long-poll watch call
//! - [`RegistryClient::register_watch`] - push-style registration
//! - [`RegistryClient::watch_prefix`] - streaming prefix subscription
//!
//! Implementations own endpoint, credential and timeout handling; see
//! [`crate::RegistrySettings`] for the values they are built from.

mod event;
pub use event::*;

#[cfg(test)]
mod event_test;

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Identifier of a push-style registration inside the registry client.
pub type RemoteWatchId = u64;

/// Options for a subtree read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub recursive: bool,
    pub sorted: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            sorted: true,
        }
    }
}

/// One flat listing entry: full key path plus its leaf value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Recursive node form of a subtree read. Directory nodes carry no value and
/// list their children with full key paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryNode {
    pub key: String,
    pub value: Option<String>,
    pub children: Vec<RegistryNode>,
}

/// What a subtree read yields: either a recursive node or a flat list of
/// `(key, value)` pairs sorted ascending by key. Larger registries favor the
/// flat form.
#[derive(Debug, Clone)]
pub enum ReadResponse {
    Node(RegistryNode),
    Flat(Vec<KeyValue>),
}

/// A live streaming prefix subscription: raw events plus the token that
/// stops the producer.
pub struct PrefixWatch {
    pub events: mpsc::Receiver<RegistryEvent>,
    pub cancel: CancellationToken,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Establish or verify the registry session.
    async fn connect(&self) -> Result<()>;

    /// Read the subtree rooted at `key`.
    ///
    /// # Errors
    /// - [`crate::Error::NotFound`] if the key does not exist
    async fn read_subtree(
        &self,
        key: &str,
        options: ReadOptions,
    ) -> Result<ReadResponse>;

    /// Long-poll for the next change under `key`.
    ///
    /// # Errors
    /// - [`crate::Error::WatchTimeout`] if no change arrived within `timeout`
    async fn watch_once(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<RegistryEvent>;

    /// Register a push-style subscription. The client delivers raw events
    /// into `sink` on its own task until [`RegistryClient::cancel_watch`] or
    /// the session is permanently lost (the client then drops `sink`).
    async fn register_watch(
        &self,
        key: &str,
        sink: mpsc::Sender<RegistryEvent>,
    ) -> Result<RemoteWatchId>;

    /// Deregister a push-style subscription.
    async fn cancel_watch(
        &self,
        id: RemoteWatchId,
    ) -> Result<()>;

    /// Open a streaming subscription for every change under `prefix`.
    async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<PrefixWatch>;

    /// Remove every key under `key`. Used by test/setup collaborators; the
    /// mirror itself never deletes remote state.
    async fn delete_subtree(
        &self,
        key: &str,
    ) -> Result<()>;
}
