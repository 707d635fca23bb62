//! The configuration mirror façade.
//!
//! Composes the crate's pieces behind one entry point:
//! - [`ConfigMirror`] - read-through tracking, explicit refresh, live watch
//! - [`MirrorBuilder`] - configurable construction
//! - [`MirrorStore`] - the nested in-memory copy
//! - [`Subscription`] / [`PrefixStream`] - change delivery
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//!
//! use confmirror::ConfigMirror;
//! use confmirror::RegistryClient;
//!
//! # async fn demo(client: Arc<dyn RegistryClient>) -> confmirror::Result<()> {
//! let mirror = ConfigMirror::builder(client)
//!     .on_change(|event| println!("{} {}", event.action, event.key))
//!     .build()
//!     .await?;
//!
//! // Fetch and track a subtree
//! mirror.add_key("app").await?;
//! let subtree = mirror.get("app");
//!
//! // Follow remote changes
//! let watch_id = mirror.watch("app").await?;
//! // ...
//! mirror.cancel(watch_id).await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod store;
mod watch;

pub use builder::*;
pub use store::*;
pub use watch::*;

#[cfg(test)]
mod watch_test;

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::tree;
use crate::tree::normalize_key;
use crate::utils::retry::with_retry;
use crate::ChangeEvent;
use crate::ConfigValue;
use crate::ReadOptions;
use crate::ReadResponse;
use crate::RefreshPolicy;
use crate::RegistryClient;
use crate::Result;
use crate::RetryPolicy;

/// Read-only mirror of one or more subtrees of a remote configuration
/// registry.
///
/// `add_key` fetches a subtree and tracks it; `refresh` re-fetches tracked
/// subtrees, replacing them wholesale; `watch`/`subscribe` deliver change
/// notifications without touching the mirror (a callback that wants the
/// mirror updated calls `refresh` itself).
///
/// Created through the [`builder()`](ConfigMirror::builder) method.
pub struct ConfigMirror {
    client: Arc<dyn RegistryClient>,
    store: MirrorStore,
    engine: WatchEngine,
    retry: RetryPolicy,
    refresh_policy: RefreshPolicy,
}

impl ConfigMirror {
    /// Create a configured mirror builder around a registry client.
    pub fn builder(client: Arc<dyn RegistryClient>) -> MirrorBuilder {
        MirrorBuilder::new(client)
    }

    pub(crate) fn new(
        client: Arc<dyn RegistryClient>,
        store: MirrorStore,
        engine: WatchEngine,
        retry: RetryPolicy,
        refresh_policy: RefreshPolicy,
    ) -> Self {
        Self {
            client,
            store,
            engine,
            retry,
            refresh_policy,
        }
    }

    /// Fetch the subtree rooted at `key` and track it. A second successful
    /// call for the same key replaces its subtree in full.
    ///
    /// The remote read goes through the retry wrapper; the key becomes
    /// tracked only after a successful fetch.
    ///
    /// # Errors
    /// - [`crate::Error::NotFound`] / [`crate::Error::EmptyResult`] if the
    ///   key has nothing under it
    /// - any registry failure that survived the retry budget
    pub async fn add_key(
        &self,
        key: &str,
    ) -> Result<()> {
        let key = normalize_key(key);

        let response = with_retry("read_subtree", &self.retry, || {
            self.client.read_subtree(key, ReadOptions::default())
        })
        .await?;

        let subtree = match response {
            ReadResponse::Flat(pairs) => tree::from_flat(key, &pairs)?,
            ReadResponse::Node(node) => tree::from_node(key, &node),
        };

        self.store.replace(key, subtree);
        debug!(key, "subtree mirrored");
        Ok(())
    }

    /// Re-fetch one tracked key, or every tracked key if `None`. A named
    /// key that was never tracked is simply added (refresh and add
    /// converge).
    ///
    /// For an all-keys refresh the failure policy chosen at construction
    /// applies: fail-fast aborts on the first failing key, best-effort logs
    /// and continues.
    pub async fn refresh(
        &self,
        key: Option<&str>,
    ) -> Result<()> {
        if let Some(key) = key {
            return self.add_key(key).await;
        }

        for key in self.store.tracked_keys() {
            match self.add_key(&key).await {
                Ok(()) => {}
                Err(error) if self.refresh_policy == RefreshPolicy::BestEffort => {
                    warn!(%key, %error, "refresh failed; continuing with remaining keys");
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// The mirrored subtree under `key`, or `None` for a key never tracked.
    pub fn get(
        &self,
        key: &str,
    ) -> Option<ConfigValue> {
        self.store.get(key)
    }

    /// Resolve a dotted path, first segment being a tracked key.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<ConfigValue> {
        self.store.lookup(path)
    }

    /// Whether `key` is a tracked top-level key.
    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.store.contains_key(key)
    }

    pub fn tracked_keys(&self) -> Vec<String> {
        self.store.tracked_keys()
    }

    /// Start a callback-style subscription on changes under `key`. Events
    /// go to the `on_change` callback; without one they are only logged.
    /// Returns without blocking on the first event.
    pub async fn watch(
        &self,
        key: &str,
    ) -> Result<WatchId> {
        self.engine.watch(normalize_key(key)).await
    }

    /// Start a channel-style subscription on changes under `key`.
    pub async fn subscribe(
        &self,
        key: &str,
    ) -> Result<Subscription> {
        self.engine.subscribe(normalize_key(key)).await
    }

    /// Open a consumer-driven stream of changes under `prefix`.
    pub async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<PrefixStream> {
        self.engine.watch_prefix(normalize_key(prefix)).await
    }

    /// Stop one subscription. Cooperative, idempotent.
    pub async fn cancel(
        &self,
        id: WatchId,
    ) -> Result<()> {
        self.engine.cancel(id).await
    }

    /// Cooperative global stop of every subscription. Terminal for this
    /// mirror's watch engine.
    pub async fn stop_watchers(&self) {
        self.engine.stop_all().await;
    }

    /// Replace the change callback. Live subscriptions pick it up on their
    /// next event.
    pub fn set_on_change(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) {
        self.engine.set_on_change(Some(Box::new(callback)));
    }

    /// The underlying registry client, for collaborators that seed or
    /// clean up remote state around the mirror.
    pub fn client(&self) -> Arc<dyn RegistryClient> {
        self.client.clone()
    }

    #[cfg(test)]
    pub(crate) fn active_subscriptions(&self) -> usize {
        self.engine.active_subscriptions()
    }
}
