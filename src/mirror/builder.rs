use std::sync::Arc;
use std::time::Duration;

use super::ConfigMirror;
use super::MirrorStore;
use super::OnChange;
use super::WatchEngine;
use crate::utils::retry::with_retry;
use crate::ChangeEvent;
use crate::RefreshPolicy;
use crate::RegistryClient;
use crate::Result;
use crate::RetryPolicy;
use crate::Settings;
use crate::WatchMode;

pub struct MirrorBuilder {
    client: Arc<dyn RegistryClient>,
    settings: Settings,
    on_change: Option<Box<OnChange>>,
}

impl MirrorBuilder {
    /// Create a new builder with default settings around a registry client.
    pub fn new(client: Arc<dyn RegistryClient>) -> Self {
        Self {
            client,
            settings: Settings::default(),
            on_change: None,
        }
    }

    /// Set the retry policy applied to every remote call (default: 3
    /// attempts, 500ms apart)
    pub fn retry_policy(
        mut self,
        policy: RetryPolicy,
    ) -> Self {
        self.settings.retry = policy;
        self
    }

    /// Select the subscription style (default: polling)
    pub fn watch_mode(
        mut self,
        mode: WatchMode,
    ) -> Self {
        self.settings.watch.mode = mode;
        self
    }

    /// Set the long-poll timeout for one watch call (default: 5s)
    pub fn watch_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.settings.watch.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the per-subscription event queue capacity (default: 64)
    pub fn channel_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.settings.watch.channel_capacity = capacity;
        self
    }

    /// Choose what an all-keys refresh does when one key fails
    /// (default: fail fast)
    pub fn refresh_policy(
        mut self,
        policy: RefreshPolicy,
    ) -> Self {
        self.settings.refresh = policy;
        self
    }

    /// Register the change callback invoked by callback-style
    /// subscriptions.
    pub fn on_change(
        mut self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Completely replaces the default settings.
    ///
    /// # Warning: Configuration Override
    /// This discards everything configured through the individual methods
    /// like [`retry_policy`](MirrorBuilder::retry_policy) or
    /// [`watch_mode`](MirrorBuilder::watch_mode).
    pub fn set_settings(
        mut self,
        settings: Settings,
    ) -> Self {
        self.settings = settings;
        self
    }

    /// Build the mirror with current settings.
    ///
    /// Session establishment runs through the retry wrapper once;
    /// construction fails permanently when the attempt budget is exhausted.
    pub async fn build(self) -> Result<ConfigMirror> {
        with_retry("connect", &self.settings.retry, || self.client.connect()).await?;

        let engine = WatchEngine::new(self.client.clone(), self.settings.watch.clone(), self.on_change);

        Ok(ConfigMirror::new(
            self.client,
            MirrorStore::new(),
            engine,
            self.settings.retry,
            self.settings.refresh,
        ))
    }
}
