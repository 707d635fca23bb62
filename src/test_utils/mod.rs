//! Shared components between unit tests: an in-process registry double with
//! seeding helpers and fault injection, plus one-time logger setup.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::tree::normalize_key;
use crate::Error;
use crate::KeyValue;
use crate::PrefixWatch;
use crate::ReadOptions;
use crate::ReadResponse;
use crate::RegistryClient;
use crate::RegistryEvent;
use crate::RegistryNode;
use crate::RemoteWatchId;
use crate::Result;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt::try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// An in-process registry standing in for the remote store: a flat sorted
/// key space, live change broadcast, and fault injection for the next N
/// connects/reads/watch calls.
pub struct InMemoryRegistry {
    data: Mutex<BTreeMap<String, String>>,
    changes: broadcast::Sender<RegistryEvent>,
    fail_connects: AtomicUsize,
    fail_reads: AtomicUsize,
    fail_watch_calls: AtomicUsize,
    serve_nodes: AtomicBool,
    registrations: DashMap<RemoteWatchId, CancellationToken>,
    next_registration: AtomicU64,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            data: Mutex::new(BTreeMap::new()),
            changes,
            fail_connects: AtomicUsize::new(0),
            fail_reads: AtomicUsize::new(0),
            fail_watch_calls: AtomicUsize::new(0),
            serve_nodes: AtomicBool::new(false),
            registrations: DashMap::new(),
            next_registration: AtomicU64::new(0),
        }
    }

    /// Store one leaf and broadcast the change.
    pub fn put(
        &self,
        key: &str,
        value: &str,
    ) {
        let key = normalize_key(key).to_string();
        self.data.lock().insert(key.clone(), value.to_string());
        let _ = self
            .changes
            .send(RegistryEvent::new(format!("/{key}"), "set", Some(value.to_string())));
    }

    /// Seed a bunch of leaves under `key`, wiping whatever was there first.
    pub fn set_key(
        &self,
        key: &str,
        entries: &[(&str, &str)],
    ) {
        self.delete_prefix(key);
        for (sub, value) in entries {
            self.put(&format!("{}/{}", normalize_key(key), sub), value);
        }
    }

    /// Remove `key` and everything under it, broadcasting one delete per
    /// removed leaf. Missing keys are ignored.
    pub fn delete_prefix(
        &self,
        key: &str,
    ) {
        let key = normalize_key(key);
        let removed: Vec<String> = {
            let mut data = self.data.lock();
            let doomed: Vec<String> = data
                .keys()
                .filter(|k| Self::covers(key, k))
                .cloned()
                .collect();
            for k in &doomed {
                data.remove(k);
            }
            doomed
        };
        for k in removed {
            let _ = self.changes.send(RegistryEvent::new(format!("/{k}"), "delete", None));
        }
    }

    /// Broadcast an arbitrary raw event without touching stored data.
    pub fn emit_raw(
        &self,
        key: &str,
        action: &str,
        value: Option<&str>,
    ) {
        let _ = self.changes.send(RegistryEvent::new(
            format!("/{}", normalize_key(key)),
            action,
            value.map(str::to_string),
        ));
    }

    pub fn fail_next_connects(
        &self,
        n: usize,
    ) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_reads(
        &self,
        n: usize,
    ) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_watch_calls(
        &self,
        n: usize,
    ) {
        self.fail_watch_calls.store(n, Ordering::SeqCst);
    }

    /// Answer reads with the recursive node form instead of the flat list.
    pub fn serve_node_responses(
        &self,
        enabled: bool,
    ) {
        self.serve_nodes.store(enabled, Ordering::SeqCst);
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    fn covers(
        prefix: &str,
        key: &str,
    ) -> bool {
        let key = normalize_key(key);
        key == prefix || key.starts_with(&format!("{prefix}/"))
    }

    fn take_fault(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn build_node(
        key: &str,
        data: &BTreeMap<String, String>,
    ) -> RegistryNode {
        if let Some(value) = data.get(key) {
            return RegistryNode {
                key: format!("/{key}"),
                value: Some(value.clone()),
                children: vec![],
            };
        }

        let prefix = format!("{key}/");
        let mut child_keys = BTreeSet::new();
        for k in data.keys().filter(|k| k.starts_with(&prefix)) {
            let segment = k[prefix.len()..].split('/').next().unwrap_or_default();
            child_keys.insert(format!("{key}/{segment}"));
        }

        RegistryNode {
            key: format!("/{key}"),
            value: None,
            children: child_keys
                .iter()
                .map(|child| Self::build_node(child, data))
                .collect(),
        }
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn connect(&self) -> Result<()> {
        if Self::take_fault(&self.fail_connects) {
            return Err(Error::Connection("injected connect failure".to_string()));
        }
        Ok(())
    }

    async fn read_subtree(
        &self,
        key: &str,
        _options: ReadOptions,
    ) -> Result<ReadResponse> {
        if Self::take_fault(&self.fail_reads) {
            return Err(Error::Registry("injected read failure".to_string()));
        }

        let key = normalize_key(key);
        let data = self.data.lock();
        let pairs: Vec<KeyValue> = data
            .iter()
            .filter(|(k, _)| Self::covers(key, k))
            .map(|(k, v)| KeyValue::new(format!("/{k}"), v.clone()))
            .collect();

        if pairs.is_empty() {
            return Err(Error::NotFound(key.to_string()));
        }

        if self.serve_nodes.load(Ordering::SeqCst) {
            return Ok(ReadResponse::Node(Self::build_node(key, &data)));
        }
        Ok(ReadResponse::Flat(pairs))
    }

    async fn watch_once(
        &self,
        key: &str,
        timeout: Duration,
    ) -> Result<RegistryEvent> {
        if Self::take_fault(&self.fail_watch_calls) {
            return Err(Error::Registry("injected watch failure".to_string()));
        }

        let key = normalize_key(key).to_string();
        let mut receiver = self.changes.subscribe();

        let wait = async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if Self::covers(&key, &event.key) => return event,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => futures::future::pending::<()>().await,
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(event) => Ok(event),
            Err(_) => Err(Error::WatchTimeout),
        }
    }

    async fn register_watch(
        &self,
        key: &str,
        sink: mpsc::Sender<RegistryEvent>,
    ) -> Result<RemoteWatchId> {
        let id = self.next_registration.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        self.registrations.insert(id, token.clone());

        let key = normalize_key(key).to_string();
        let mut receiver = self.changes.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) if Self::covers(&key, &event.key) => {
                            if sink.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(id)
    }

    async fn cancel_watch(
        &self,
        id: RemoteWatchId,
    ) -> Result<()> {
        if let Some((_, token)) = self.registrations.remove(&id) {
            token.cancel();
        }
        Ok(())
    }

    async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<PrefixWatch> {
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let prefix = normalize_key(prefix).to_string();
        let mut receiver = self.changes.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) if Self::covers(&prefix, &event.key) => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(PrefixWatch { events: rx, cancel })
    }

    async fn delete_subtree(
        &self,
        key: &str,
    ) -> Result<()> {
        self.delete_prefix(key);
        Ok(())
    }
}
