use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::ChangeEvent;
use crate::Error;
use crate::RegistryClient;
use crate::RegistryEvent;
use crate::RemoteWatchId;
use crate::Result;
use crate::WatchMode;
use crate::WatchSettings;

/// Opaque handle of a live subscription, released via `cancel`.
pub type WatchId = u64;

/// Change callback contract: invoked once per normalized event, possibly
/// from a background task. Panics are isolated per event.
pub type OnChange = dyn Fn(&ChangeEvent) + Send + Sync;

/// A channel-style subscription: the engine pushes normalized events onto a
/// bounded queue and the consumer drains it on a thread of its choosing.
pub struct Subscription {
    id: WatchId,
    events: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn id(&self) -> WatchId {
        self.id
    }

    /// Next event, or `None` once the subscription ended.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn into_stream(self) -> ReceiverStream<ChangeEvent> {
        ReceiverStream::new(self.events)
    }
}

/// A lazy, possibly-infinite sequence of changes under one prefix. The
/// consumer drives it (`next`) and stops it from inside its own loop
/// (`cancel`).
pub struct PrefixStream {
    prefix: String,
    events: mpsc::Receiver<RegistryEvent>,
    token: CancellationToken,
}

impl PrefixStream {
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        while let Some(raw) = self.events.recv().await {
            let action = raw.action.clone();
            match raw.normalize() {
                Some(event) => return Some(event),
                None => warn!(prefix = %self.prefix, %action, "unrecognized change action; event dropped"),
            }
        }
        None
    }

    /// Consumer-driven cancellation. The stream drains whatever the
    /// producer already queued, then ends.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl futures::Stream for PrefixStream {
    type Item = ChangeEvent;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.events.poll_recv(cx) {
                Poll::Ready(Some(raw)) => match raw.normalize() {
                    Some(event) => return Poll::Ready(Some(event)),
                    None => continue,
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Where a subscription's events go.
enum EventSink {
    /// The mirror-wide callback slot. Reading the slot per event lets
    /// `set_on_change` take effect on live subscriptions.
    Callback(Arc<ArcSwapOption<Box<OnChange>>>),
    Channel(mpsc::Sender<ChangeEvent>),
}

impl EventSink {
    /// Deliver one event. `false` means the consumer is gone and the
    /// subscription should end.
    async fn deliver(
        &self,
        event: ChangeEvent,
    ) -> bool {
        match self {
            EventSink::Callback(slot) => {
                if let Some(callback) = slot.load_full() {
                    let outcome = catch_unwind(AssertUnwindSafe(|| callback(&event)));
                    if outcome.is_err() {
                        let failure = Error::Callback(format!("panic while handling '{}'", event.key));
                        error!(key = %event.key, %failure, "event dropped");
                    }
                }
                true
            }
            EventSink::Channel(tx) => tx.send(event).await.is_ok(),
        }
    }
}

struct WatcherEntry {
    key: String,
    token: CancellationToken,
    remote: Option<RemoteWatchId>,
}

/// Subscription lifecycle management: spawns the per-subscription tasks,
/// hands out ids, and stops everything cooperatively.
pub(crate) struct WatchEngine {
    client: Arc<dyn RegistryClient>,
    settings: WatchSettings,
    on_change: Arc<ArcSwapOption<Box<OnChange>>>,
    root: CancellationToken,
    watchers: DashMap<WatchId, WatcherEntry>,
    next_id: AtomicU64,
}

impl WatchEngine {
    pub(crate) fn new(
        client: Arc<dyn RegistryClient>,
        settings: WatchSettings,
        on_change: Option<Box<OnChange>>,
    ) -> Self {
        Self {
            client,
            settings,
            on_change: Arc::new(ArcSwapOption::from(on_change.map(Arc::new))),
            root: CancellationToken::new(),
            watchers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn set_on_change(
        &self,
        callback: Option<Box<OnChange>>,
    ) {
        self.on_change.store(callback.map(Arc::new));
    }

    /// Start a callback-style subscription on `key`.
    pub(crate) async fn watch(
        &self,
        key: &str,
    ) -> Result<WatchId> {
        let sink = EventSink::Callback(self.on_change.clone());
        self.spawn_subscription(key, sink).await
    }

    /// Start a channel-style subscription on `key`.
    pub(crate) async fn subscribe(
        &self,
        key: &str,
    ) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(self.settings.channel_capacity);
        let id = self.spawn_subscription(key, EventSink::Channel(tx)).await?;
        Ok(Subscription { id, events: rx })
    }

    /// Open a consumer-driven stream of every change under `prefix`.
    pub(crate) async fn watch_prefix(
        &self,
        prefix: &str,
    ) -> Result<PrefixStream> {
        let watch = self.client.watch_prefix(prefix).await?;
        Ok(PrefixStream {
            prefix: prefix.to_string(),
            events: watch.events,
            token: watch.cancel,
        })
    }

    async fn spawn_subscription(
        &self,
        key: &str,
        sink: EventSink,
    ) -> Result<WatchId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.root.child_token();
        let key = key.to_string();

        let remote = match self.settings.mode {
            WatchMode::Poll => {
                let client = self.client.clone();
                let timeout = self.settings.timeout();
                tokio::spawn(poll_loop(client, key.clone(), timeout, token.clone(), sink));
                None
            }
            WatchMode::Push => {
                let (raw_tx, raw_rx) = mpsc::channel(self.settings.channel_capacity);
                let remote = self.client.register_watch(&key, raw_tx).await?;
                tokio::spawn(forward_loop(key.clone(), raw_rx, token.clone(), sink));
                Some(remote)
            }
        };

        self.watchers.insert(id, WatcherEntry { key, token, remote });
        Ok(id)
    }

    /// Stop one subscription. Cooperative: a polling task may finish one
    /// more long-poll cycle before it observes the token. Canceling an
    /// unknown id is a no-op.
    pub(crate) async fn cancel(
        &self,
        id: WatchId,
    ) -> Result<()> {
        let Some((_, entry)) = self.watchers.remove(&id) else {
            warn!(id, "cancel for an unknown subscription; ignored");
            return Ok(());
        };

        entry.token.cancel();
        debug!(id, key = %entry.key, "subscription canceled");

        if let Some(remote) = entry.remote {
            if let Err(error) = self.client.cancel_watch(remote).await {
                warn!(id, %error, "remote deregistration failed");
            }
        }
        Ok(())
    }

    /// Cooperative global stop. Terminal: the engine accepts no new
    /// subscriptions afterwards (they are born canceled).
    pub(crate) async fn stop_all(&self) {
        self.root.cancel();

        let ids: Vec<WatchId> = self.watchers.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, entry)) = self.watchers.remove(&id) {
                if let Some(remote) = entry.remote {
                    if let Err(error) = self.client.cancel_watch(remote).await {
                        warn!(id, %error, "remote deregistration failed");
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn active_subscriptions(&self) -> usize {
        self.watchers.len()
    }
}

/// Normalize one raw event and hand it to the sink. `false` ends the loop.
async fn dispatch(
    key: &str,
    raw: RegistryEvent,
    sink: &EventSink,
) -> bool {
    let action = raw.action.clone();
    match raw.normalize() {
        Some(event) => sink.deliver(event).await,
        None => {
            warn!(key, %action, "unrecognized change action; event dropped");
            true
        }
    }
}

/// Polling-style subscription body: long-poll, deliver, reissue. A timeout
/// or an isolated transient failure never ends the loop; only the token or
/// a gone consumer does.
async fn poll_loop(
    client: Arc<dyn RegistryClient>,
    key: String,
    timeout: Duration,
    token: CancellationToken,
    sink: EventSink,
) {
    debug!(%key, "watch loop started");
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            polled = client.watch_once(&key, timeout) => match polled {
                Ok(raw) => {
                    if !dispatch(&key, raw, &sink).await {
                        break;
                    }
                }
                Err(Error::WatchTimeout) => continue,
                Err(error) => {
                    debug!(%key, %error, "watch call failed; reissuing");
                    continue;
                }
            }
        }
    }
    debug!(%key, "watch loop stopped");
}

/// Push-style subscription body: the registry client produces raw events on
/// its own task; this loop only normalizes and forwards. The client
/// dropping its end means the session is permanently gone.
async fn forward_loop(
    key: String,
    mut raw_events: mpsc::Receiver<RegistryEvent>,
    token: CancellationToken,
    sink: EventSink,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = raw_events.recv() => match received {
                Some(raw) => {
                    if !dispatch(&key, raw, &sink).await {
                        break;
                    }
                }
                None => {
                    warn!(%key, "registry closed the push subscription");
                    break;
                }
            }
        }
    }
    debug!(%key, "forward loop stopped");
}
