//! Remote metadata observer
//!
//! Keeps the authoritative, filtered and sorted list of store items and
//! pushes a full [`Snapshot`] to subscribers on every store signal. The
//! store is never polled: its query calls back on gathering and on update,
//! and each callback recomputes the snapshot from the live index.
//!
//! ## Architecture
//!
//! ```text
//! IRemoteQuery ──signal──→ QuerySignals ──→ ObserverInner::refresh
//!                                                │
//!                    disable_updates / results / enable_updates
//!                                                │
//!                                                ▼
//!                               Subscribers ──→ handlers / channels
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use docsync_core::{
    domain::metadata::{MetadataItem, Snapshot},
    ports::remote_query::{IQueryObserver, IRemoteQuery, QueryConfig, RemoteItem, SortKey},
};

use crate::SyncError;

/// State change pushed to subscribers
#[derive(Debug, Clone)]
pub enum MetadataEvent {
    /// A new authoritative snapshot replaces the previous one
    Changed(Snapshot),
    /// The store could not be reached; the snapshot stays empty
    Unavailable,
}

type Handler = Arc<dyn Fn(&MetadataEvent) + Send + Sync>;

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    handlers: Mutex<BTreeMap<u64, Handler>>,
}

impl Subscribers {
    fn handlers(&self) -> MutexGuard<'_, BTreeMap<u64, Handler>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: &MetadataEvent) {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let handlers: Vec<Handler> = self.handlers().values().cloned().collect();
        for handler in handlers {
            handler(event);
        }
    }
}

/// RAII registration of an event handler
///
/// The handler is unregistered when the subscription is dropped or
/// [`released`](Subscription::release).
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    /// Unregister the handler now
    pub fn release(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers.handlers().remove(&self.id);
            debug!(id = self.id, "Subscription released");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ============================================================================
// MetadataObserver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Unavailable,
    Stopped,
}

struct ObserverInner {
    query: Arc<dyn IRemoteQuery>,
    config: Mutex<Option<QueryConfig>>,
    snapshot: Mutex<Snapshot>,
    stopped: AtomicBool,
    subscribers: Arc<Subscribers>,
    // Serializes recompute-and-publish so snapshots reach subscribers in order.
    publish: Mutex<()>,
}

/// Live observer over a store's metadata query
///
/// Single lifecycle: [`start`](Self::start) once, [`stop`](Self::stop) once.
/// Dropping the observer stops it.
pub struct MetadataObserver {
    inner: Arc<ObserverInner>,
    lifecycle: Mutex<Lifecycle>,
}

impl MetadataObserver {
    pub fn new(query: Arc<dyn IRemoteQuery>) -> Self {
        Self {
            inner: Arc::new(ObserverInner {
                query,
                config: Mutex::new(None),
                snapshot: Mutex::new(Arc::from(Vec::new())),
                stopped: AtomicBool::new(false),
                subscribers: Arc::new(Subscribers::default()),
                publish: Mutex::new(()),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Begin observing the store
    ///
    /// # Errors
    /// - [`SyncError::AlreadyStarted`] on any call after the first
    /// - [`SyncError::StoreUnavailable`] if the store query cannot start. In
    ///   that case subscribers receive [`MetadataEvent::Unavailable`] once and
    ///   the snapshot stays empty for the lifetime of the observer.
    pub fn start(&self, config: QueryConfig) -> Result<(), SyncError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if *lifecycle != Lifecycle::Idle {
            return Err(SyncError::AlreadyStarted);
        }

        info!(
            suffix = %config.name_suffix,
            sort_key = ?config.sort_key,
            "Starting metadata observer"
        );
        *self.inner.config.lock().unwrap_or_else(|e| e.into_inner()) = Some(config.clone());

        let signals: Arc<dyn IQueryObserver> = Arc::new(QuerySignals(Arc::downgrade(&self.inner)));
        match self.inner.query.start(&config, signals) {
            Ok(()) => {
                *lifecycle = Lifecycle::Running;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Store unavailable, metadata list stays empty");
                *lifecycle = Lifecycle::Unavailable;
                drop(lifecycle);
                self.inner.stopped.store(true, Ordering::SeqCst);
                self.inner.subscribers.emit(&MetadataEvent::Unavailable);
                Err(SyncError::StoreUnavailable(e.to_string()))
            }
        }
    }

    /// Stop observing; no events are delivered after this returns
    ///
    /// Must not be called from inside a subscription handler.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        match *lifecycle {
            Lifecycle::Running => {}
            Lifecycle::Idle => {
                *lifecycle = Lifecycle::Stopped;
                self.inner.stopped.store(true, Ordering::SeqCst);
                return;
            }
            Lifecycle::Unavailable | Lifecycle::Stopped => return,
        }
        *lifecycle = Lifecycle::Stopped;

        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.query.stop();
        // Wait out a publish already in flight.
        drop(self.inner.publish.lock().unwrap_or_else(|e| e.into_inner()));
        info!("Metadata observer stopped");
    }

    /// The current authoritative list
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    /// True unless the store was found unavailable at start
    pub fn is_available(&self) -> bool {
        *self.lifecycle.lock().unwrap_or_else(|e| e.into_inner()) != Lifecycle::Unavailable
    }

    /// Register `handler` for every subsequent event
    ///
    /// Handlers run on the store's callback thread and must not block.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MetadataEvent) + Send + Sync + 'static,
    {
        let subscribers = &self.inner.subscribers;
        let id = subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers.handlers().insert(id, Arc::new(handler));
        debug!(id, "Subscription registered");

        Subscription {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    /// Register a latest-wins receiver for every subsequent event
    ///
    /// Each event overwrites the one before it, so a slow receiver skips
    /// intermediate snapshots but always ends up with the newest.
    pub fn subscribe_channel(&self) -> (Subscription, EventReceiver) {
        let (tx, rx) = watch::channel(None);
        let subscription = self.subscribe(move |event| {
            tx.send_replace(Some(event.clone()));
        });
        (subscription, EventReceiver { rx })
    }
}

/// Receiving half of [`MetadataObserver::subscribe_channel`]
pub struct EventReceiver {
    rx: watch::Receiver<Option<MetadataEvent>>,
}

impl EventReceiver {
    /// Wait for an event not yet seen
    ///
    /// Returns `None` once the subscription is dropped and the last event
    /// was taken.
    pub async fn recv(&mut self) -> Option<MetadataEvent> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }

    /// The newest event, if one arrived since the last call
    pub fn try_recv(&mut self) -> Option<MetadataEvent> {
        if self.rx.has_changed().unwrap_or(false) {
            self.rx.borrow_and_update().clone()
        } else {
            None
        }
    }
}

impl Drop for MetadataObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ObserverInner {
    fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn refresh(&self, reason: &'static str) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let _publish = self.publish.lock().unwrap_or_else(|e| e.into_inner());
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }

        let Some(config) = self.config.lock().unwrap_or_else(|e| e.into_inner()).clone() else {
            return;
        };

        let results = {
            let _paused = PausedUpdates::new(self.query.as_ref());
            self.query.results()
        };

        let snapshot = build_snapshot(&config, results);
        debug!(reason, count = snapshot.len(), "Publishing metadata snapshot");

        *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&snapshot);
        self.subscribers.emit(&MetadataEvent::Changed(snapshot));
    }
}

/// Signal sink handed to the store query
///
/// Holds the observer weakly so the store never keeps it alive.
struct QuerySignals(Weak<ObserverInner>);

impl IQueryObserver for QuerySignals {
    fn on_gathering_finished(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.refresh("gathering finished");
        }
    }

    fn on_updated(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.refresh("store updated");
        }
    }
}

/// Keeps the live index frozen for the guard's lifetime
struct PausedUpdates<'a> {
    query: &'a dyn IRemoteQuery,
}

impl<'a> PausedUpdates<'a> {
    fn new(query: &'a dyn IRemoteQuery) -> Self {
        query.disable_updates();
        Self { query }
    }
}

impl Drop for PausedUpdates<'_> {
    fn drop(&mut self) {
        self.query.enable_updates();
    }
}

/// Filter, deduplicate by url and sort raw index items
fn build_snapshot(config: &QueryConfig, results: Vec<RemoteItem>) -> Snapshot {
    let mut seen = HashSet::new();
    let mut items: Vec<(Option<chrono::DateTime<chrono::Utc>>, MetadataItem)> = results
        .into_iter()
        .filter(|item| config.matches(item))
        .filter(|item| seen.insert(item.url.clone()))
        .map(|item| (item.modified_at, MetadataItem::new(item.handle, item.url)))
        .collect();

    match config.sort_key {
        SortKey::Name => items.sort_by(|(_, a), (_, b)| {
            a.name().cmp(b.name()).then_with(|| a.url().cmp(b.url()))
        }),
        SortKey::ModifiedAt => items.sort_by(|(ta, a), (tb, b)| {
            ta.cmp(tb)
                .then_with(|| a.name().cmp(b.name()))
                .then_with(|| a.url().cmp(b.url()))
        }),
    }

    items.into_iter().map(|(_, item)| item).collect()
}
