//! Change aggregation for one open document
//!
//! Peer-caused content changes arrive on background threads (file watcher,
//! store callbacks) while the consumer drains them on its own schedule.
//! A [`ChangeAggregator`] buffers them in a single [`DocumentChangeSet`]
//! guarded by one mutex, held only for the insert or the swap.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, trace};

use docsync_core::domain::{change_set::DocumentChangeSet, newtypes::DocLocation};

/// Buffers peer change events between drains
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    pending: Mutex<DocumentChangeSet>,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the entry called `name` was removed by a peer
    pub fn record_deleted(&self, name: impl Into<String>) {
        let name = name.into();
        if self.lock().insert_deleted(name.clone()) {
            trace!(%name, "Recorded peer deletion");
        }
    }

    /// Record that the content of the entry called `name` changed
    pub fn record_updated(&self, name: impl Into<String>) {
        let name = name.into();
        if self.lock().insert_updated(name.clone()) {
            trace!(%name, "Recorded peer update");
        }
    }

    /// Record that a peer added the entry at `url`
    pub fn record_added(&self, url: DocLocation) {
        if self.lock().insert_added(url.clone()) {
            trace!(%url, "Recorded peer addition");
        }
    }

    /// Take everything recorded so far, leaving the buffer empty
    pub fn drain(&self) -> DocumentChangeSet {
        let drained = std::mem::take(&mut *self.lock());
        if !drained.is_empty() {
            debug!(changes = drained.len(), "Drained peer changes");
        }
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the set half-updated, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, DocumentChangeSet> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
