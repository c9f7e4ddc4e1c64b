//! docsync Sync - Keeping local state in step with a replicated store
//!
//! Provides:
//! - A live, filtered and sorted metadata snapshot pushed to subscribers
//! - Buffering of peer content changes for an open document
//! - Identity-keyed list reconciliation for presentation
//! - A local-directory reference adapter for every core port
//!
//! ## Modules
//!
//! - [`observer`] - Remote metadata observer and subscriptions
//! - [`aggregator`] - Change aggregator for one open document
//! - [`reconciler`] - Insert/delete/reload diff between snapshots
//! - [`document`] - Open package document with pending edits
//! - [`local_store`] - Local directory adapter (query, versions, coordination, content)
//! - [`package_watcher`] - Filesystem events inside an open package

pub mod aggregator;
pub mod document;
pub mod local_store;
pub mod observer;
pub mod package_watcher;
pub mod reconciler;

use thiserror::Error;

use docsync_conflict::ConflictError;
use docsync_core::{domain::errors::DomainError, usecases::CoordinationError};

pub use aggregator::ChangeAggregator;
pub use document::OpenDocument;
pub use local_store::LocalDirectoryStore;
pub use observer::{EventReceiver, MetadataEvent, MetadataObserver, Subscription};
pub use package_watcher::PackageWatcher;
pub use reconciler::{reconcile, Keyed, ListChanges};

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store could not be reached; the observer stays empty
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The observer was already started once
    #[error("Observer already started")]
    AlreadyStarted,

    /// Filesystem watch could not be established
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// A coordinated write failed
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Conflict resolution failed
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// A domain-level error propagated from docsync-core
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),
}
