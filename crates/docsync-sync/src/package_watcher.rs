//! Filesystem watching inside an open package document
//!
//! A [`PackageWatcher`] wraps the `notify` crate to monitor the entries of
//! one package directory and records every change into the document's
//! [`ChangeAggregator`]. The consumer picks them up on its next drain.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │
//!       ▼
//!  PackageWatcher ──→ map_notify_event ──→ ChangeAggregator ──→ OpenDocument
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use docsync_core::domain::newtypes::DocLocation;

use crate::{aggregator::ChangeAggregator, SyncError};

/// One entry-level change inside a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageChange {
    /// An entry appeared at the given path
    Added(PathBuf),
    /// The content of an existing entry changed
    Updated(PathBuf),
    /// The entry at the given path disappeared
    Deleted(PathBuf),
}

impl PackageChange {
    pub fn path(&self) -> &Path {
        match self {
            PackageChange::Added(p) | PackageChange::Updated(p) | PackageChange::Deleted(p) => p,
        }
    }
}

/// Watches one package directory for peer changes
///
/// Watching stops when the watcher is dropped.
pub struct PackageWatcher {
    _watcher: RecommendedWatcher,
    package: DocLocation,
}

impl PackageWatcher {
    /// Start watching the direct entries of `package`
    ///
    /// # Errors
    /// Returns an error if the OS watcher cannot be created or the package
    /// cannot be watched (missing, permissions, watch limit reached).
    pub fn watch(
        package: &DocLocation,
        aggregator: Arc<ChangeAggregator>,
    ) -> Result<Self, SyncError> {
        let root = package.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&event) {
                        record(&aggregator, &root, &change);
                    }
                }
                Err(err) => {
                    error!(error = %err, "Package watcher error");
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(package.as_path(), RecursiveMode::NonRecursive)?;
        info!(%package, "Watching package for peer changes");

        Ok(Self {
            _watcher: watcher,
            package: package.clone(),
        })
    }

    pub fn package(&self) -> &DocLocation {
        &self.package
    }
}

/// Record `change` if it concerns a visible direct entry of `package`
fn record(aggregator: &ChangeAggregator, package: &DocLocation, change: &PackageChange) {
    let path = change.path();
    if path.parent() != Some(package.as_path()) {
        return;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    // Staging files of an in-flight commit.
    if name.starts_with('.') {
        return;
    }

    match change {
        PackageChange::Added(p) => match DocLocation::new(p.clone()) {
            Ok(url) => aggregator.record_added(url),
            Err(e) => warn!(path = %p.display(), error = %e, "Ignoring unaddressable entry"),
        },
        PackageChange::Updated(_) => aggregator.record_updated(name),
        PackageChange::Deleted(_) => aggregator.record_deleted(name),
    }
}

/// Converts a `notify::Event` into entry-level changes
///
/// - `Create(*)` -> `Added`
/// - `Modify(Data(*))` and `Modify(Metadata(*))` -> `Updated`
/// - `Modify(Name(Both))` with 2 paths -> `Deleted(old)` + `Added(new)`
/// - `Modify(Name(From))` -> `Deleted`, `Modify(Name(To))` -> `Added`
/// - other `Modify(Name(*))` -> `Added` or `Deleted` depending on existence
/// - `Remove(*)` -> `Deleted`
///
/// Access events and events without paths map to nothing.
fn map_notify_event(event: &notify::Event) -> Vec<PackageChange> {
    let paths = &event.paths;
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let changes = match &event.kind {
        EventKind::Create(_) => vec![PackageChange::Added(first.clone())],

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => vec![
            PackageChange::Deleted(paths[0].clone()),
            PackageChange::Added(paths[1].clone()),
        ],

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            vec![PackageChange::Deleted(first.clone())]
        }

        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            vec![PackageChange::Added(first.clone())]
        }

        EventKind::Modify(ModifyKind::Name(_)) => {
            if first.exists() {
                vec![PackageChange::Added(first.clone())]
            } else {
                vec![PackageChange::Deleted(first.clone())]
            }
        }

        EventKind::Modify(_) => vec![PackageChange::Updated(first.clone())],

        EventKind::Remove(_) => vec![PackageChange::Deleted(first.clone())],

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            Vec::new()
        }
    };

    debug!(kind = ?event.kind, count = changes.len(), "Mapped package event");
    changes
}
