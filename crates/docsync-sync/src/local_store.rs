//! Local directory store adapter (secondary/driven adapter)
//!
//! Implements every core port over a plain directory, so the sync layer can
//! run end to end against a folder a replication client keeps in sync:
//! - [`IRemoteQuery`]: a live index of the search scopes fed by `notify`
//! - [`IVersionStore`]: conflict versions kept under `.docsync/versions`
//! - [`IFileCoordinator`]: a per-location lock table
//! - [`IDocumentContent`]: package directories as lists of entries
//!
//! ## Layout
//!
//! ```text
//! <root>/                         Data scope
//! <root>/Documents/               Documents scope
//! <root>/.docsync/versions/<rel>/<uuid>
//!                                 conflict versions of <root>/<rel>
//! ```
//!
//! The document at its canonical location is the current version. A
//! version's modification time is the filesystem mtime of its copy.
//!
//! ## Design Decisions
//!
//! - **Signal thread**: query signals are delivered from a dedicated thread,
//!   never from inside a port call, so an observer may call back into the
//!   query from its signal handler.
//! - **Frozen index**: while updates are disabled, filesystem events only
//!   mark the index stale; the rescan happens on the final `enable_updates`.
//! - **Atomic promotion**: the winner is staged next to the document and
//!   swapped in by rename, restoring the previous document on failure.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use docsync_core::{
    domain::{
        newtypes::{DocLocation, RemoteHandle, VersionId},
        pending_edit::PendingEdit,
        version::ConflictVersion,
    },
    ports::{
        document_content::IDocumentContent,
        file_coordinator::{IFileCoordinator, WritingOptions},
        remote_query::{IQueryObserver, IRemoteQuery, QueryConfig, RemoteItem, SearchScope},
        version_store::IVersionStore,
    },
};

/// Directory under the root holding docsync bookkeeping
const STATE_DIR: &str = ".docsync";

/// Name of the Documents scope directory
const DOCUMENTS_DIR: &str = "Documents";

// ============================================================================
// LocalDirectoryStore
// ============================================================================

/// Adapter that bridges all core ports to a local directory
pub struct LocalDirectoryStore {
    root: PathBuf,
    index: Arc<LiveIndex>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl LocalDirectoryStore {
    /// Create a store rooted at `root`
    ///
    /// A relative root is resolved against the current directory. The root
    /// is not required to exist yet; a missing root makes the query
    /// unavailable on start.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        };

        Self {
            index: Arc::new(LiveIndex::new(root.clone())),
            root,
            watcher: Mutex::new(None),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a search scope
    pub fn scope_dir(&self, scope: SearchScope) -> PathBuf {
        scope_dir(&self.root, scope)
    }

    /// Store a copy of `source` as a version in conflict with `location`
    ///
    /// This is what a replication client does when two peers modified the
    /// same document concurrently.
    #[instrument(skip(self, source), fields(location = %location))]
    pub fn stash_conflict_version(
        &self,
        location: &DocLocation,
        source: &Path,
        modified_at: DateTime<Utc>,
    ) -> anyhow::Result<VersionId> {
        let dir = self.versions_dir(location)?;
        fs::create_dir_all(&dir)?;

        let id = VersionId::new();
        let target = dir.join(id.to_string());
        copy_tree(source, &target)?;
        set_modified(&target, modified_at)?;

        debug!(version = %id, "Stashed conflict version");
        Ok(id)
    }

    fn versions_dir(&self, location: &DocLocation) -> anyhow::Result<PathBuf> {
        let relative = location
            .as_path()
            .strip_prefix(&self.root)
            .with_context(|| format!("{location} is outside the store root"))?;
        if relative.as_os_str().is_empty() {
            bail!("the store root has no versions");
        }
        Ok(self.root.join(STATE_DIR).join("versions").join(relative))
    }

    fn watcher(&self) -> MutexGuard<'_, Option<RecommendedWatcher>> {
        self.watcher.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for LocalDirectoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDirectoryStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn scope_dir(root: &Path, scope: SearchScope) -> PathBuf {
    match scope {
        SearchScope::Data => root.to_path_buf(),
        SearchScope::Documents => root.join(DOCUMENTS_DIR),
    }
}

// ============================================================================
// Live index (IRemoteQuery)
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Signal {
    Gathered,
    Updated,
}

#[derive(Default)]
struct IndexState {
    config: Option<QueryConfig>,
    items: Vec<RemoteItem>,
    paused: usize,
    stale: bool,
    signals: Option<mpsc::UnboundedSender<Signal>>,
}

struct LiveIndex {
    root: PathBuf,
    state: Mutex<IndexState>,
    observer: Mutex<Option<Arc<dyn IQueryObserver>>>,
}

impl LiveIndex {
    fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Mutex::new(IndexState::default()),
            observer: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn observer(&self) -> MutexGuard<'_, Option<Arc<dyn IQueryObserver>>> {
        self.observer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// React to a filesystem change in a watched scope
    fn on_fs_event(&self) {
        let mut state = self.state();
        if state.signals.is_none() {
            return;
        }
        if state.paused > 0 {
            state.stale = true;
            return;
        }
        self.rescan(&mut state);
    }

    /// Rebuild the items and signal an update; `state` must be locked
    fn rescan(&self, state: &mut IndexState) {
        let Some(config) = state.config.as_ref() else {
            return;
        };
        match scan(&self.root, config) {
            Ok(items) => {
                debug!(count = items.len(), "Live index rescanned");
                state.items = items;
                state.stale = false;
                if let Some(signals) = &state.signals {
                    let _ = signals.send(Signal::Updated);
                }
            }
            Err(e) => warn!(error = %e, "Failed to rescan store, keeping previous index"),
        }
    }

    fn deliver(&self, signal: Signal) {
        let observer = self.observer().clone();
        let Some(observer) = observer else {
            return;
        };
        match signal {
            Signal::Gathered => observer.on_gathering_finished(),
            Signal::Updated => observer.on_updated(),
        }
    }
}

impl IRemoteQuery for LocalDirectoryStore {
    #[instrument(skip(self, config, observer), fields(root = %self.root.display()))]
    fn start(&self, config: &QueryConfig, observer: Arc<dyn IQueryObserver>) -> anyhow::Result<()> {
        if !self.root.is_dir() {
            bail!("store root not found: {}", self.root.display());
        }
        if self.index.state().signals.is_some() {
            bail!("query already running");
        }

        let items = scan(&self.root, config).context("initial gathering failed")?;
        info!(count = items.len(), "Initial gathering complete");

        let (tx, mut rx) = mpsc::unbounded_channel();

        let index = Arc::clone(&self.index);
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Access(_)) {
                        index.on_fs_event();
                    }
                }
                Err(err) => error!(error = %err, "Store watcher error"),
            },
            notify::Config::default(),
        )
        .context("failed to create store watcher")?;

        for scope in &config.search_scopes {
            let dir = scope_dir(&self.root, *scope);
            if dir.is_dir() {
                watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .with_context(|| format!("failed to watch {}", dir.display()))?;
            } else {
                debug!(%scope, dir = %dir.display(), "Scope directory missing, not watched");
            }
        }

        {
            let mut state = self.index.state();
            state.config = Some(config.clone());
            state.items = items;
            state.paused = 0;
            state.stale = false;
            state.signals = Some(tx.clone());
        }
        *self.index.observer() = Some(observer);
        *self.watcher() = Some(watcher);

        let index = Arc::clone(&self.index);
        std::thread::Builder::new()
            .name("docsync-query".into())
            .spawn(move || {
                while let Some(signal) = rx.blocking_recv() {
                    index.deliver(signal);
                }
                debug!("Query signal thread finished");
            })
            .context("failed to spawn query signal thread")?;

        let _ = tx.send(Signal::Gathered);
        Ok(())
    }

    fn stop(&self) {
        *self.watcher() = None;
        *self.index.observer() = None;
        let mut state = self.index.state();
        state.signals = None;
        state.config = None;
        info!(root = %self.root.display(), "Query stopped");
    }

    fn results(&self) -> Vec<RemoteItem> {
        self.index.state().items.clone()
    }

    fn disable_updates(&self) {
        self.index.state().paused += 1;
    }

    fn enable_updates(&self) {
        let mut state = self.index.state();
        state.paused = state.paused.saturating_sub(1);
        if state.paused == 0 && state.stale {
            self.index.rescan(&mut state);
        }
    }
}

/// List the direct entries of every configured scope
fn scan(root: &Path, config: &QueryConfig) -> std::io::Result<Vec<RemoteItem>> {
    let mut items = Vec::new();

    for scope in &config.search_scopes {
        let dir = scope_dir(root, *scope);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound && *scope != SearchScope::Data => continue,
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            // Entries may vanish between listing and stat.
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            let is_directory = metadata.is_dir();
            let is_package =
                is_directory && !config.name_suffix.is_empty() && name.ends_with(&config.name_suffix);

            let url = match DocLocation::new(path.clone()) {
                Ok(url) => url,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unaddressable entry");
                    continue;
                }
            };

            let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);
            let handle = if is_package {
                package_signature(&path)?
            } else {
                signature(modified_at, metadata.len())
            };

            items.push(RemoteItem {
                handle,
                url,
                is_directory,
                is_package,
                modified_at,
            });
        }
    }

    Ok(items)
}

fn signature(modified_at: Option<DateTime<Utc>>, len: u64) -> RemoteHandle {
    let nanos = modified_at
        .and_then(|t| t.timestamp_nanos_opt())
        .unwrap_or_default();
    RemoteHandle::new(format!("{nanos}:{len}"))
}

/// Handle of a package: latest entry change plus entry count
fn package_signature(path: &Path) -> std::io::Result<RemoteHandle> {
    let mut latest = fs::metadata(path)?.modified().ok();
    let mut count = 0u64;
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        count += 1;
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            latest = latest.max(Some(modified));
        }
    }
    Ok(signature(latest.map(DateTime::<Utc>::from), count))
}

// ============================================================================
// Versions (IVersionStore)
// ============================================================================

impl IVersionStore for LocalDirectoryStore {
    #[instrument(skip(self), fields(location = %location))]
    fn conflicting_versions(&self, location: &DocLocation) -> anyhow::Result<Vec<ConflictVersion>> {
        let dir = self.versions_dir(location)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<VersionId>().ok())
            else {
                continue;
            };
            let modified = entry.metadata()?.modified()?;
            versions.push(ConflictVersion::conflicting(id, modified.into()));
        }

        versions.sort_by_key(|v| (v.modified_at(), v.handle().to_string()));
        debug!(count = versions.len(), "Enumerated conflicting versions");
        Ok(versions)
    }

    fn current_version(&self, location: &DocLocation) -> anyhow::Result<Option<ConflictVersion>> {
        match fs::metadata(location.as_path()) {
            Ok(metadata) => Ok(Some(ConflictVersion::current(
                VersionId::nil(),
                metadata.modified()?.into(),
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, version), fields(location = %location, version = %version.handle()))]
    fn replace(&self, version: &ConflictVersion, location: &DocLocation) -> anyhow::Result<()> {
        if version.is_current() {
            return Ok(());
        }

        let source = self.versions_dir(location)?.join(version.handle().to_string());
        if !source.exists() {
            bail!("version {} of {location} no longer exists", version.handle());
        }

        let target = location.as_path();
        let staged = sibling(target, "docsync-new")?;
        let backup = sibling(target, "docsync-old")?;

        remove_any(&staged)?;
        if let Err(e) = copy_tree(&source, &staged).and_then(|()| set_modified(&staged, version.modified_at())) {
            let _ = remove_any(&staged);
            return Err(e);
        }

        let had_current = target.exists();
        if had_current {
            remove_any(&backup)?;
            fs::rename(target, &backup)?;
        }

        if let Err(e) = fs::rename(&staged, target) {
            if had_current {
                if let Err(restore) = fs::rename(&backup, target) {
                    error!(error = %restore, "Failed to restore previous current version");
                }
            }
            let _ = remove_any(&staged);
            return Err(e.into());
        }

        if had_current {
            if let Err(e) = remove_any(&backup) {
                warn!(backup = %backup.display(), error = %e, "Failed to remove replaced version");
            }
        }

        debug!("Promoted version to current");
        Ok(())
    }

    #[instrument(skip(self), fields(location = %location))]
    fn remove_other_versions(&self, location: &DocLocation) -> anyhow::Result<()> {
        let dir = self.versions_dir(location)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!("Removed other versions");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Coordination (IFileCoordinator)
// ============================================================================

impl IFileCoordinator for LocalDirectoryStore {
    fn coordinate_writing(
        &self,
        location: &DocLocation,
        options: WritingOptions,
        body: &mut dyn FnMut(&DocLocation),
    ) -> anyhow::Result<()> {
        let parent_exists = location.parent().is_some_and(|p| p.as_path().is_dir());
        if !parent_exists {
            bail!("cannot coordinate {location}: containing directory is missing");
        }

        let key = location.as_path().to_path_buf();
        let lock = Arc::clone(
            self.locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );

        {
            let _exclusive = lock.lock().unwrap_or_else(|e| e.into_inner());
            debug!(%location, ?options, "Exclusive access granted");
            body(location);
        }

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        Ok(())
    }
}

// ============================================================================
// Package content (IDocumentContent)
// ============================================================================

impl IDocumentContent for LocalDirectoryStore {
    #[instrument(skip(self), fields(document = %document))]
    fn read_entries(&self, document: &DocLocation) -> anyhow::Result<Vec<DocLocation>> {
        if !document.as_path().is_dir() {
            bail!("{document} is not a package");
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(document.as_path())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            entries.push(document.join(name)?);
        }
        entries.sort();

        debug!(count = entries.len(), "Read package entries");
        Ok(entries)
    }

    #[instrument(skip(self, edit), fields(document = %document))]
    fn commit(&self, document: &DocLocation, edit: &PendingEdit) -> anyhow::Result<()> {
        if !document.as_path().is_dir() {
            bail!("{document} is not a package");
        }

        // Stage additions first so a failed copy leaves the package untouched.
        let mut staged: Vec<(PathBuf, DocLocation)> = Vec::new();
        for url in edit.newly_added_urls() {
            if url.parent().as_ref() == Some(document) {
                continue;
            }
            let Some(name) = url.file_name() else {
                continue;
            };
            let target = document.join(name)?;
            let staging = sibling(target.as_path(), "docsync-tmp")?;
            if let Err(e) = copy_tree(url.as_path(), &staging) {
                let _ = remove_any(&staging);
                for (path, _) in &staged {
                    let _ = remove_any(path);
                }
                return Err(e.context(format!("failed to copy {url} into {document}")));
            }
            staged.push((staging, target));
        }

        for name in edit.deleted_names() {
            let target = document.join(name)?;
            remove_any(target.as_path())?;
        }

        for (staging, target) in staged {
            remove_any(target.as_path())?;
            fs::rename(&staging, target.as_path())?;
        }

        info!(
            added = edit.newly_added_urls().len(),
            deleted = edit.deleted_names().len(),
            "Committed pending edit"
        );
        Ok(())
    }
}

// ============================================================================
// Filesystem helpers
// ============================================================================

/// Hidden sibling of `path` used for staging, e.g. `.Trip.shoebox.docsync-new`
fn sibling(path: &Path, tag: &str) -> anyhow::Result<PathBuf> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        bail!("{} has no parent", path.display());
    };
    Ok(parent.join(format!(".{}.{tag}", name.to_string_lossy())))
}

/// Copy a file or a directory tree
fn copy_tree(source: &Path, target: &Path) -> anyhow::Result<()> {
    let metadata = fs::metadata(source)
        .with_context(|| format!("cannot read {}", source.display()))?;

    if metadata.is_dir() {
        fs::create_dir(target)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_tree(&entry.path(), &target.join(entry.file_name()))?;
        }
    } else {
        fs::copy(source, target)?;
    }
    Ok(())
}

/// Remove a file or directory tree; a missing path is not an error
fn remove_any(path: &Path) -> std::io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(m) if m.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn set_modified(path: &Path, modified_at: DateTime<Utc>) -> anyhow::Result<()> {
    let file = fs::File::open(path)?;
    file.set_modified(SystemTime::from(modified_at))
        .with_context(|| format!("cannot set modification time of {}", path.display()))?;
    Ok(())
}

// ============================================================================
// Unit tests
// ============================================================================
