//! Open package document
//!
//! An [`OpenDocument`] ties one package to everything that changes it:
//! - durable entries, read from the store under coordination
//! - a [`PendingEdit`] of local changes, merged only on [`save`](OpenDocument::save)
//! - a [`ChangeAggregator`] of peer changes, applied on demand
//! - a conflict indicator, cleared only by a successful resolution

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use docsync_conflict::{ConflictResolver, ResolutionOutcome};
use docsync_core::{
    domain::{change_set::ApplyReport, newtypes::DocLocation, pending_edit::PendingEdit},
    ports::document_content::IDocumentContent,
    usecases::{CoordinatedAccessGate, WriteScope},
};

use crate::{aggregator::ChangeAggregator, SyncError};

/// A package document opened for editing
pub struct OpenDocument {
    location: DocLocation,
    content: Arc<dyn IDocumentContent>,
    gate: CoordinatedAccessGate,
    changes: Arc<ChangeAggregator>,
    entries: BTreeMap<String, DocLocation>,
    pending: PendingEdit,
    in_conflict: bool,
}

impl OpenDocument {
    /// Open the package at `location`, reading its entries under coordination
    pub async fn open(
        location: DocLocation,
        content: Arc<dyn IDocumentContent>,
        gate: CoordinatedAccessGate,
    ) -> Result<Self, SyncError> {
        let entries = read_entries(&gate, &content, &location).await?;
        info!(%location, entries = entries.len(), "Opened document");

        Ok(Self {
            location,
            content,
            gate,
            changes: Arc::new(ChangeAggregator::new()),
            entries,
            pending: PendingEdit::new(),
            in_conflict: false,
        })
    }

    pub fn location(&self) -> &DocLocation {
        &self.location
    }

    /// Aggregator peers' changes should be recorded into
    pub fn changes(&self) -> Arc<ChangeAggregator> {
        Arc::clone(&self.changes)
    }

    /// Durable entries keyed by name
    pub fn entries(&self) -> &BTreeMap<String, DocLocation> {
        &self.entries
    }

    pub fn pending(&self) -> &PendingEdit {
        &self.pending
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// True while versions are known to be in conflict
    pub fn in_conflict(&self) -> bool {
        self.in_conflict
    }

    /// Buffer an addition; durable entries are untouched until [`save`](Self::save)
    pub fn add_pending(&mut self, url: DocLocation) {
        self.pending.add(url);
    }

    /// Buffer a deletion; durable entries are untouched until [`save`](Self::save)
    ///
    /// A name that only exists as a pending addition is simply dropped from
    /// the edit.
    pub fn delete_pending(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.entries.contains_key(&name) || !self.pending.discard_addition(&name) {
            self.pending.delete(name);
        }
    }

    /// Entry names as the user sees them: durable entries with pending edits on top
    pub fn visible_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .keys()
            .filter(|name| !self.pending.deleted_names().contains(*name))
            .cloned()
            .collect();

        for url in self.pending.newly_added_urls() {
            if let Some(name) = url.file_name() {
                if !self.entries.contains_key(name) || self.pending.deleted_names().contains(name) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        names.dedup();
        names
    }

    /// Commit the pending edit to the store
    ///
    /// On success the edit is merged into the durable entries and cleared.
    /// On failure both are left as they were, so the save can be retried.
    pub async fn save(&mut self) -> Result<(), SyncError> {
        if self.pending.is_empty() {
            debug!(location = %self.location, "Nothing to save");
            return Ok(());
        }

        let edit = self.pending.clone();
        let content = Arc::clone(&self.content);
        self.gate
            .with_exclusive_write(
                self.location.clone(),
                WriteScope::ContentAndMetadata,
                move |effective| content.commit(effective, &edit),
            )
            .await?;

        for name in self.pending.deleted_names() {
            self.entries.remove(name);
        }
        for url in self.pending.newly_added_urls() {
            if let Some(name) = url.file_name() {
                let durable = self.location.join(name)?;
                self.entries.insert(name.to_string(), durable);
            }
        }

        info!(
            location = %self.location,
            added = self.pending.newly_added_urls().len(),
            deleted = self.pending.deleted_names().len(),
            "Saved document"
        );
        self.pending = PendingEdit::new();
        Ok(())
    }

    /// Drain peer changes and apply them to the durable entries
    pub fn apply_peer_changes(&mut self) -> ApplyReport {
        let batch = self.changes.drain();
        if batch.is_empty() {
            return ApplyReport::default();
        }
        let report = batch.apply_to(&mut self.entries);
        debug!(
            location = %self.location,
            applied = report.applied,
            stale = report.stale,
            "Applied peer changes"
        );
        report
    }

    /// Reread durable entries from the store
    ///
    /// Peer changes recorded before the reread are discarded, since it
    /// already reflects them. Changes recorded while it runs are kept.
    pub async fn reload(&mut self) -> Result<(), SyncError> {
        self.changes.drain();
        let entries = read_entries(&self.gate, &self.content, &self.location).await?;
        self.entries = entries;
        debug!(location = %self.location, entries = self.entries.len(), "Reloaded document");
        Ok(())
    }

    /// Ask `resolver` whether versions are in conflict and set the indicator
    pub async fn check_conflicts(&mut self, resolver: &ConflictResolver) -> Result<bool, SyncError> {
        self.in_conflict = resolver.has_conflicts(self.location.clone()).await?;
        Ok(self.in_conflict)
    }

    /// Resolve version conflicts and reload when the current version changed
    ///
    /// The conflict indicator stays on until a resolution succeeds.
    pub async fn resolve_conflicts(&mut self, resolver: &ConflictResolver) -> ResolutionOutcome {
        let outcome = resolver.resolve(self.location.clone()).await;

        if outcome.is_resolved() {
            self.in_conflict = false;
        } else {
            self.in_conflict = true;
            if let Some(error) = &outcome.error {
                warn!(location = %self.location, error = %error, "Conflict remains unresolved");
            }
        }

        if outcome.reload_required {
            if let Err(e) = self.reload().await {
                warn!(location = %self.location, error = %e, "Reload after resolution failed");
            }
        }

        outcome
    }
}

impl std::fmt::Debug for OpenDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenDocument")
            .field("location", &self.location)
            .field("entries", &self.entries.len())
            .field("pending", &self.pending)
            .field("in_conflict", &self.in_conflict)
            .finish_non_exhaustive()
    }
}

async fn read_entries(
    gate: &CoordinatedAccessGate,
    content: &Arc<dyn IDocumentContent>,
    location: &DocLocation,
) -> Result<BTreeMap<String, DocLocation>, SyncError> {
    let content = Arc::clone(content);
    let urls = gate
        .with_exclusive_write(location.clone(), WriteScope::ContentAndMetadata, move |effective| {
            content.read_entries(effective)
        })
        .await?;

    Ok(urls
        .into_iter()
        .filter_map(|url| url.file_name().map(|name| (name.to_string(), url.clone())))
        .collect())
}
