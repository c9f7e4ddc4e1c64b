//! Batched peer content changes for one open document
//!
//! A [`DocumentChangeSet`] is the unit the change aggregator hands out on
//! each drain. Applying it goes through a [`ChangeTarget`] in a fixed order:
//! deletions, then updates, then additions. A name that was deleted and
//! re-added inside one batch therefore ends up present.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::newtypes::DocLocation;

/// Peer-originated changes accumulated between two drains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChangeSet {
    deleted_names: BTreeSet<String>,
    updated_names: BTreeSet<String>,
    new_urls: BTreeSet<DocLocation>,
}

/// Receiver of drained changes
///
/// Each method reports whether the target held (or now holds) the entry.
/// Returning `false` marks the change as stale: it referred to an entry that
/// a later event already superseded.
pub trait ChangeTarget {
    fn remove_entry(&mut self, name: &str) -> bool;
    fn refresh_entry(&mut self, name: &str) -> bool;
    fn insert_entry(&mut self, url: &DocLocation) -> bool;
}

/// Outcome of applying one change set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub stale: usize,
}

impl DocumentChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the name was already recorded
    pub fn insert_deleted(&mut self, name: impl Into<String>) -> bool {
        self.deleted_names.insert(name.into())
    }

    /// Returns `false` if the name was already recorded
    pub fn insert_updated(&mut self, name: impl Into<String>) -> bool {
        self.updated_names.insert(name.into())
    }

    /// Returns `false` if the url was already recorded
    pub fn insert_added(&mut self, url: DocLocation) -> bool {
        self.new_urls.insert(url)
    }

    pub fn deleted_names(&self) -> &BTreeSet<String> {
        &self.deleted_names
    }

    pub fn updated_names(&self) -> &BTreeSet<String> {
        &self.updated_names
    }

    pub fn new_urls(&self) -> &BTreeSet<DocLocation> {
        &self.new_urls
    }

    pub fn is_empty(&self) -> bool {
        self.deleted_names.is_empty() && self.updated_names.is_empty() && self.new_urls.is_empty()
    }

    /// Total number of recorded events
    pub fn len(&self) -> usize {
        self.deleted_names.len() + self.updated_names.len() + self.new_urls.len()
    }

    /// Apply the batch to `target`: deletions, then updates, then additions
    pub fn apply_to<T: ChangeTarget + ?Sized>(&self, target: &mut T) -> ApplyReport {
        let mut report = ApplyReport::default();

        for name in &self.deleted_names {
            tally(&mut report, target.remove_entry(name), "delete", name);
        }
        for name in &self.updated_names {
            tally(&mut report, target.refresh_entry(name), "update", name);
        }
        for url in &self.new_urls {
            let name = url.file_name().unwrap_or_default();
            tally(&mut report, target.insert_entry(url), "add", name);
        }

        report
    }
}

fn tally(report: &mut ApplyReport, hit: bool, kind: &str, name: &str) {
    if hit {
        report.applied += 1;
    } else {
        debug!(kind, name, "Skipping stale change");
        report.stale += 1;
    }
}

/// Entries of a package document keyed by name
impl ChangeTarget for BTreeMap<String, DocLocation> {
    fn remove_entry(&mut self, name: &str) -> bool {
        self.remove(name).is_some()
    }

    fn refresh_entry(&mut self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn insert_entry(&mut self, url: &DocLocation) -> bool {
        match url.file_name() {
            Some(name) => {
                self.insert(name.to_string(), url.clone());
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> DocLocation {
        DocLocation::new(path).unwrap()
    }

    fn entries(names: &[&str]) -> BTreeMap<String, DocLocation> {
        names
            .iter()
            .map(|n| (n.to_string(), url(&format!("/doc.shoebox/{n}"))))
            .collect()
    }

    #[test]
    fn test_recording_twice_is_noop() {
        let mut set = DocumentChangeSet::new();
        assert!(set.insert_updated("a"));
        assert!(!set.insert_updated("a"));
        assert!(set.insert_deleted("b"));
        assert!(!set.insert_deleted("b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_delete_then_readd_leaves_entry_present() {
        let mut set = DocumentChangeSet::new();
        set.insert_deleted("x");
        set.insert_added(url("/doc.shoebox/x"));

        let mut target = entries(&["x", "y"]);
        let report = set.apply_to(&mut target);

        assert!(target.contains_key("x"));
        assert!(target.contains_key("y"));
        assert_eq!(report.applied, 2);
        assert_eq!(report.stale, 0);
    }

    #[test]
    fn test_stale_references_are_noops() {
        let mut set = DocumentChangeSet::new();
        set.insert_deleted("gone");
        set.insert_updated("also-gone");

        let mut target = entries(&["a"]);
        let report = set.apply_to(&mut target);

        assert_eq!(target, entries(&["a"]));
        assert_eq!(report.stale, 2);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_update_then_delete_removes() {
        let mut set = DocumentChangeSet::new();
        set.insert_updated("a");
        set.insert_deleted("a");

        let mut target = entries(&["a"]);
        let report = set.apply_to(&mut target);

        // Deletions run first, so the update finds nothing to refresh.
        assert!(target.is_empty());
        assert_eq!(report, ApplyReport { applied: 1, stale: 1 });
    }
}
