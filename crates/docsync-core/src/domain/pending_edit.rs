//! Uncommitted local edits on an open document

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::newtypes::DocLocation;

/// Local edits buffered until an explicit save
///
/// Nothing in a `PendingEdit` touches durable state; the open document
/// merges it only after the store accepted the commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdit {
    newly_added_urls: Vec<DocLocation>,
    deleted_names: BTreeSet<String>,
}

impl PendingEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file to be copied into the document on save
    ///
    /// Re-adding an already queued url keeps its original position. Adding a
    /// name that was queued for deletion cancels the deletion.
    pub fn add(&mut self, url: DocLocation) {
        if let Some(name) = url.file_name() {
            self.deleted_names.remove(name);
        }
        if !self.newly_added_urls.contains(&url) {
            self.newly_added_urls.push(url);
        }
    }

    /// Queue an entry name for removal on save
    ///
    /// Any pending addition under the same name is dropped as well, so the
    /// entry is gone after the save whether or not it was durable.
    pub fn delete(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.discard_addition(&name);
        self.deleted_names.insert(name);
    }

    /// Drop pending additions called `name` without queueing a deletion
    ///
    /// Returns whether anything was dropped.
    pub fn discard_addition(&mut self, name: &str) -> bool {
        let before = self.newly_added_urls.len();
        self.newly_added_urls
            .retain(|url| url.file_name() != Some(name));
        self.newly_added_urls.len() != before
    }

    pub fn newly_added_urls(&self) -> &[DocLocation] {
        &self.newly_added_urls
    }

    pub fn deleted_names(&self) -> &BTreeSet<String> {
        &self.deleted_names
    }

    pub fn is_empty(&self) -> bool {
        self.newly_added_urls.is_empty() && self.deleted_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> DocLocation {
        DocLocation::new(path).unwrap()
    }

    #[test]
    fn test_add_preserves_order_and_dedups() {
        let mut edit = PendingEdit::new();
        edit.add(url("/pick/b.png"));
        edit.add(url("/pick/a.png"));
        edit.add(url("/pick/b.png"));

        assert_eq!(
            edit.newly_added_urls(),
            &[url("/pick/b.png"), url("/pick/a.png")]
        );
    }

    #[test]
    fn test_discard_addition_drops_it() {
        let mut edit = PendingEdit::new();
        edit.add(url("/pick/a.png"));

        assert!(edit.discard_addition("a.png"));
        assert!(edit.is_empty());
        assert!(!edit.discard_addition("a.png"));
    }

    #[test]
    fn test_delete_after_replacement_still_deletes() {
        let mut edit = PendingEdit::new();
        edit.add(url("/pick/1.jpg"));
        edit.delete("1.jpg");

        assert!(edit.newly_added_urls().is_empty());
        assert!(edit.deleted_names().contains("1.jpg"));
    }

    #[test]
    fn test_add_cancels_pending_deletion() {
        let mut edit = PendingEdit::new();
        edit.delete("a.png");
        assert!(edit.deleted_names().contains("a.png"));

        edit.add(url("/pick/a.png"));
        assert!(edit.deleted_names().is_empty());
        assert_eq!(edit.newly_added_urls().len(), 1);
    }
}
