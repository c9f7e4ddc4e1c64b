//! Identity-keyed list reconciliation
//!
//! Computes the insert/delete/reload operations that turn one presented
//! snapshot into the next, so a list view can animate only what changed.
//! Moves are never reported: an item whose position relative to the items
//! before it changed is deleted at its old index and inserted at its new one.
//!
//! Applying a [`ListChanges`] to the old list yields the new one when done in
//! this order: deletions from the highest index down, then insertions from
//! the lowest index up, then reloads.

use std::collections::HashMap;
use std::hash::Hash;

use docsync_core::domain::{metadata::MetadataItem, newtypes::DocLocation};

/// A list element with a stable identity
///
/// Elements with equal keys denote the same row. Non-identity content is
/// compared with `PartialEq` on the whole element.
pub trait Keyed {
    type Key: Eq + Hash;

    fn key(&self) -> &Self::Key;
}

impl Keyed for MetadataItem {
    type Key = DocLocation;

    fn key(&self) -> &DocLocation {
        self.url()
    }
}

/// Row operations between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListChanges {
    /// Positions in the old list of identities that are gone or moved, ascending
    pub deletions: Vec<usize>,
    /// Positions in the new list of identities that are new or moved, ascending
    pub insertions: Vec<usize>,
    /// Positions in the new list of unmoved identities whose content changed,
    /// ascending
    pub reloads: Vec<usize>,
}

impl ListChanges {
    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.insertions.is_empty() && self.reloads.is_empty()
    }

    /// Total number of row operations
    pub fn len(&self) -> usize {
        self.deletions.len() + self.insertions.len() + self.reloads.len()
    }
}

/// Diff `old` against `new` by identity
///
/// Keys are expected to be unique within each list. Runs in linear time:
/// `new` is walked once, and a shared item stays in place only while its old
/// index keeps increasing. An item moved to the back therefore costs one
/// delete+insert pair, while one moved to the front displaces every item it
/// jumped over.
pub fn reconcile<T>(old: &[T], new: &[T]) -> ListChanges
where
    T: Keyed + PartialEq,
{
    let old_index: HashMap<&T::Key, usize> =
        old.iter().enumerate().map(|(i, item)| (item.key(), i)).collect();

    let mut changes = ListChanges::default();
    let mut kept = vec![false; old.len()];
    let mut last_kept: Option<usize> = None;

    for (i, item) in new.iter().enumerate() {
        match old_index.get(item.key()) {
            None => changes.insertions.push(i),
            Some(&j) if last_kept.map_or(true, |k| j > k) => {
                kept[j] = true;
                last_kept = Some(j);
                if old[j] != *item {
                    changes.reloads.push(i);
                }
            }
            Some(_) => changes.insertions.push(i),
        }
    }

    changes.deletions = (0..old.len()).filter(|&j| !kept[j]).collect();
    changes
}
