//! Presented metadata items
//!
//! A [`MetadataItem`] is one row of the authoritative list the metadata
//! observer publishes. Items are immutable values: a changed item is a new
//! value with the same `url`, never an in-place mutation.

use serde::{Deserialize, Serialize};

use super::newtypes::{DocLocation, RemoteHandle};

/// One entry of a presented snapshot
///
/// Identity for reconciliation is `url`. The `remote_handle` is non-identity
/// content: when it changes for an unchanged `url`, presentation reloads the
/// row instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataItem {
    remote_handle: RemoteHandle,
    url: DocLocation,
}

impl MetadataItem {
    pub fn new(remote_handle: RemoteHandle, url: DocLocation) -> Self {
        Self { remote_handle, url }
    }

    pub fn remote_handle(&self) -> &RemoteHandle {
        &self.remote_handle
    }

    pub fn url(&self) -> &DocLocation {
        &self.url
    }

    /// Display name derived from the last component of `url`
    pub fn name(&self) -> &str {
        self.url.file_name().unwrap_or_default()
    }
}

/// An immutable, ordered snapshot of presentable items
pub type Snapshot = std::sync::Arc<[MetadataItem]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_last_component() {
        let item = MetadataItem::new(
            RemoteHandle::new("h1"),
            DocLocation::new("/store/Documents/Trip.shoebox").unwrap(),
        );
        assert_eq!(item.name(), "Trip.shoebox");
    }

    #[test]
    fn test_equality_includes_handle() {
        let url = DocLocation::new("/store/a.shoebox").unwrap();
        let a = MetadataItem::new(RemoteHandle::new("h1"), url.clone());
        let b = MetadataItem::new(RemoteHandle::new("h2"), url);
        assert_ne!(a, b);
        assert_eq!(a.url(), b.url());
    }
}
