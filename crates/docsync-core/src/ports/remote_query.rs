//! Remote metadata query port (driven/secondary port)
//!
//! A live query over the store's metadata index. The query pushes signals to
//! an [`IQueryObserver`]; the observer then reads [`IRemoteQuery::results`]
//! bracketed by `disable_updates` / `enable_updates` so the read cannot
//! interleave with a concurrent index update.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because store errors are adapter-specific.
//! - Methods are synchronous: signals arrive on whatever background thread
//!   the store uses, and reads are cheap in-memory copies of the index.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{DocLocation, RemoteHandle};

/// Where in the store a query searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// The container's data area (its root)
    Data,
    /// The user-visible documents area
    Documents,
}

impl std::fmt::Display for SearchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchScope::Data => "data",
            SearchScope::Documents => "documents",
        };
        write!(f, "{}", s)
    }
}

/// Ascending sort order applied to snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Display name, the default
    #[default]
    Name,
    /// Last modification time, oldest first
    ModifiedAt,
}

/// Query configuration handed to the store on start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Only names ending with this suffix match (empty matches everything)
    pub name_suffix: String,
    pub search_scopes: BTreeSet<SearchScope>,
    pub sort_key: SortKey,
}

impl QueryConfig {
    pub fn new(name_suffix: impl Into<String>, sort_key: SortKey) -> Self {
        Self {
            name_suffix: name_suffix.into(),
            search_scopes: [SearchScope::Data, SearchScope::Documents].into_iter().collect(),
            sort_key,
        }
    }

    /// Returns true if `item` belongs in a presented snapshot
    ///
    /// The name must end with the suffix, and the item must be a plain file
    /// or a package bundle. Ordinary directories never match.
    pub fn matches(&self, item: &RemoteItem) -> bool {
        let Some(name) = item.url.file_name() else {
            return false;
        };
        name.ends_with(&self.name_suffix) && (!item.is_directory || item.is_package)
    }
}

/// A raw item as reported by the store's index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    pub handle: RemoteHandle,
    pub url: DocLocation,
    pub is_directory: bool,
    /// Directory the store presents as a single document
    pub is_package: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Receiver for query signals
///
/// Callbacks may be invoked from a background thread, so implementations
/// must be thread-safe.
pub trait IQueryObserver: Send + Sync {
    /// The initial gathering phase completed
    fn on_gathering_finished(&self);

    /// The live index changed after the initial gathering
    fn on_updated(&self);
}

/// Port trait for a live store metadata query
pub trait IRemoteQuery: Send + Sync {
    /// Start gathering and deliver signals to `observer` until [`stop`]
    ///
    /// # Errors
    /// Returns an error if the store is unreachable. Implementations must not
    /// invoke `observer` after returning an error.
    ///
    /// [`stop`]: IRemoteQuery::stop
    fn start(&self, config: &QueryConfig, observer: Arc<dyn IQueryObserver>) -> anyhow::Result<()>;

    /// Stop the query and release the observer
    fn stop(&self);

    /// Current contents of the live index
    fn results(&self) -> Vec<RemoteItem>;

    /// Freeze the live index; incoming changes are deferred
    fn disable_updates(&self);

    /// Unfreeze the live index and apply deferred changes
    fn enable_updates(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, is_directory: bool, is_package: bool) -> RemoteItem {
        RemoteItem {
            handle: RemoteHandle::new(path),
            url: DocLocation::new(path).unwrap(),
            is_directory,
            is_package,
            modified_at: None,
        }
    }

    #[test]
    fn test_matches_suffix_files() {
        let config = QueryConfig::new(".shoebox", SortKey::Name);
        assert!(config.matches(&item("/s/a.shoebox", false, false)));
        assert!(!config.matches(&item("/s/a.txt", false, false)));
    }

    #[test]
    fn test_matches_packages_but_not_plain_directories() {
        let config = QueryConfig::new(".shoebox", SortKey::Name);
        assert!(config.matches(&item("/s/a.shoebox", true, true)));
        assert!(!config.matches(&item("/s/b.shoebox", true, false)));
    }

    #[test]
    fn test_default_scopes_cover_data_and_documents() {
        let config = QueryConfig::new("", SortKey::Name);
        assert_eq!(config.search_scopes.len(), 2);
        assert!(config.matches(&item("/s/anything", false, false)));
    }
}
