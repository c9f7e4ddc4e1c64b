//! Version store port (driven/secondary port)
//!
//! Exposes the store's multi-version state for a document: the version at
//! the canonical location plus any versions the store flagged as in
//! conflict with it.
//!
//! All methods block and are meant to be called inside a coordinated write
//! (see [`CoordinatedAccessGate`](crate::usecases::CoordinatedAccessGate)).

use crate::domain::{newtypes::DocLocation, version::ConflictVersion};

/// Port trait for document version management
pub trait IVersionStore: Send + Sync {
    /// Versions currently flagged as conflicting with the current one
    fn conflicting_versions(&self, location: &DocLocation) -> anyhow::Result<Vec<ConflictVersion>>;

    /// The version stored at the canonical location, if any
    fn current_version(&self, location: &DocLocation) -> anyhow::Result<Option<ConflictVersion>>;

    /// Make `version` the content of `location`
    ///
    /// Must be atomic: on error the previous current version is intact.
    fn replace(&self, version: &ConflictVersion, location: &DocLocation) -> anyhow::Result<()>;

    /// Destroy every version except the current one
    fn remove_other_versions(&self, location: &DocLocation) -> anyhow::Result<()>;
}
