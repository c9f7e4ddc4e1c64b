//! Document versions as reported by a version store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::VersionId;

/// One stored version of a document
///
/// Versions are read fresh on every resolution pass and never mutated:
/// losing versions are removed from the store rather than relabeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictVersion {
    handle: VersionId,
    modified_at: DateTime<Utc>,
    is_current: bool,
}

impl ConflictVersion {
    /// Creates a version that is in conflict with the current one
    pub fn conflicting(handle: VersionId, modified_at: DateTime<Utc>) -> Self {
        Self {
            handle,
            modified_at,
            is_current: false,
        }
    }

    /// Creates the version currently stored at the canonical location
    pub fn current(handle: VersionId, modified_at: DateTime<Utc>) -> Self {
        Self {
            handle,
            modified_at,
            is_current: true,
        }
    }

    pub fn handle(&self) -> VersionId {
        self.handle
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }
}
