//! Coordinated I/O port (driven/secondary port)
//!
//! A coordinator grants exclusive access to a location against every other
//! writer, including the store's own background sync. Acquisition may block
//! for an unbounded time.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::DocLocation;

/// Intent flags passed along with a coordinated write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingOptions {
    /// The body will delete the item; the store may relocate it first
    pub for_deleting: bool,
    /// Only metadata changes; content readers are not excluded
    pub content_independent_metadata_only: bool,
    /// The body will move the item
    pub for_moving: bool,
}

impl WritingOptions {
    pub fn for_deleting() -> Self {
        Self {
            for_deleting: true,
            ..Self::default()
        }
    }

    pub fn metadata_only() -> Self {
        Self {
            content_independent_metadata_only: true,
            ..Self::default()
        }
    }
}

/// Port trait for coordinated writes
///
/// ## Contract
///
/// - `body` is invoked at most once, while exclusivity is held, with the
///   effective location (which may differ from `location`).
/// - An `Err` return means exclusivity was never acquired and `body` was
///   not invoked.
/// - The call blocks the current thread until `body` returned and the
///   exclusivity was released.
pub trait IFileCoordinator: Send + Sync {
    fn coordinate_writing(
        &self,
        location: &DocLocation,
        options: WritingOptions,
        body: &mut dyn FnMut(&DocLocation),
    ) -> anyhow::Result<()>;
}
