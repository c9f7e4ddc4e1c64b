//! Error types for conflict resolution

use thiserror::Error;

use docsync_core::{domain::newtypes::DocLocation, usecases::CoordinationError};

/// Errors that can occur while resolving version conflicts
///
/// Any of these leaves the conflict in place; the caller is expected to
/// retry later.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The store could not list the versions of the document
    #[error("failed to enumerate versions of {location}: {source}")]
    Enumeration {
        location: DocLocation,
        #[source]
        source: anyhow::Error,
    },

    /// The winning version could not be made current
    #[error("failed to promote winning version of {location}: {source}")]
    Promotion {
        location: DocLocation,
        #[source]
        source: anyhow::Error,
    },

    /// Losing versions could not be removed
    #[error("failed to remove losing versions of {location}: {source}")]
    Cleanup {
        location: DocLocation,
        #[source]
        source: anyhow::Error,
    },

    /// Exclusive access to the document was not obtained
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    /// Unknown winner policy name in configuration
    #[error("unknown winner policy: {0}")]
    UnknownPolicy(String),
}
