//! Domain entities
//!
//! This module contains the core domain types for docsync:
//! - Newtypes for locations, store handles and version identifiers
//! - Presented metadata items and snapshots
//! - Peer change batches for open documents
//! - Document versions used by conflict resolution
//! - Uncommitted local edits
//! - Domain-specific error types

pub mod change_set;
pub mod errors;
pub mod metadata;
pub mod newtypes;
pub mod pending_edit;
pub mod version;

pub use change_set::{ApplyReport, ChangeTarget, DocumentChangeSet};
pub use errors::DomainError;
pub use metadata::{MetadataItem, Snapshot};
pub use newtypes::*;
pub use pending_edit::PendingEdit;
pub use version::ConflictVersion;
