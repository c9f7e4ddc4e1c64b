//! Document content port (driven/secondary port)
//!
//! A package document is a directory of named entries. This port lists the
//! durable entries and commits a [`PendingEdit`]; the byte format of the
//! entries themselves is opaque here.

use crate::domain::{newtypes::DocLocation, pending_edit::PendingEdit};

/// Port trait for package document content
///
/// Both methods block and are meant to run inside a coordinated write.
pub trait IDocumentContent: Send + Sync {
    /// Locations of the entries currently stored inside `document`
    fn read_entries(&self, document: &DocLocation) -> anyhow::Result<Vec<DocLocation>>;

    /// Copy added urls into `document` and remove deleted names
    ///
    /// Implementations should leave the document unchanged on error where
    /// the underlying store allows it.
    fn commit(&self, document: &DocLocation, edit: &PendingEdit) -> anyhow::Result<()>;
}
