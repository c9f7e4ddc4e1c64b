//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the synchronization layer depends on, whose
//! implementations live in adapter modules (see `docsync_sync::local_store`).
//!
//! ## Ports Overview
//!
//! - [`IRemoteQuery`] - Live, push-model metadata query over the store
//! - [`IVersionStore`] - Enumeration and promotion of document versions
//! - [`IFileCoordinator`] - Exclusive coordinated writes against other writers
//! - [`IDocumentContent`] - Entry listing and commit for package documents

pub mod document_content;
pub mod file_coordinator;
pub mod remote_query;
pub mod version_store;

pub use document_content::IDocumentContent;
pub use file_coordinator::{IFileCoordinator, WritingOptions};
pub use remote_query::{IQueryObserver, IRemoteQuery, QueryConfig, RemoteItem, SearchScope, SortKey};
pub use version_store::IVersionStore;
