//! docsync Conflict - Version conflict resolution
//!
//! Provides:
//! - Deterministic winner selection ("latest modification wins, ties keep current")
//! - Coordinated promotion of the winner and removal of losing versions
//! - Conflict detection for the open-document indicator

pub mod error;
pub mod policy;
pub mod resolver;

pub use error::ConflictError;
pub use policy::{select_winner, WinnerPolicy};
pub use resolver::{ConflictResolver, ResolutionOutcome};
