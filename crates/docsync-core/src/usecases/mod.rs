//! Use cases (interactors) for docsync
//!
//! Thin coordinators that orchestrate port interfaces.
//!
//! ## Use Cases
//!
//! - [`CoordinatedAccessGate`] - Exclusive writes dispatched off the caller's context

pub mod access_gate;

pub use access_gate::{CoordinatedAccessGate, CoordinationError, WriteScope};
