//! docsync Core - Domain types, ports and coordinated access
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `MetadataItem`, `DocumentChangeSet`, `ConflictVersion`, `PendingEdit`
//! - **Port definitions** - Traits for adapters: `IRemoteQuery`, `IVersionStore`,
//!   `IFileCoordinator`, `IDocumentContent`
//! - **Use cases** - `CoordinatedAccessGate`
//! - **Configuration** - YAML-backed `Config`
//!
//! # Architecture
//!
//! The domain module contains pure data types with no I/O. Ports define trait
//! interfaces that adapter modules implement. Use cases orchestrate ports.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
