//! cloudscout-common - Shared types for the resource indexing pipeline
//!
//! This crate provides the data model shared by the indexer and any future
//! consumers of persisted snapshots, without async or storage dependencies
//! to keep it lightweight.
//!
//! ## Modules
//!
//! - [`cost`]: Monthly cost rates for the unused-resource engine
//! - [`defaults`]: Default configuration values
//! - [`record`]: Schemaless resource records
//! - [`report`]: Issue reports emitted by the rule engines
//! - [`resource`]: Resource taxonomy (types, scopes, display names)
//! - [`snapshot`]: Aggregated inventory snapshots
//! - [`template`]: Seeded category templates for the rule engines

pub mod cost;
pub mod defaults;
pub mod record;
pub mod report;
pub mod resource;
pub mod snapshot;
pub mod template;

// Re-export commonly used types
pub use record::ResourceRecord;
pub use report::{severity_label, CategoryReport, EngineKind, IssueReport};
pub use resource::{ResourceType, Scope};
pub use snapshot::Snapshot;
