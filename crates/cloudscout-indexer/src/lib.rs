//! cloudscout-indexer - Resource indexing pipeline
//!
//! This crate provides the indexer binary that inventories cloud accounts,
//! aggregates per-account snapshots, runs the rule engines over them and
//! persists the results.

pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod plan;
pub mod policy;
pub mod remediate;
pub mod scheduler;
pub mod source;
pub mod store;
