//! Snapshot storage.
//!
//! This module reads the process snapshot from disk with failover and
//! optionally keeps the decoded records for a short time.

pub mod cache;
pub mod loader;
pub mod migrate;

pub use cache::RecordStore;
pub use loader::SnapshotLoader;
