//! Analysis modules.
//!
//! Lookups and aggregations over the decoded snapshot.

pub mod aggregator;

pub use aggregator::*;
