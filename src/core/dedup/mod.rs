//! Deduplication and champion election

pub mod election;

pub use election::{deduplicate, normalize_value, DedupGroup, DedupKey, DedupOutcome};
