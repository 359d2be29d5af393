//! Staging queue: in-memory backend and registry-aware manager
//!
//! The [`StagingStore`](crate::adapters::database::StagingStore) trait lives
//! with the other storage seams in `adapters::database`. This module holds the
//! process-local implementation and the [`StagingManager`] that the
//! orchestrator and operators use.

pub mod manager;
pub mod memory;

pub use manager::{KnownSplit, PromotionSummary, StagingManager};
pub use memory::InMemoryStagingStore;
