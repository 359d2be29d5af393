//! Sync orchestration
//!
//! - [`orchestrator`] - the pull to reconcile pipeline for one run
//! - [`summary`] - run phases, per-row results and counters

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{SyncOrchestrator, SyncRequest};
pub use summary::{
    RowResult, RowRole, RunError, RunErrorKind, SyncCounts, SyncPhase, SyncRunResult,
};
