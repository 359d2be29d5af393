//! Staging store abstraction
//!
//! This module defines the trait that staging backends must implement
//! to work with FactSync.

use crate::domain::{FactId, NewFact, PatientId, Result, SessionId, StagedFact, SyncStatus};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Per-status row counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    counts: BTreeMap<SyncStatus, u64>,
}

impl StatusCounts {
    /// Builds counts from `(status, count)` pairs
    pub fn from_pairs(pairs: impl IntoIterator<Item = (SyncStatus, u64)>) -> Self {
        let mut counts = BTreeMap::new();
        for (status, count) in pairs {
            *counts.entry(status).or_insert(0) += count;
        }
        Self { counts }
    }

    /// Count for one status (zero when absent)
    pub fn get(&self, status: SyncStatus) -> u64 {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Total rows across all statuses
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// All four statuses with their counts, in enum order
    pub fn iter(&self) -> impl Iterator<Item = (SyncStatus, u64)> + '_ {
        SyncStatus::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// Persistent queue of candidate facts
///
/// Rows are never deleted. Reads return rows ordered by `(created_at, id)`.
/// Status writes are guarded by [`SyncStatus::can_transition_to`]; the bulk
/// variant is all-or-nothing across the ids it is given.
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Backend name for logs
    fn backend_name(&self) -> &str;

    /// Test the backend connection
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn test_connection(&self) -> Result<()>;

    /// Ensure the schema exists, creating it if necessary
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert a new PENDING row and return its id
    async fn insert(&self, fact: NewFact) -> Result<FactId>;

    /// PENDING rows, optionally limited to one session
    async fn get_pending(&self, session: Option<&SessionId>) -> Result<Vec<StagedFact>>;

    /// SYNCED rows, optionally limited to one patient
    async fn get_synced(&self, patient: Option<&PatientId>) -> Result<Vec<StagedFact>>;

    /// Every row of a session regardless of status
    async fn get_by_session(&self, session: &SessionId) -> Result<Vec<StagedFact>>;

    /// Update one row's status
    ///
    /// `external_resource_id` replaces the stored value only when `Some`.
    ///
    /// # Errors
    ///
    /// Returns a `State` error if the row is missing or the transition is not
    /// allowed from its current status.
    async fn update_status(
        &self,
        id: FactId,
        status: SyncStatus,
        external_resource_id: Option<&str>,
    ) -> Result<()>;

    /// Update many rows in one transaction
    ///
    /// Either every id is updated or none is. An empty id list is a no-op.
    async fn bulk_update_status(
        &self,
        ids: &[FactId],
        status: SyncStatus,
        external_resource_id: Option<&str>,
    ) -> Result<u64>;

    /// Per-status counts, optionally limited to one session
    async fn status_counts(&self, session: Option<&SessionId>) -> Result<StatusCounts>;
}

/// Checks one transition and renders the standard rejection message
pub fn check_transition(id: FactId, from: SyncStatus, to: SyncStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(crate::domain::FactSyncError::State(format!(
            "Fact {id}: transition {from} -> {to} is not allowed"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_fill_missing_statuses() {
        let counts = StatusCounts::from_pairs([(SyncStatus::Pending, 3), (SyncStatus::Synced, 2)]);
        assert_eq!(counts.get(SyncStatus::Failed), 0);
        assert_eq!(counts.total(), 5);
        assert_eq!(counts.iter().count(), 4);
    }

    #[test]
    fn test_check_transition() {
        let id = FactId::new(1);
        assert!(check_transition(id, SyncStatus::Pending, SyncStatus::Synced).is_ok());
        let err = check_transition(id, SyncStatus::Synced, SyncStatus::Failed).unwrap_err();
        assert!(err.to_string().contains("SYNCED -> FAILED"));
    }
}
