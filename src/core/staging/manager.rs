//! Staging manager
//!
//! Wraps a [`StagingStore`] with the registry-aware operations that sit on
//! top of plain row storage: the read interface used by "what is already
//! known" comparisons, per-status summaries, and the two explicit
//! compensation operations.

use crate::adapters::database::traits::{StagingStore, StatusCounts};
use crate::core::dedup::{deduplicate, DedupKey, DedupOutcome};
use crate::core::registry::CodeRegistry;
use crate::domain::{
    FactId, NewFact, PatientId, Result, SessionId, StagedFact, SyncStatus,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a compensation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromotionSummary {
    /// Champions moved to SYNCED
    pub synced: usize,
    /// Duplicates moved to SUPERSEDED
    pub superseded: usize,
}

impl PromotionSummary {
    /// Rows changed in total
    pub fn total(&self) -> usize {
        self.synced + self.superseded
    }
}

/// Candidates partitioned against previously synced rows
#[derive(Debug, Clone, Default)]
pub struct KnownSplit {
    /// Candidates with no SYNCED counterpart for the patient
    pub new: Vec<StagedFact>,
    /// Candidates whose (code, value) key is already SYNCED for the patient
    pub known: Vec<StagedFact>,
}

/// Registry-aware facade over a staging store
pub struct StagingManager {
    store: Arc<dyn StagingStore>,
    registry: Arc<CodeRegistry>,
}

impl StagingManager {
    /// Create a new staging manager
    pub fn new(store: Arc<dyn StagingStore>, registry: Arc<CodeRegistry>) -> Self {
        Self { store, registry }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn StagingStore> {
        &self.store
    }

    /// The registry used for grouping
    pub fn registry(&self) -> &Arc<CodeRegistry> {
        &self.registry
    }

    /// Stage a new fact
    pub async fn insert(&self, fact: NewFact) -> Result<FactId> {
        self.store.insert(fact).await
    }

    /// PENDING rows, optionally for one session
    pub async fn get_pending(&self, session: Option<&SessionId>) -> Result<Vec<StagedFact>> {
        self.store.get_pending(session).await
    }

    /// SYNCED rows, optionally for one patient
    pub async fn get_synced(&self, patient: Option<&PatientId>) -> Result<Vec<StagedFact>> {
        self.store.get_synced(patient).await
    }

    /// Every row of a session
    pub async fn get_by_session(&self, session: &SessionId) -> Result<Vec<StagedFact>> {
        self.store.get_by_session(session).await
    }

    /// Per-status counts
    pub async fn status_counts(&self, session: Option<&SessionId>) -> Result<StatusCounts> {
        self.store.status_counts(session).await
    }

    /// Partition candidates into already-synced and new for a patient
    ///
    /// Keys are compared the same way the deduplicator groups rows, so
    /// "ER positive" and "ER Status  Positive" count as the same fact.
    pub async fn split_known(
        &self,
        patient: &PatientId,
        candidates: Vec<StagedFact>,
    ) -> Result<KnownSplit> {
        let synced = self.store.get_synced(Some(patient)).await?;
        let synced_keys: HashSet<DedupKey> = synced
            .iter()
            .map(|row| DedupKey::for_fact(&self.registry, row))
            .collect();

        let (known, new): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|c| synced_keys.contains(&DedupKey::for_fact(&self.registry, c)));

        tracing::info!(
            patient_id = %patient,
            new = new.len(),
            known = known.len(),
            "Compared candidates against synced rows"
        );

        Ok(KnownSplit { new, known })
    }

    /// Promote a session's FAILED rows, treating the local store as authoritative
    ///
    /// Intended for deployments whose target write path is known to be
    /// unavailable. Never called by the sync path.
    pub async fn promote_failed_to_synced(&self, session: &SessionId) -> Result<PromotionSummary> {
        self.promote(session, SyncStatus::Failed).await
    }

    /// Promote a session's PENDING rows without contacting the target system
    pub async fn promote_pending_to_synced(
        &self,
        session: &SessionId,
    ) -> Result<PromotionSummary> {
        self.promote(session, SyncStatus::Pending).await
    }

    async fn promote(&self, session: &SessionId, from: SyncStatus) -> Result<PromotionSummary> {
        let rows: Vec<StagedFact> = self
            .store
            .get_by_session(session)
            .await?
            .into_iter()
            .filter(|row| row.sync_status == from)
            .collect();

        if rows.is_empty() {
            tracing::info!(session_id = %session, from = %from, "No rows to promote");
            return Ok(PromotionSummary::default());
        }

        let outcome = deduplicate(&self.registry, rows);
        let (champion_ids, duplicate_ids) = split_roles(&outcome);

        let synced = self
            .store
            .bulk_update_status(&champion_ids, SyncStatus::Synced, None)
            .await? as usize;
        let superseded = self
            .store
            .bulk_update_status(&duplicate_ids, SyncStatus::Superseded, None)
            .await? as usize;

        tracing::warn!(
            session_id = %session,
            from = %from,
            synced,
            superseded,
            "Promoted rows to SYNCED without target confirmation"
        );

        Ok(PromotionSummary { synced, superseded })
    }
}

fn split_roles(outcome: &DedupOutcome) -> (Vec<FactId>, Vec<FactId>) {
    let champions = outcome.groups.iter().map(|g| g.champion.id).collect();
    let duplicates = outcome
        .groups
        .iter()
        .flat_map(|g| g.duplicate_ids())
        .collect();
    (champions, duplicates)
}
