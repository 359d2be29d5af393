//! In-memory staging store
//!
//! Backs the `memory` staging backend and the test suites. All rows live in a
//! single vector behind an async lock, so every write is atomic with respect
//! to every other operation on the same store.

use crate::adapters::database::traits::{check_transition, StagingStore, StatusCounts};
use crate::domain::{
    FactId, FactSyncError, NewFact, PatientId, Result, SessionId, StagedFact, SyncStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<StagedFact>,
    next_id: i64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Wall clock, never earlier than the previous write
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(now);
        now
    }

    fn position(&self, id: FactId) -> Result<usize> {
        self.rows
            .iter()
            .position(|row| row.id == id)
            .ok_or_else(|| FactSyncError::State(format!("Fact {id} not found")))
    }
}

/// Staging store held entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryStagingStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStagingStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one row, for tests and diagnostics
    pub async fn get(&self, id: FactId) -> Option<StagedFact> {
        let state = self.state.read().await;
        state.rows.iter().find(|row| row.id == id).cloned()
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    /// True when nothing has been inserted
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.rows.is_empty()
    }

    async fn select<F>(&self, predicate: F) -> Vec<StagedFact>
    where
        F: Fn(&StagedFact) -> bool + Send,
    {
        let state = self.state.read().await;
        let mut rows: Vec<StagedFact> = state.rows.iter().filter(|r| predicate(r)).cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        rows
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, fact: NewFact) -> Result<FactId> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = FactId::new(state.next_id);
        let now = state.tick();
        state.rows.push(StagedFact::from_new(id, fact, now));

        tracing::debug!(fact_id = %id, "Fact staged in memory");
        Ok(id)
    }

    async fn get_pending(&self, session: Option<&SessionId>) -> Result<Vec<StagedFact>> {
        Ok(self
            .select(|row| {
                row.sync_status == SyncStatus::Pending
                    && session.map_or(true, |s| &row.session_id == s)
            })
            .await)
    }

    async fn get_synced(&self, patient: Option<&PatientId>) -> Result<Vec<StagedFact>> {
        Ok(self
            .select(|row| {
                row.sync_status == SyncStatus::Synced
                    && patient.map_or(true, |p| row.patient_id.as_ref() == Some(p))
            })
            .await)
    }

    async fn get_by_session(&self, session: &SessionId) -> Result<Vec<StagedFact>> {
        Ok(self.select(|row| &row.session_id == session).await)
    }

    async fn update_status(
        &self,
        id: FactId,
        status: SyncStatus,
        external_resource_id: Option<&str>,
    ) -> Result<()> {
        self.bulk_update_status(&[id], status, external_resource_id)
            .await
            .map(|_| ())
    }

    async fn bulk_update_status(
        &self,
        ids: &[FactId],
        status: SyncStatus,
        external_resource_id: Option<&str>,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.write().await;

        // Validate every id before touching any row
        let mut positions = Vec::with_capacity(ids.len());
        for id in ids {
            let pos = state.position(*id)?;
            check_transition(*id, state.rows[pos].sync_status, status)?;
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }

        let now = state.tick();
        for pos in &positions {
            let row = &mut state.rows[*pos];
            row.sync_status = status;
            if let Some(external) = external_resource_id {
                row.external_resource_id = Some(external.to_string());
            }
            row.updated_at = now;
        }

        tracing::debug!(
            count = positions.len(),
            status = %status,
            "Staging rows updated in memory"
        );
        Ok(positions.len() as u64)
    }

    async fn status_counts(&self, session: Option<&SessionId>) -> Result<StatusCounts> {
        let state = self.state.read().await;
        Ok(StatusCounts::from_pairs(
            state
                .rows
                .iter()
                .filter(|row| session.map_or(true, |s| &row.session_id == s))
                .map(|row| (row.sync_status, 1)),
        ))
    }
}
