//! PostgreSQL adapter implementing the staging store trait

use crate::adapters::database::traits::{check_transition, StagingStore, StatusCounts};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{PostgreSQLStagedFact, STAGED_FACT_COLUMNS};
use crate::domain::{
    FactId, FactSyncError, NewFact, PatientId, Result, SessionId, StagedFact, SyncStatus,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio_postgres::Row;

/// PostgreSQL implementation of [`StagingStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    /// Create a new PostgreSQL adapter
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL adapter with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }

    async fn select(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<StagedFact>> {
        let query = format!(
            "SELECT {STAGED_FACT_COLUMNS} FROM staged_facts WHERE {filter} ORDER BY created_at, id"
        );
        let rows = self.client.query(&query, params).await?;
        rows_to_facts(&rows)
    }
}

fn rows_to_facts(rows: &[Row]) -> Result<Vec<StagedFact>> {
    rows.iter()
        .map(|row| PostgreSQLStagedFact::from_row(row)?.into_domain())
        .collect()
}

fn db_err(context: &str) -> impl Fn(tokio_postgres::Error) -> FactSyncError + '_ {
    move |e| FactSyncError::Database(format!("{context}: {e}"))
}

#[async_trait]
impl StagingStore for PostgreSQLAdapter {
    fn backend_name(&self) -> &str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn insert(&self, fact: NewFact) -> Result<FactId> {
        let patient_id = fact.patient_id.as_ref().map(|p| p.as_str());
        let page_number = fact
            .page_number
            .map(i32::try_from)
            .transpose()
            .map_err(|e| FactSyncError::Validation(format!("page_number out of range: {e}")))?;

        let row = self
            .client
            .query_one(
                r#"
                INSERT INTO staged_facts (
                    session_id, patient_id, marker_name, marker_value, raw_text,
                    source_file, page_number, element_type, confidence, sync_status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'PENDING')
                RETURNING id
                "#,
                &[
                    &fact.session_id.as_str(),
                    &patient_id,
                    &fact.marker_name,
                    &fact.marker_value,
                    &fact.raw_text,
                    &fact.source_file,
                    &page_number,
                    &fact.element_type,
                    &fact.confidence,
                ],
            )
            .await?;

        let id: i64 = row
            .try_get("id")
            .map_err(db_err("Failed to read inserted id"))?;

        tracing::debug!(
            fact_id = id,
            session_id = %fact.session_id,
            marker = %fact.marker_name,
            "Fact staged"
        );
        Ok(FactId::new(id))
    }

    async fn get_pending(&self, session: Option<&SessionId>) -> Result<Vec<StagedFact>> {
        let session = session.map(|s| s.as_str());
        self.select(
            "sync_status = 'PENDING' AND ($1::TEXT IS NULL OR session_id = $1)",
            &[&session],
        )
        .await
    }

    async fn get_synced(&self, patient: Option<&PatientId>) -> Result<Vec<StagedFact>> {
        let patient = patient.map(|p| p.as_str());
        self.select(
            "sync_status = 'SYNCED' AND ($1::TEXT IS NULL OR patient_id = $1)",
            &[&patient],
        )
        .await
    }

    async fn get_by_session(&self, session: &SessionId) -> Result<Vec<StagedFact>> {
        self.select("session_id = $1", &[&session.as_str()]).await
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

        let unique: BTreeSet<i64> = ids.iter().map(|id| id.value()).collect();
        let raw_ids: Vec<i64> = unique.iter().copied().collect();

        let mut conn = self.client.get_connection().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(db_err("Failed to begin transaction"))?;

        // Lock and validate every row before writing any of them
        let current = tx
            .query(
                "SELECT id, sync_status FROM staged_facts WHERE id = ANY($1) FOR UPDATE",
                &[&raw_ids],
            )
            .await
            .map_err(db_err("Failed to lock staging rows"))?;

        let mut statuses = HashMap::with_capacity(current.len());
        for row in &current {
            let id: i64 = row.try_get("id").map_err(db_err("Failed to read id"))?;
            let raw: String = row
                .try_get("sync_status")
                .map_err(db_err("Failed to read sync_status"))?;
            let parsed: SyncStatus = raw.parse().map_err(FactSyncError::Database)?;
            statuses.insert(id, parsed);
        }

        for id in &raw_ids {
            let from = statuses
                .get(id)
                .copied()
                .ok_or_else(|| FactSyncError::State(format!("Fact {id} does not exist")))?;
            check_transition(FactId::new(*id), from, status)?;
        }

        let updated = tx
            .execute(
                r#"
                UPDATE staged_facts
                SET sync_status = $1,
                    external_resource_id = COALESCE($2, external_resource_id),
                    updated_at = NOW()
                WHERE id = ANY($3)
                "#,
                &[&status.as_str(), &external_resource_id, &raw_ids],
            )
            .await
            .map_err(db_err("Failed to update staging rows"))?;

        if updated != raw_ids.len() as u64 {
            // Dropping the transaction rolls it back
            return Err(FactSyncError::State(format!(
                "Expected to update {} rows to {status}, updated {updated}",
                raw_ids.len()
            )));
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit status update"))?;

        tracing::debug!(count = updated, status = %status, "Staging rows updated");
        Ok(updated)
    }

    async fn status_counts(&self, session: Option<&SessionId>) -> Result<StatusCounts> {
        let session = session.map(|s| s.as_str());
        let rows = self
            .client
            .query(
                r#"
                SELECT sync_status, COUNT(*) AS total
                FROM staged_facts
                WHERE ($1::TEXT IS NULL OR session_id = $1)
                GROUP BY sync_status
                "#,
                &[&session],
            )
            .await?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row
                .try_get("sync_status")
                .map_err(db_err("Failed to read sync_status"))?;
            let total: i64 = row.try_get("total").map_err(db_err("Failed to read count"))?;
            let status: SyncStatus = raw.parse().map_err(FactSyncError::Database)?;
            pairs.push((status, u64::try_from(total).unwrap_or(0)));
        }

        Ok(StatusCounts::from_pairs(pairs))
    }
}
