//! Sync orchestrator - pull, prescreen, dedup, map, submit, reconcile
//!
//! One call to [`SyncOrchestrator::run`] walks a single linear pipeline:
//!
//! ```text
//! INIT -> PULLED -> PRESCREENED -> DEDUPED -> MAPPED -> SUBMITTED -> RECONCILED
//!   \________\___________\___________\_________\__________\______-> ABORTED
//! ```
//!
//! Two overlapping runs for the same session are not serialized here. Callers
//! must keep at most one run per session in flight.

use super::summary::{
    RowResult, RowRole, RunError, RunErrorKind, SyncPhase, SyncRunResult,
};
use crate::adapters::database::StagingStore;
use crate::adapters::fhir::{EntryResult, FhirSubmissionClient, ResourceSubmitter};
use crate::config::FactSyncConfig;
use crate::core::dedup::{deduplicate, DedupGroup, DedupOutcome};
use crate::core::mapping::{MappingOptions, ResourceMapper, ResourceMapping};
use crate::core::registry::CodeRegistry;
use crate::core::staging::StagingManager;
use crate::domain::{FactId, FactSyncError, PatientId, Result, SessionId, StagedFact, SyncStatus};
use crate::{log_error_with_context, log_sync_complete, log_sync_start};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one run
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Target-system patient id; blank aborts the run at INIT
    pub patient_id: String,
    pub session_id: Option<SessionId>,
    pub dry_run: bool,
}

impl SyncRequest {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            session_id: None,
            dry_run: false,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Sequences one sync run over the staging store and target system
pub struct SyncOrchestrator {
    staging: Arc<StagingManager>,
    mapper: Arc<dyn ResourceMapping>,
    submitter: Arc<dyn ResourceSubmitter>,
}

impl SyncOrchestrator {
    pub fn new(
        staging: Arc<StagingManager>,
        mapper: Arc<dyn ResourceMapping>,
        submitter: Arc<dyn ResourceSubmitter>,
    ) -> Self {
        Self {
            staging,
            mapper,
            submitter,
        }
    }

    /// Wires the registry mapper and FHIR submission client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &FactSyncConfig,
        store: Arc<dyn StagingStore>,
        registry: Arc<CodeRegistry>,
    ) -> Result<Self> {
        let staging = Arc::new(StagingManager::new(store, registry.clone()));
        let mapper = Arc::new(ResourceMapper::new(
            registry,
            MappingOptions::from(config.mapping.clone()),
        ));
        let submitter = Arc::new(FhirSubmissionClient::from_config(&config.target)?);
        Ok(Self::new(staging, mapper, submitter))
    }

    pub fn staging(&self) -> &Arc<StagingManager> {
        &self.staging
    }

    /// Execute one run
    ///
    /// Never returns an error: every failure ends as an ABORTED result with
    /// [`SyncRunResult::error`] set.
    pub async fn run(&self, request: SyncRequest) -> SyncRunResult {
        let started = Instant::now();
        let mut result = SyncRunResult::new(
            request.patient_id.clone(),
            request.session_id.clone(),
            request.dry_run,
        );

        log_sync_start!(
            result.run_id,
            request.patient_id,
            request.session_id.as_ref().map(|s| s.as_str())
        );

        if let Err(error) = self.execute(&request, &mut result).await {
            log_error_with_context!(&error, "Sync run aborted");
            result.phase = SyncPhase::Aborted;
            result.error = Some(error);
        }

        result.duration = started.elapsed();
        log_sync_complete!(
            result.run_id,
            result.counts.synced,
            result.counts.failed,
            result.duration
        );
        result.log_summary();
        result
    }

    async fn execute(
        &self,
        request: &SyncRequest,
        result: &mut SyncRunResult,
    ) -> std::result::Result<(), RunError> {
        // INIT
        let patient = PatientId::new(request.patient_id.as_str())
            .map_err(|e| RunError::new(RunErrorKind::ValidationRejection, e))?;

        // PULLED
        let pending = self
            .staging
            .get_pending(request.session_id.as_ref())
            .await
            .map_err(store_failure)?;
        result.phase = SyncPhase::Pulled;
        result.counts.pending = pending.len();

        if pending.is_empty() {
            tracing::info!(run_id = %result.run_id, "No pending rows, nothing to sync");
            result.phase = SyncPhase::Reconciled;
            return Ok(());
        }

        // PRESCREENED
        let (resolvable, rejected) = self.prescreen(pending);
        self.reject(&rejected, request.dry_run, result).await?;
        result.phase = SyncPhase::Prescreened;

        if resolvable.is_empty() {
            result.phase = SyncPhase::Reconciled;
            return Ok(());
        }

        // DEDUPED
        let outcome = deduplicate(self.staging.registry(), resolvable);
        result.counts.duplicate = outcome.duplicate_count();
        result.phase = SyncPhase::Deduped;
        tracing::info!(
            run_id = %result.run_id,
            champions = outcome.champion_count(),
            duplicates = outcome.duplicate_count(),
            "Deduplicated pending rows"
        );

        // MAPPED
        let champions = outcome.champions();
        let bundle = match self.mapper.map_champions(&champions, &patient, Utc::now()) {
            Ok(bundle) if bundle.len() == champions.len() => bundle,
            Ok(bundle) => {
                let message = format!(
                    "Mapper produced {} entries for {} champions",
                    bundle.len(),
                    champions.len()
                );
                return Err(self
                    .fail_mapping(&outcome, message, request.dry_run, result)
                    .await);
            }
            Err(e) => {
                return Err(self
                    .fail_mapping(&outcome, e.to_string(), request.dry_run, result)
                    .await);
            }
        };
        result.counts.mapped = bundle.len();
        result.phase = SyncPhase::Mapped;

        if request.dry_run {
            tracing::info!(
                run_id = %result.run_id,
                entries = bundle.len(),
                "Dry run: skipping submission and status writes"
            );
            for group in &outcome.groups {
                record_group(result, group, SyncStatus::Pending, None, None, None);
            }
            return Ok(());
        }

        // SUBMITTED
        self.submitter.prepare().await.map_err(|e| {
            RunError::new(RunErrorKind::AuthFailure, format!("Authentication failed: {e}"))
        })?;

        let report = self.submitter.submit_bundle(&bundle).await;
        if report.results.len() != outcome.groups.len() {
            return Err(RunError::new(
                RunErrorKind::Internal,
                format!(
                    "Submission returned {} results for {} entries",
                    report.results.len(),
                    outcome.groups.len()
                ),
            ));
        }
        result.phase = SyncPhase::Submitted;

        // RECONCILED
        for (group, entry) in outcome.groups.iter().zip(&report.results) {
            self.reconcile_group(group, entry, result).await?;
        }
        result.phase = SyncPhase::Reconciled;

        if report.failed > 0 {
            tracing::warn!(
                run_id = %result.run_id,
                failed = report.failed,
                succeeded = report.succeeded,
                "Some entries were rejected by the target system"
            );
        }
        Ok(())
    }

    /// Splits rows into resolvable and rejected-with-reason
    fn prescreen(&self, rows: Vec<StagedFact>) -> (Vec<StagedFact>, Vec<(StagedFact, String)>) {
        let registry = self.staging.registry();
        let mut resolvable = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for row in rows {
            if row.value().is_empty() {
                rejected.push((row, "empty marker value".to_string()));
            } else if registry.resolve(&row.marker_name).is_none() {
                let reason = format!("unknown marker '{}'", row.marker_name);
                rejected.push((row, reason));
            } else {
                resolvable.push(row);
            }
        }

        (resolvable, rejected)
    }

    async fn reject(
        &self,
        rejected: &[(StagedFact, String)],
        dry_run: bool,
        result: &mut SyncRunResult,
    ) -> std::result::Result<(), RunError> {
        if rejected.is_empty() {
            return Ok(());
        }

        let status = if dry_run {
            SyncStatus::Pending
        } else {
            let ids: Vec<FactId> = rejected.iter().map(|(row, _)| row.id).collect();
            self.staging
                .store()
                .bulk_update_status(&ids, SyncStatus::Failed, None)
                .await
                .map_err(store_failure)?;
            result.counts.failed += ids.len();
            SyncStatus::Failed
        };

        for (row, reason) in rejected {
            tracing::warn!(
                fact_id = %row.id,
                marker = %row.marker_name,
                reason = %reason,
                "Row rejected at prescreen"
            );
            result.rows.push(RowResult {
                row_id: row.id,
                marker_name: row.marker_name.clone(),
                status,
                role: RowRole::Rejected,
                error_kind: Some(RunErrorKind::ValidationRejection),
                reason: Some(reason.clone()),
                external_id: None,
                http_status: None,
                champion_id: None,
            });
        }
        result.counts.skipped += rejected.len();
        Ok(())
    }

    /// Marks every resolvable row FAILED and builds the run error
    async fn fail_mapping(
        &self,
        outcome: &DedupOutcome,
        message: String,
        dry_run: bool,
        result: &mut SyncRunResult,
    ) -> RunError {
        let reason = format!("mapping failed: {message}");

        if !dry_run {
            let ids = outcome.all_ids();
            if let Err(e) = self
                .staging
                .store()
                .bulk_update_status(&ids, SyncStatus::Failed, None)
                .await
            {
                return store_failure(e);
            }
            result.counts.failed += ids.len();
        }

        let status = if dry_run {
            SyncStatus::Pending
        } else {
            SyncStatus::Failed
        };
        for group in &outcome.groups {
            record_group(
                result,
                group,
                status,
                None,
                None,
                Some((RunErrorKind::MappingFailure, reason.as_str())),
            );
        }

        RunError::new(RunErrorKind::MappingFailure, message)
    }

    async fn reconcile_group(
        &self,
        group: &DedupGroup,
        entry: &EntryResult,
        result: &mut SyncRunResult,
    ) -> std::result::Result<(), RunError> {
        let store = self.staging.store();
        let duplicate_ids = group.duplicate_ids();
        let http_status = Some(entry.http_status);

        if entry.success {
            let external_id = entry.fhir_id.as_deref();
            store
                .update_status(group.champion.id, SyncStatus::Synced, external_id)
                .await
                .map_err(store_failure)?;
            store
                .bulk_update_status(&duplicate_ids, SyncStatus::Superseded, external_id)
                .await
                .map_err(store_failure)?;

            result.counts.synced += 1;
            result.counts.superseded += duplicate_ids.len();
            record_group(result, group, SyncStatus::Synced, external_id, http_status, None);
        } else {
            store
                .update_status(group.champion.id, SyncStatus::Failed, None)
                .await
                .map_err(store_failure)?;
            store
                .bulk_update_status(&duplicate_ids, SyncStatus::Failed, None)
                .await
                .map_err(store_failure)?;

            result.counts.failed += group.member_count();
            let reason = entry
                .error
                .clone()
                .unwrap_or_else(|| "submission failed".to_string());
            record_group(
                result,
                group,
                SyncStatus::Failed,
                None,
                http_status,
                Some((RunErrorKind::SubmissionFailure, reason.as_str())),
            );
        }
        Ok(())
    }
}

/// Appends row results for a champion and its duplicates
///
/// Duplicates follow their champion: SUPERSEDED when it is SYNCED, otherwise
/// the champion's status.
fn record_group(
    result: &mut SyncRunResult,
    group: &DedupGroup,
    champion_status: SyncStatus,
    external_id: Option<&str>,
    http_status: Option<u16>,
    failure: Option<(RunErrorKind, &str)>,
) {
    let error_kind = failure.map(|(kind, _)| kind);
    let reason = failure.map(|(_, reason)| reason.to_string());

    let duplicate_status = match champion_status {
        SyncStatus::Synced => SyncStatus::Superseded,
        other => other,
    };

    result.rows.push(RowResult {
        row_id: group.champion.id,
        marker_name: group.champion.marker_name.clone(),
        status: champion_status,
        role: RowRole::Champion,
        error_kind,
        reason: reason.clone(),
        external_id: external_id.map(str::to_string),
        http_status,
        champion_id: None,
    });

    for duplicate in &group.duplicates {
        result.rows.push(RowResult {
            row_id: duplicate.id,
            marker_name: duplicate.marker_name.clone(),
            status: duplicate_status,
            role: RowRole::Duplicate,
            error_kind,
            reason: reason.clone(),
            external_id: external_id.map(str::to_string),
            http_status: None,
            champion_id: Some(group.champion.id),
        });
    }
}

fn store_failure(error: FactSyncError) -> RunError {
    RunError::new(RunErrorKind::StoreFailure, error.to_string())
}
