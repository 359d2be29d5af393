//! Sync run results and reporting

use crate::domain::{FactId, SessionId, SyncStatus};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Pipeline phase reached by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncPhase {
    Init,
    Pulled,
    Prescreened,
    Deduped,
    Mapped,
    Submitted,
    /// Terminal success
    Reconciled,
    /// Terminal failure
    Aborted,
}

impl SyncPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Reconciled | SyncPhase::Aborted)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Init => "INIT",
            SyncPhase::Pulled => "PULLED",
            SyncPhase::Prescreened => "PRESCREENED",
            SyncPhase::Deduped => "DEDUPED",
            SyncPhase::Mapped => "MAPPED",
            SyncPhase::Submitted => "SUBMITTED",
            SyncPhase::Reconciled => "RECONCILED",
            SyncPhase::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Part a row played in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowRole {
    /// Removed at prescreen (empty value or unknown marker)
    Rejected,
    Champion,
    Duplicate,
}

/// What happened to one staging row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowResult {
    pub row_id: FactId,
    pub marker_name: String,
    /// Status after the run (PENDING when nothing was written)
    pub status: SyncStatus,
    pub role: RowRole,
    /// Failure class when the row was rejected or failed
    pub error_kind: Option<RunErrorKind>,
    pub reason: Option<String>,
    pub external_id: Option<String>,
    pub http_status: Option<u16>,
    /// Champion this duplicate followed
    pub champion_id: Option<FactId>,
}

/// Error classes surfaced through [`SyncRunResult::error`] and per row
///
/// `ValidationRejection` and `SubmissionFailure` only ever appear on rows;
/// they never abort a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    ValidationRejection,
    MappingFailure,
    AuthFailure,
    SubmissionFailure,
    StoreFailure,
    Internal,
}

/// Run-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunError {
    pub kind: RunErrorKind,
    pub message: String,
}

impl RunError {
    pub fn new(kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Row counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    /// PENDING rows pulled
    pub pending: usize,
    /// Bundle entries built
    pub mapped: usize,
    /// Non-champion group members
    pub duplicate: usize,
    /// Rows rejected at prescreen
    pub skipped: usize,
    pub synced: usize,
    pub superseded: usize,
    pub failed: usize,
}

/// Result of one sync run
///
/// Runs never return `Err`; failures are reported through `phase` and `error`.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRunResult {
    pub run_id: Uuid,
    pub patient_id: String,
    pub session_id: Option<SessionId>,
    pub dry_run: bool,
    pub phase: SyncPhase,
    pub counts: SyncCounts,
    pub rows: Vec<RowResult>,
    pub error: Option<RunError>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(duration.as_millis() as u64)
}

impl SyncRunResult {
    pub fn new(patient_id: impl Into<String>, session_id: Option<SessionId>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            session_id,
            dry_run,
            phase: SyncPhase::Init,
            counts: SyncCounts::default(),
            rows: Vec::new(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    /// True when the run reached its terminal success phase without a run error
    ///
    /// Individual rows may still have FAILED.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.phase != SyncPhase::Aborted
    }

    /// Whether any row ended FAILED
    pub fn has_failed_rows(&self) -> bool {
        self.counts.failed > 0
    }

    /// Rows with the given role
    pub fn rows_with_role(&self, role: RowRole) -> impl Iterator<Item = &RowResult> {
        self.rows.iter().filter(move |row| row.role == role)
    }

    /// Result for one row id
    pub fn row(&self, id: FactId) -> Option<&RowResult> {
        self.rows.iter().find(|row| row.row_id == id)
    }

    /// Percentage of champions created in the target system
    pub fn success_rate(&self) -> f64 {
        let attempted = self.counts.mapped;
        if attempted == 0 {
            return 100.0;
        }
        let champions_synced = self
            .rows
            .iter()
            .filter(|r| r.role == RowRole::Champion && r.status == SyncStatus::Synced)
            .count();
        (champions_synced as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            phase = %self.phase,
            dry_run = self.dry_run,
            pending = self.counts.pending,
            mapped = self.counts.mapped,
            duplicate = self.counts.duplicate,
            skipped = self.counts.skipped,
            synced = self.counts.synced,
            superseded = self.counts.superseded,
            failed = self.counts.failed,
            duration_ms = self.duration.as_millis() as u64,
            success_rate = format!("{:.2}%", self.success_rate()),
            "Sync run summary"
        );

        if let Some(error) = &self.error {
            tracing::error!(
                run_id = %self.run_id,
                kind = ?error.kind,
                error = %error.message,
                "Sync run aborted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, role: RowRole, status: SyncStatus) -> RowResult {
        RowResult {
            row_id: FactId::new(id),
            marker_name: "ER".to_string(),
            status,
            role,
            error_kind: None,
            reason: None,
            external_id: None,
            http_status: None,
            champion_id: None,
        }
    }

    #[test]
    fn test_success_rate_counts_champions_only() {
        let mut result = SyncRunResult::new("p", None, false);
        result.counts.mapped = 2;
        result.rows = vec![
            row(1, RowRole::Champion, SyncStatus::Synced),
            row(2, RowRole::Duplicate, SyncStatus::Superseded),
            row(3, RowRole::Champion, SyncStatus::Failed),
        ];
        assert_eq!(result.success_rate(), 50.0);
        assert_eq!(result.rows_with_role(RowRole::Champion).count(), 2);
        assert_eq!(result.row(FactId::new(2)).unwrap().role, RowRole::Duplicate);
    }

    #[test]
    fn test_empty_run_is_full_success() {
        let result = SyncRunResult::new("p", None, false);
        assert_eq!(result.success_rate(), 100.0);
        assert!(result.is_success());
    }

    #[test]
    fn test_serialized_shape() {
        let mut result = SyncRunResult::new("p", None, true);
        result.phase = SyncPhase::Aborted;
        result.error = Some(RunError::new(RunErrorKind::AuthFailure, "denied"));
        result.duration = Duration::from_millis(1500);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["phase"], "ABORTED");
        assert_eq!(json["error"]["kind"], "auth_failure");
        assert_eq!(json["duration_ms"], 1500);
        assert!(!result.is_success());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SyncPhase::Prescreened.to_string(), "PRESCREENED");
        assert!(SyncPhase::Aborted.is_terminal());
        assert!(!SyncPhase::Mapped.is_terminal());
    }
}
