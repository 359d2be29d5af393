//! Staged clinical facts and their sync status state machine
//!
//! A [`StagedFact`] is one row of the staging queue. Rows are created from a
//! validated [`NewFact`] and afterwards only their status, external resource
//! id and `updated_at` ever change.

use super::ids::{FactId, PatientId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of characters kept from a provenance excerpt
pub const MAX_RAW_TEXT_CHARS: usize = 500;

/// Synchronization status of a staging row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Waiting for the next sync run
    Pending,
    /// Created in the target system
    Synced,
    /// Rejected or not accepted by the target system
    Failed,
    /// Duplicate of a row that reached SYNCED
    Superseded,
}

impl SyncStatus {
    /// All persisted status values
    pub const ALL: [SyncStatus; 4] = [
        SyncStatus::Pending,
        SyncStatus::Synced,
        SyncStatus::Failed,
        SyncStatus::Superseded,
    ];

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Synced => "SYNCED",
            SyncStatus::Failed => "FAILED",
            SyncStatus::Superseded => "SUPERSEDED",
        }
    }

    /// SYNCED and SUPERSEDED rows never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Synced | SyncStatus::Superseded)
    }

    /// Statuses a row may hold immediately before moving to `self`
    ///
    /// Nothing returns to PENDING. FAILED may only move forward to
    /// SUPERSEDED, or to SYNCED through the explicit compensation path.
    pub fn allowed_sources(&self) -> &'static [SyncStatus] {
        match self {
            SyncStatus::Pending => &[],
            SyncStatus::Synced => &[SyncStatus::Pending, SyncStatus::Failed],
            SyncStatus::Failed => &[SyncStatus::Pending],
            SyncStatus::Superseded => &[SyncStatus::Pending, SyncStatus::Failed],
        }
    }

    /// Whether a row currently in `self` may be moved to `next`
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        next.allowed_sources().contains(self)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SyncStatus::Pending),
            "SYNCED" => Ok(SyncStatus::Synced),
            "FAILED" => Ok(SyncStatus::Failed),
            "SUPERSEDED" => Ok(SyncStatus::Superseded),
            other => Err(format!(
                "Invalid sync status '{other}'. Must be one of: PENDING, SYNCED, FAILED, SUPERSEDED"
            )),
        }
    }
}

/// A candidate fact as handed over by the extractor, validated but not yet stored
///
/// Construction enforces the inbound contract: `raw_text` must be non-empty
/// and is capped at [`MAX_RAW_TEXT_CHARS`], confidence is clamped to
/// `[0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use factsync::domain::fact::NewFact;
/// use factsync::domain::ids::SessionId;
///
/// let fact = NewFact::new(
///     SessionId::new("sess-1").unwrap(),
///     "Temp",
///     "38.5",
///     "Temp 38.5 C recorded at triage",
/// )
/// .unwrap()
/// .with_confidence(1.7);
///
/// assert_eq!(fact.confidence, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFact {
    pub session_id: SessionId,
    pub patient_id: Option<PatientId>,
    pub marker_name: String,
    pub marker_value: String,
    pub raw_text: String,
    pub source_file: Option<String>,
    pub page_number: Option<u32>,
    pub element_type: Option<String>,
    pub confidence: f64,
}

impl NewFact {
    /// Creates a new fact with default provenance metadata
    ///
    /// # Errors
    ///
    /// Returns an error if `raw_text` is blank or `marker_name` is blank.
    pub fn new(
        session_id: SessionId,
        marker_name: impl Into<String>,
        marker_value: impl Into<String>,
        raw_text: impl AsRef<str>,
    ) -> crate::domain::Result<Self> {
        let marker_name = marker_name.into();
        if marker_name.trim().is_empty() {
            return Err(crate::domain::FactSyncError::Validation(
                "marker_name cannot be empty".to_string(),
            ));
        }

        let raw_text = raw_text.as_ref().trim();
        if raw_text.is_empty() {
            return Err(crate::domain::FactSyncError::Validation(format!(
                "raw_text cannot be empty (marker '{marker_name}')"
            )));
        }

        Ok(Self {
            session_id,
            patient_id: None,
            marker_name,
            marker_value: marker_value.into(),
            raw_text: truncate_chars(raw_text, MAX_RAW_TEXT_CHARS),
            source_file: None,
            page_number: None,
            element_type: None,
            confidence: 1.0,
        })
    }

    /// Sets the patient the fact was extracted for
    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    /// Sets the source document name
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Sets the page the excerpt came from
    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Sets the layout element type (paragraph, table, ...)
    pub fn with_element_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    /// Sets the extractor confidence, clamped to `[0.0, 1.0]`
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }
}

/// One persisted staging row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedFact {
    pub id: FactId,
    pub session_id: SessionId,
    pub patient_id: Option<PatientId>,
    pub marker_name: String,
    pub marker_value: String,
    pub raw_text: String,
    pub source_file: Option<String>,
    pub page_number: Option<u32>,
    pub element_type: Option<String>,
    pub confidence: f64,
    pub sync_status: SyncStatus,
    pub external_resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StagedFact {
    /// Materializes a stored row from a validated fact
    pub fn from_new(id: FactId, fact: NewFact, now: DateTime<Utc>) -> Self {
        Self {
            id,
            session_id: fact.session_id,
            patient_id: fact.patient_id,
            marker_name: fact.marker_name,
            marker_value: fact.marker_value,
            raw_text: fact.raw_text,
            source_file: fact.source_file,
            page_number: fact.page_number,
            element_type: fact.element_type,
            confidence: fact.confidence,
            sync_status: SyncStatus::Pending,
            external_resource_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Trimmed marker value
    pub fn value(&self) -> &str {
        self.marker_value.trim()
    }

    /// Length of the provenance excerpt in characters
    pub fn raw_text_len(&self) -> usize {
        self.raw_text.chars().count()
    }
}

/// Clamps a confidence score into `[0.0, 1.0]`, mapping NaN to 0.0
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Truncates to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::new("sess-1").unwrap()
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in SyncStatus::ALL {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_rejects_unknown_values() {
        assert!("DONE".parse::<SyncStatus>().is_err());
        assert!("pending".parse::<SyncStatus>().is_err());
        assert!("".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn test_status_serde_uses_storage_names() {
        let json = serde_json::to_string(&SyncStatus::Superseded).unwrap();
        assert_eq!(json, "\"SUPERSEDED\"");
        assert!(serde_json::from_str::<SyncStatus>("\"ARCHIVED\"").is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(SyncStatus::Pending.can_transition_to(SyncStatus::Synced));
        assert!(SyncStatus::Pending.can_transition_to(SyncStatus::Failed));
        assert!(SyncStatus::Pending.can_transition_to(SyncStatus::Superseded));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Superseded));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Synced));

        assert!(!SyncStatus::Synced.can_transition_to(SyncStatus::Failed));
        assert!(!SyncStatus::Superseded.can_transition_to(SyncStatus::Synced));
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Pending));
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Failed));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SyncStatus::Synced.is_terminal());
        assert!(SyncStatus::Superseded.is_terminal());
        assert!(!SyncStatus::Failed.is_terminal());
        assert!(!SyncStatus::Pending.is_terminal());
    }

    #[test]
    fn test_new_fact_requires_raw_text() {
        assert!(NewFact::new(session(), "ER", "positive", "   ").is_err());
        assert!(NewFact::new(session(), " ", "positive", "ER positive").is_err());
    }

    #[test]
    fn test_new_fact_caps_raw_text() {
        let long = "é".repeat(MAX_RAW_TEXT_CHARS + 25);
        let fact = NewFact::new(session(), "PT Note", "", long).unwrap();
        assert_eq!(fact.raw_text.chars().count(), MAX_RAW_TEXT_CHARS);
    }

    #[test]
    fn test_new_fact_clamps_confidence() {
        let base = NewFact::new(session(), "ER", "positive", "ER: positive").unwrap();
        assert_eq!(base.clone().with_confidence(-0.3).confidence, 0.0);
        assert_eq!(base.clone().with_confidence(0.42).confidence, 0.42);
        assert_eq!(base.with_confidence(f64::NAN).confidence, 0.0);
    }

    #[test]
    fn test_staged_fact_from_new_starts_pending() {
        let now = Utc::now();
        let fact = NewFact::new(session(), "ER", " positive ", "ER: positive")
            .unwrap()
            .with_page_number(3);
        let row = StagedFact::from_new(FactId::new(1), fact, now);

        assert_eq!(row.sync_status, SyncStatus::Pending);
        assert_eq!(row.value(), "positive");
        assert_eq!(row.page_number, Some(3));
        assert_eq!(row.created_at, row.updated_at);
        assert!(row.external_resource_id.is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("°C°C", 2), "°C");
    }
}
