//! PostgreSQL row models
//!
//! Maps `staged_facts` rows to and from the domain [`StagedFact`].

use crate::domain::{FactId, FactSyncError, PatientId, Result, SessionId, StagedFact, SyncStatus};
use chrono::{DateTime, Utc};
use tokio_postgres::Row;

/// Column list shared by every SELECT, in [`PostgreSQLStagedFact::from_row`] order
pub const STAGED_FACT_COLUMNS: &str = "id, session_id, patient_id, marker_name, marker_value, \
     raw_text, source_file, page_number, element_type, confidence, sync_status, \
     external_resource_id, created_at, updated_at";

/// One `staged_facts` row as stored
#[derive(Debug, Clone)]
pub struct PostgreSQLStagedFact {
    pub id: i64,
    pub session_id: String,
    pub patient_id: Option<String>,
    pub marker_name: String,
    pub marker_value: String,
    pub raw_text: String,
    pub source_file: Option<String>,
    pub page_number: Option<i32>,
    pub element_type: Option<String>,
    pub confidence: f64,
    pub sync_status: String,
    pub external_resource_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostgreSQLStagedFact {
    /// Read a row selected with [`STAGED_FACT_COLUMNS`]
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: get(row, "id")?,
            session_id: get(row, "session_id")?,
            patient_id: get(row, "patient_id")?,
            marker_name: get(row, "marker_name")?,
            marker_value: get(row, "marker_value")?,
            raw_text: get(row, "raw_text")?,
            source_file: get(row, "source_file")?,
            page_number: get(row, "page_number")?,
            element_type: get(row, "element_type")?,
            confidence: get(row, "confidence")?,
            sync_status: get(row, "sync_status")?,
            external_resource_id: get(row, "external_resource_id")?,
            created_at: get(row, "created_at")?,
            updated_at: get(row, "updated_at")?,
        })
    }

    /// Convert to the domain row
    ///
    /// # Errors
    ///
    /// Returns a `Database` error when a stored value violates a domain
    /// constraint the table CHECKs should have prevented.
    pub fn into_domain(self) -> Result<StagedFact> {
        let session_id = SessionId::new(self.session_id)
            .map_err(|e| corrupt(self.id, &e))?;
        let patient_id = self
            .patient_id
            .map(PatientId::new)
            .transpose()
            .map_err(|e| corrupt(self.id, &e))?;
        let sync_status: SyncStatus = self
            .sync_status
            .parse()
            .map_err(|e: String| corrupt(self.id, &e))?;
        let page_number = self
            .page_number
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt(self.id, &e.to_string()))?;

        Ok(StagedFact {
            id: FactId::new(self.id),
            session_id,
            patient_id,
            marker_name: self.marker_name,
            marker_value: self.marker_value,
            raw_text: self.raw_text,
            source_file: self.source_file,
            page_number,
            element_type: self.element_type,
            confidence: self.confidence,
            sync_status,
            external_resource_id: self.external_resource_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn get<'a, T>(row: &'a Row, column: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| FactSyncError::Database(format!("Failed to read column {column}: {e}")))
}

fn corrupt(id: i64, reason: &str) -> FactSyncError {
    FactSyncError::Database(format!("Stored fact {id} is invalid: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(status: &str) -> PostgreSQLStagedFact {
        let now = Utc::now();
        PostgreSQLStagedFact {
            id: 12,
            session_id: "sess-1".to_string(),
            patient_id: Some("p-1".to_string()),
            marker_name: "ER".to_string(),
            marker_value: "positive".to_string(),
            raw_text: "ER: positive".to_string(),
            source_file: None,
            page_number: Some(2),
            element_type: None,
            confidence: 0.9,
            sync_status: status.to_string(),
            external_resource_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_into_domain() {
        let fact = stored("FAILED").into_domain().unwrap();
        assert_eq!(fact.id, FactId::new(12));
        assert_eq!(fact.sync_status, SyncStatus::Failed);
        assert_eq!(fact.page_number, Some(2));
        assert_eq!(fact.patient_id.unwrap().as_str(), "p-1");
    }

    #[test]
    fn test_unknown_status_is_reported() {
        let err = stored("ARCHIVED").into_domain().unwrap_err();
        assert!(err.to_string().contains("Stored fact 12"));
    }

    #[test]
    fn test_negative_page_is_reported() {
        let mut row = stored("PENDING");
        row.page_number = Some(-1);
        assert!(row.into_domain().is_err());
    }
}
