//! Domain identifier types with validation
//!
//! Newtype wrappers keep staging row ids, extraction sessions and target
//! patients from being mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Staging row identifier, assigned by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(i64);

impl FactId {
    /// Wraps a raw row id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row id
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FactId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Extraction session identifier
///
/// Groups every fact detected during one document-processing session.
///
/// # Examples
///
/// ```
/// use factsync::domain::ids::SessionId;
/// use std::str::FromStr;
///
/// let session = SessionId::from_str("sess-2024-001").unwrap();
/// assert_eq!(session.as_str(), "sess-2024-001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new SessionId, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Session ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the session ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Target-system patient identifier (the FHIR `Patient` resource id)
///
/// # Examples
///
/// ```
/// use factsync::domain::ids::PatientId;
///
/// let patient = PatientId::new("a1312c03-cd3f-44b5-9d5f-1ef5751a7550").unwrap();
/// assert_eq!(patient.reference(), "Patient/a1312c03-cd3f-44b5-9d5f-1ef5751a7550");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new PatientId, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Patient ID cannot be empty".to_string());
        }
        Ok(Self(id.trim().to_string()))
    }

    /// Returns the patient ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// FHIR reference string, e.g. `Patient/123`
    pub fn reference(&self) -> String {
        format!("Patient/{}", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_valid() {
        let id = SessionId::new("sess-1").unwrap();
        assert_eq!(id.as_str(), "sess-1");
        assert_eq!(id.to_string(), "sess-1");
    }

    #[test]
    fn test_session_id_blank_rejected() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
    }

    #[test]
    fn test_patient_id_trims_and_references() {
        let id = PatientId::new("  42 ").unwrap();
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.reference(), "Patient/42");
    }

    #[test]
    fn test_patient_id_blank_rejected() {
        assert!(PatientId::from_str(" ").is_err());
    }

    #[test]
    fn test_fact_id_ordering() {
        assert!(FactId::new(1) < FactId::new(2));
        assert_eq!(FactId::from(7).value(), 7);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&SessionId::new("s").unwrap()).unwrap();
        assert_eq!(json, "\"s\"");
        let json = serde_json::to_string(&FactId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
