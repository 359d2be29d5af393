//! Domain error types
//!
//! This module defines the error hierarchy for FactSync.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main FactSync error type
///
/// This is the primary error type used throughout the library.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum FactSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Target FHIR server errors
    #[error("FHIR error: {0}")]
    Fhir(#[from] FhirError),

    /// Staging store persistence errors
    #[error("Database error: {0}")]
    Database(String),

    /// Input validation errors (rejected facts, malformed identifiers)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource mapping defects
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Illegal status transitions
    #[error("State error: {0}")]
    State(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl FactSyncError {
    /// Returns true if this error came from registration or token acquisition
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            FactSyncError::Fhir(FhirError::AuthenticationFailed { .. })
                | FactSyncError::Fhir(FhirError::RegistrationFailed { .. })
        )
    }
}

/// Errors raised while talking to the target FHIR server
///
/// These errors don't expose the HTTP client's types.
#[derive(Debug, Error)]
pub enum FhirError {
    /// Transport-level failure (DNS, TLS, connection reset)
    #[error("Failed to connect to FHIR server: {0}")]
    ConnectionFailed(String),

    /// Dynamic client registration was rejected
    #[error("Client registration failed with status {status}: {message}")]
    RegistrationFailed { status: u16, message: String },

    /// Token endpoint rejected the password grant
    #[error("Authentication failed with status {status}: {message}. {remediation}")]
    AuthenticationFailed {
        status: u16,
        message: String,
        remediation: String,
    },

    /// Response body could not be understood
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl FhirError {
    /// Classifies a non-success response by status class
    pub fn for_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status >= 500 {
            FhirError::ServerError { status, message }
        } else {
            FhirError::ClientError { status, message }
        }
    }

    /// HTTP status associated with the error, 0 when no response was received
    pub fn status(&self) -> u16 {
        match self {
            FhirError::RegistrationFailed { status, .. }
            | FhirError::AuthenticationFailed { status, .. }
            | FhirError::ServerError { status, .. }
            | FhirError::ClientError { status, .. } => *status,
            _ => 0,
        }
    }
}

impl From<std::io::Error> for FactSyncError {
    fn from(err: std::io::Error) -> Self {
        FactSyncError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FactSyncError {
    fn from(err: serde_json::Error) -> Self {
        FactSyncError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FactSyncError {
    fn from(err: toml::de::Error) -> Self {
        FactSyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
