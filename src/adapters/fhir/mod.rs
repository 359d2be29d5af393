//! Target FHIR server integration
//!
//! - [`auth`] - OAuth2 registration, password grant and token caching
//! - [`activation`] - best-effort enabling of freshly registered clients
//! - [`client`] - per-entry resource creation with ordered results
//! - [`models`] - wire payloads and per-entry results

pub mod activation;
pub mod auth;
pub mod client;
pub mod models;

pub use activation::{ClientActivator, CommandActivator, NoActivation};
pub use auth::AuthManager;
pub use client::{build_http_client, FhirSubmissionClient, ResourceSubmitter};
pub use models::{EntryResult, SubmissionReport};
