//! External system integrations for FactSync.
//!
//! - [`database`] - staging store trait and backend factory
//! - [`postgresql`] - PostgreSQL staging backend
//! - [`fhir`] - target FHIR server: authentication and submission
//!
//! Adapters isolate third-party clients behind traits so the orchestrator can
//! be driven with in-memory and mocked implementations in tests.
//!
//! ```rust,no_run
//! use factsync::adapters::fhir::{FhirSubmissionClient, ResourceSubmitter};
//! use factsync::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("factsync.toml")?;
//! let client = FhirSubmissionClient::from_config(&config.target)?;
//! client.prepare().await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod fhir;
pub mod postgresql;
