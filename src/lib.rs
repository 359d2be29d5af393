// FactSync - Clinical fact staging and FHIR synchronization
// Copyright (c) 2025 FactSync Contributors
// Licensed under the MIT License

//! # FactSync - clinical fact staging and FHIR synchronization
//!
//! FactSync keeps a persistent queue of candidate clinical facts detected in
//! source documents and synchronizes them into a FHIR R4 health-record server.
//!
//! ## Overview
//!
//! This library provides:
//! - **Staging** of candidate facts with a guarded status lifecycle
//!   (PENDING, SYNCED, FAILED, SUPERSEDED)
//! - **Deduplication** of facts that share a standardized code and value
//! - **Mapping** of champion facts to Observation and AllergyIntolerance resources
//! - **Submission** of one create request per resource, with OAuth2 token management
//! - **Reconciliation** of every staged row from the per-entry results
//!
//! ## Architecture
//!
//! - [`cli`] - operator binary and argument parsing
//! - [`core`] - registry, staging, dedup, mapping and sync orchestration
//! - [`adapters`] - staging backends and the target FHIR server
//! - [`domain`] - identifiers, staged facts and errors
//! - [`config`] - configuration management
//! - [`logging`] - structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use factsync::core::registry::CodeRegistry;
//! use factsync::core::staging::InMemoryStagingStore;
//! use factsync::core::sync::{SyncOrchestrator, SyncRequest};
//! use factsync::config::load_config;
//! use factsync::domain::{NewFact, SessionId};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("factsync.toml")?;
//!     let store = Arc::new(InMemoryStagingStore::new());
//!     let orchestrator =
//!         SyncOrchestrator::from_config(&config, store, Arc::new(CodeRegistry::builtin()))?;
//!
//!     let session = SessionId::new("sess-1")?;
//!     orchestrator
//!         .staging()
//!         .insert(NewFact::new(session.clone(), "ER", "positive", "ER: positive")?)
//!         .await?;
//!
//!     let result = orchestrator
//!         .run(SyncRequest::new("patient-42").with_session(session))
//!         .await;
//!     println!("{} synced, {} failed", result.counts.synced, result.counts.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`] with [`domain::FactSyncError`].
//! A sync run itself never returns an error: failures are reported through
//! [`core::sync::SyncRunResult::error`] and the per-row results.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
