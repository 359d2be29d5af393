//! Core business logic for FactSync.
//!
//! # Modules
//!
//! - [`registry`] - marker names to standardized codes and resource shape
//! - [`staging`] - in-memory staging store and the registry-aware manager
//! - [`dedup`] - (code, value) grouping and champion election
//! - [`mapping`] - typed FHIR R4 resources, value decision tree, bundles
//! - [`sync`] - run orchestration and run results
//!
//! # Sync Workflow
//!
//! 1. **Pull**: read PENDING rows for a session (or all sessions)
//! 2. **Prescreen**: mark empty-value and unknown-marker rows FAILED
//! 3. **Dedup**: group by (code, normalized value) and elect one champion per group
//! 4. **Map**: build one bundle entry per champion
//! 5. **Submit**: create each entry on the target server
//! 6. **Reconcile**: write SYNCED, SUPERSEDED or FAILED back to every row
//!
//! # Example
//!
//! ```rust,no_run
//! use factsync::adapters::database::create_staging_store;
//! use factsync::config::load_config;
//! use factsync::core::registry::CodeRegistry;
//! use factsync::core::sync::{SyncOrchestrator, SyncRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("factsync.toml")?;
//! let store = create_staging_store(&config).await?;
//! let orchestrator =
//!     SyncOrchestrator::from_config(&config, store, Arc::new(CodeRegistry::builtin()))?;
//!
//! let result = orchestrator.run(SyncRequest::new("patient-42")).await;
//! println!("Synced: {}", result.counts.synced);
//! println!("Failed: {}", result.counts.failed);
//! # Ok(())
//! # }
//! ```

pub mod dedup;
pub mod mapping;
pub mod registry;
pub mod staging;
pub mod sync;
