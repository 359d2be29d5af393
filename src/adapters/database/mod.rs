//! Staging store abstraction layer
//!
//! A trait-based seam so the staging queue can live in PostgreSQL in
//! production and in memory for tests and dry runs.

pub mod factory;
pub mod traits;

pub use factory::create_staging_store;
pub use traits::{check_transition, StagingStore, StatusCounts};
