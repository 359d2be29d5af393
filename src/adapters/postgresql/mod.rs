//! PostgreSQL staging backend
//!
//! Persists staged facts in a single `staged_facts` table. The schema lives in
//! `migrations/001_staging_schema.sql` and is applied idempotently at startup.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::PostgreSQLStagedFact;
