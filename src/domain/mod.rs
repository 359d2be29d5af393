//! Domain models and types for FactSync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FactId`], [`SessionId`], [`PatientId`])
//! - **Staging rows** ([`NewFact`], [`StagedFact`]) and their [`SyncStatus`]
//! - **Error types** ([`FactSyncError`], [`FhirError`])
//! - **Result type alias** ([`Result`])
//!
//! # Validation at construction
//!
//! Facts are validated when they are built, not when they are written:
//!
//! ```rust
//! use factsync::domain::{NewFact, SessionId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fact = NewFact::new(SessionId::new("sess-1")?, "ER", "positive", "ER: positive")?
//!     .with_source_file("pathology.pdf")
//!     .with_confidence(0.93);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod fact;
pub mod ids;
pub mod result;

pub use errors::{FactSyncError, FhirError};
pub use fact::{NewFact, StagedFact, SyncStatus};
pub use ids::{FactId, PatientId, SessionId};
pub use result::Result;
