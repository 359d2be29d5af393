//! Code registry: marker names to standardized codes
//!
//! The registry is read-only while a sync run executes. It starts from the
//! built-in table and may be extended from a TOML file named in the
//! `[registry]` configuration section.

pub mod builtin;
pub mod entry;
mod file;
pub mod lookup;

pub use entry::{
    CodeRegistryEntry, ResourceKind, UnitOfMeasure, LOINC_SYSTEM, OBSERVATION_CATEGORY_SYSTEM,
    UCUM_SYSTEM,
};
pub use lookup::{normalize_alias, CodeRegistry};
