//! Configuration management for FactSync.
//!
//! FactSync reads a single TOML file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `FACTSYNC_<SECTION>_<KEY>` overrides applied after parsing
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level and dry-run switch
//! - [`TargetConfig`] - FHIR server, OAuth2 credentials, submission limits
//! - [`StagingConfig`] - staging backend and [`PostgreSQLConfig`]
//! - [`RegistryConfig`] - optional code registry overlay file
//! - [`MappingConfig`] - note length cap and extension base URL
//! - [`LoggingConfig`] - optional JSON file logging
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [target]
//! base_url = "https://ehr.example.org:9300"
//! username = "factsync"
//! password = "${FACTSYNC_TARGET_PASSWORD}"
//! client_id = "${FACTSYNC_CLIENT_ID}"
//! client_secret = "${FACTSYNC_CLIENT_SECRET}"
//!
//! [staging]
//! backend = "postgresql"
//!
//! [staging.postgresql]
//! connection_string = "${FACTSYNC_DATABASE_URL}"
//! ```
//!
//! # Validation
//!
//! ```rust,no_run
//! use factsync::config::load_config;
//!
//! match load_config("factsync.toml") {
//!     Ok(config) => println!("Target: {}", config.target.base_url),
//!     Err(e) => eprintln!("Configuration error: {}", e),
//! }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_str};
pub use schema::{
    ActivationConfig, ApplicationConfig, Environment, FactSyncConfig, LoggingConfig,
    MappingConfig, PostgreSQLConfig, RegistryConfig, StagingBackend, StagingConfig, TargetConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
