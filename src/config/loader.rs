//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{FactSyncConfig, StagingBackend};
use super::secret::{secret_string, secret_string_opt};
use crate::domain::errors::FactSyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`FactSyncConfig`]
/// 4. Applies environment variable overrides (`FACTSYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the file cannot be read or parsed, if a
/// referenced variable is unset, or if validation fails.
///
/// # Examples
///
/// ```no_run
/// use factsync::config::loader::load_config;
///
/// let config = load_config("factsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FactSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FactSyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FactSyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Same as [`load_config`] for an in-memory document
pub fn load_config_str(contents: &str) -> Result<FactSyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FactSyncConfig = toml::from_str(&contents)
        .map_err(|e| FactSyncError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        FactSyncError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are left untouched. Every missing variable is reported in a
/// single error.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| FactSyncError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(FactSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the `FACTSYNC_*` prefix
///
/// Variables follow the pattern `FACTSYNC_<SECTION>_<KEY>`, for example
/// `FACTSYNC_TARGET_BASE_URL` or `FACTSYNC_STAGING_BACKEND`.
fn apply_env_overrides(config: &mut FactSyncConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("FACTSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("FACTSYNC_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Target overrides
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_BASE_URL") {
        config.target.base_url = val;
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_SITE") {
        config.target.site = val;
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_USERNAME") {
        config.target.username = val;
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_PASSWORD") {
        config.target.password = secret_string(val);
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_CLIENT_ID") {
        config.target.client_id = Some(val);
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_CLIENT_SECRET") {
        config.target.client_secret = secret_string_opt(Some(val));
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_TLS_VERIFY") {
        config.target.tls_verify = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.target.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("FACTSYNC_TARGET_MAX_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.target.max_concurrency = concurrency;
        }
    }

    // Staging overrides
    if let Ok(val) = std::env::var("FACTSYNC_STAGING_BACKEND") {
        config.staging.backend = match val.to_lowercase().as_str() {
            "postgresql" => StagingBackend::PostgreSQL,
            "memory" => StagingBackend::Memory,
            other => {
                return Err(FactSyncError::Configuration(format!(
                    "Invalid FACTSYNC_STAGING_BACKEND '{other}'. Must be one of: postgresql, memory"
                )))
            }
        };
    }
    if let Some(ref mut pg_config) = config.staging.postgresql {
        if let Ok(val) = std::env::var("FACTSYNC_STAGING_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("FACTSYNC_STAGING_POSTGRESQL_MAX_CONNECTIONS") {
            if let Ok(max) = val.parse() {
                pg_config.max_connections = max;
            }
        }
    }

    // Registry overrides
    if let Ok(val) = std::env::var("FACTSYNC_REGISTRY_PATH") {
        config.registry.path = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FACTSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FACTSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
