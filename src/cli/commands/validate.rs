//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the FactSync configuration file.

use super::{load_registry, EXIT_CONFIG_ERROR, EXIT_SUCCESS};
use crate::config::load_config;
use crate::config::StagingBackend;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section before returning
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let registry = match load_registry(&config) {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to load code registry");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Target Server: {}", config.target.base_url);
        println!("  Target Site: {}", config.target.site);
        println!(
            "  Client Credentials: {}",
            if config.target.client_id.is_some() {
                "pre-shared"
            } else {
                "dynamic registration"
            }
        );
        println!("  TLS Verify: {}", config.target.tls_verify);
        println!("  Max Concurrency: {}", config.target.max_concurrency);

        match config.staging.backend {
            StagingBackend::Memory => println!("  Staging Backend: memory"),
            StagingBackend::PostgreSQL => {
                println!("  Staging Backend: PostgreSQL");
                if let Some(ref pg_config) = config.staging.postgresql {
                    use secrecy::ExposeSecret;
                    println!(
                        "  PostgreSQL Connection: {}",
                        pg_config
                            .connection_string
                            .expose_secret()
                            .as_str()
                            .split('@')
                            .next_back()
                            .unwrap_or("***")
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }

        println!(
            "  Code Registry: {} entries, {} aliases{}",
            registry.len(),
            registry.alias_count(),
            config
                .registry
                .path
                .as_deref()
                .map(|p| format!(" ({p})"))
                .unwrap_or_default()
        );
        println!("  Note Max Chars: {}", config.mapping.note_max_chars);
        println!();

        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let args = ValidateArgs {};
        let code = args.execute("/nonexistent/factsync.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG_ERROR);
    }
}
