//! Promote command implementation
//!
//! Compensation for deployments whose target write path is unavailable:
//! marks a session's FAILED or PENDING rows SYNCED (champions) and
//! SUPERSEDED (duplicates) without contacting the target server.

use super::{load_registry, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_SUCCESS};
use crate::adapters::database::create_staging_store;
use crate::config::load_config;
use crate::core::staging::StagingManager;
use crate::domain::SessionId;
use clap::{Args, ValueEnum};
use std::sync::Arc;

/// Rows a promotion starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromoteSource {
    Failed,
    Pending,
}

/// Arguments for the promote command
#[derive(Args, Debug)]
pub struct PromoteArgs {
    /// Session whose rows are promoted
    #[arg(long)]
    pub session: String,

    /// Status to promote from
    #[arg(long, value_enum, default_value_t = PromoteSource::Failed)]
    pub from: PromoteSource,
}

impl PromoteArgs {
    /// Execute the promote command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(session_id = %self.session, from = ?self.from, "Promoting staged rows");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let session = match SessionId::new(self.session.as_str()) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Invalid session id: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let registry = match load_registry(&config) {
            Ok(r) => Arc::new(r),
            Err(e) => {
                println!("❌ Failed to load code registry");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let store = match create_staging_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to staging store");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION_ERROR);
            }
        };
        let manager = StagingManager::new(store, registry);

        let outcome = match self.from {
            PromoteSource::Failed => manager.promote_failed_to_synced(&session).await,
            PromoteSource::Pending => manager.promote_pending_to_synced(&session).await,
        };

        match outcome {
            Ok(summary) => {
                println!("⚠️  Rows marked SYNCED without target confirmation");
                println!("   Session: {session}");
                println!("   Synced: {}", summary.synced);
                println!("   Superseded: {}", summary.superseded);
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Promotion failed, no rows were changed");
                println!("   Error: {e}");
                Ok(EXIT_CONNECTION_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_promote_with_missing_config_is_config_error() {
        let args = PromoteArgs {
            session: "sess-1".to_string(),
            from: PromoteSource::Pending,
        };
        let code = args.execute("/nonexistent/factsync.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG_ERROR);
    }
}
