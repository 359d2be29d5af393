//! Status command implementation
//!
//! Prints per-status counts of the staging queue and, for a patient, the
//! facts already synced to the target server.

use super::{load_registry, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_SUCCESS};
use crate::adapters::database::create_staging_store;
use crate::config::load_config;
use crate::core::staging::StagingManager;
use crate::domain::{PatientId, SessionId};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only count rows from this session
    #[arg(long)]
    pub session: Option<String>,

    /// List the facts already synced for this patient
    #[arg(long)]
    pub patient: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking staging status");

        println!("📊 Staging Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };

        let session = match self.session.as_deref().map(SessionId::new).transpose() {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Invalid session id: {e}");
                return Ok(EXIT_CONFIG_ERROR);
            }
        };
        let patient = match self.patient.as_deref().map(PatientId::new).transpose() {
            Ok(p) => p,
            Err(e) => {
                println!("❌ Invalid patient id: {e}");
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

        let counts = match manager.status_counts(session.as_ref()).await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to read staging counts");
                println!("   Error: {e}");
                return Ok(EXIT_CONNECTION_ERROR);
            }
        };

        if let Some(session) = &session {
            println!("Session: {session}");
        }
        if counts.total() == 0 {
            println!("No staged facts found.");
        } else {
            println!("{:<12} {:>10}", "Status", "Rows");
            println!("{}", "-".repeat(23));
            for (status, count) in counts.iter() {
                println!("{:<12} {:>10}", status.as_str(), count);
            }
            println!("{}", "-".repeat(23));
            println!("{:<12} {:>10}", "TOTAL", counts.total());
        }

        if let Some(patient) = &patient {
            let synced = match manager.get_synced(Some(patient)).await {
                Ok(rows) => rows,
                Err(e) => {
                    println!("❌ Failed to read synced facts");
                    println!("   Error: {e}");
                    return Ok(EXIT_CONNECTION_ERROR);
                }
            };

            println!();
            println!("Synced facts for patient {patient}: {}", synced.len());
            for row in synced {
                println!(
                    "  {:<24} {:<24} {}",
                    row.marker_name,
                    row.value(),
                    row.external_resource_id.as_deref().unwrap_or("-")
                );
            }
        }

        println!();
        Ok(EXIT_SUCCESS)
    }
}
