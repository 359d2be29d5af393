//! Sync command implementation
//!
//! Runs one sync for a patient and prints the per-row outcome.

use super::{
    load_registry, EXIT_ABORTED, EXIT_CONFIG_ERROR, EXIT_CONNECTION_ERROR, EXIT_FAILED_ROWS,
    EXIT_SUCCESS,
};
use crate::adapters::database::create_staging_store;
use crate::config::load_config;
use crate::core::sync::{RunErrorKind, SyncOrchestrator, SyncRequest, SyncRunResult};
use crate::domain::SessionId;
use clap::Args;
use std::sync::Arc;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Target-system patient id the facts belong to
    #[arg(long)]
    pub patient: String,

    /// Only sync rows from this session
    #[arg(long)]
    pub session: Option<String>,

    /// Pull, dedup and map without network calls or status writes
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, patient_id = %self.patient, "Starting sync");

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

        let orchestrator = SyncOrchestrator::from_config(&config, store, registry)?;

        let mut request = SyncRequest::new(self.patient.clone())
            .with_dry_run(self.dry_run || config.application.dry_run);
        if let Some(session) = session {
            request = request.with_session(session);
        }

        if request.dry_run {
            println!("🔍 DRY RUN MODE - nothing will be sent or written");
            println!();
        }

        let result = orchestrator.run(request).await;
        print_result(&result);
        Ok(exit_code_for(&result))
    }
}

fn print_result(result: &SyncRunResult) {
    println!("📊 Sync run {}", result.run_id);
    println!("   Phase: {}", result.phase);
    println!("   Pending pulled: {}", result.counts.pending);
    println!("   Skipped at prescreen: {}", result.counts.skipped);
    println!("   Mapped: {}", result.counts.mapped);
    println!("   Duplicates: {}", result.counts.duplicate);
    println!("   Synced: {}", result.counts.synced);
    println!("   Superseded: {}", result.counts.superseded);
    println!("   Failed: {}", result.counts.failed);
    println!("   Duration: {:.2}s", result.duration.as_secs_f64());

    if !result.rows.is_empty() {
        println!();
        println!(
            "{:<8} {:<24} {:<12} {:<10} {:<30}",
            "Row", "Marker", "Status", "Role", "Detail"
        );
        println!("{}", "-".repeat(88));
        for row in &result.rows {
            let detail = row
                .external_id
                .clone()
                .or_else(|| row.reason.clone())
                .unwrap_or_default();
            println!(
                "{:<8} {:<24} {:<12} {:<10} {:<30}",
                row.row_id.to_string(),
                row.marker_name,
                row.status.as_str(),
                format!("{:?}", row.role).to_lowercase(),
                detail
            );
        }
    }

    if let Some(error) = &result.error {
        println!();
        println!("❌ Run aborted: {}", error.message);
    }
}

/// Maps a run result to the process exit code
pub(crate) fn exit_code_for(result: &SyncRunResult) -> i32 {
    match &result.error {
        Some(error) if error.kind == RunErrorKind::StoreFailure => EXIT_CONNECTION_ERROR,
        Some(_) => EXIT_ABORTED,
        None if result.has_failed_rows() => EXIT_FAILED_ROWS,
        None => EXIT_SUCCESS,
    }
}
