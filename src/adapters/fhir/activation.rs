//! Post-registration client activation
//!
//! Freshly registered OAuth2 clients often start disabled until an
//! administrator approves them. An activator is the hook that performs that
//! approval out of band. It is best effort: the auth manager only logs its
//! failures, and the following token request reports whether the client is
//! really usable.

use crate::config::ActivationConfig;
use crate::domain::{FactSyncError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Placeholder replaced with the registered client id in command arguments
pub const CLIENT_ID_PLACEHOLDER: &str = "{client_id}";

/// Enables a newly registered OAuth2 client
#[async_trait]
pub trait ClientActivator: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Activate `client_id`
    ///
    /// # Errors
    ///
    /// Returns an error when activation is unavailable or fails.
    async fn activate(&self, client_id: &str) -> Result<()>;
}

/// Activator used when no activation command is configured
#[derive(Debug, Default)]
pub struct NoActivation;

#[async_trait]
impl ClientActivator for NoActivation {
    fn name(&self) -> &str {
        "none"
    }

    async fn activate(&self, _client_id: &str) -> Result<()> {
        Err(FactSyncError::Other(
            "no activation command configured".to_string(),
        ))
    }
}

/// Runs a configured program to enable the client
#[derive(Debug, Clone)]
pub struct CommandActivator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandActivator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Arguments with the client id substituted
    pub fn args_for(&self, client_id: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(CLIENT_ID_PLACEHOLDER, client_id))
            .collect()
    }
}

#[async_trait]
impl ClientActivator for CommandActivator {
    fn name(&self) -> &str {
        &self.program
    }

    async fn activate(&self, client_id: &str) -> Result<()> {
        let args = self.args_for(client_id);
        tracing::debug!(program = %self.program, ?args, "Running client activation command");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program).args(&args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| {
            FactSyncError::Other(format!(
                "activation command timed out after {}s",
                self.timeout.as_secs()
            ))
        })?
        .map_err(|e| FactSyncError::Io(format!("failed to run {}: {e}", self.program)))?;

        if output.status.success() {
            tracing::info!(client_id = %client_id, "OAuth2 client activated");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(FactSyncError::Other(format!(
                "activation command exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// Builds the activator named by `[target.activation]`
pub fn activator_from_config(config: &ActivationConfig) -> Box<dyn ClientActivator> {
    match &config.command {
        Some(program) => Box::new(CommandActivator::new(
            program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_seconds),
        )),
        None => Box::new(NoActivation),
    }
}
