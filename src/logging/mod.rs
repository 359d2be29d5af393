//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an optional
//! rolling JSON file layer. The macros below keep the field names of the
//! recurring sync events consistent across call sites.
//!
//! # Example
//!
//! ```no_run
//! use factsync::logging::init_logging;
//! use factsync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(session_id = "sess-1", "Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a sync run
///
/// # Example
///
/// ```no_run
/// use factsync::log_sync_start;
///
/// log_sync_start!("run-1", "patient-9", Some("sess-1"));
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($run_id:expr, $patient_id:expr, $session_id:expr) => {
        tracing::info!(
            run_id = %$run_id,
            patient_id = %$patient_id,
            session_id = ?$session_id,
            "Starting sync run"
        );
    };
}

/// Log the completion of a sync run
///
/// # Example
///
/// ```no_run
/// use factsync::log_sync_complete;
/// use std::time::Duration;
///
/// log_sync_complete!("run-1", 3, 1, Duration::from_millis(420));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($run_id:expr, $synced:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            run_id = %$run_id,
            synced = $synced,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Sync run completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use factsync::log_error_with_context;
/// use factsync::domain::FactSyncError;
///
/// let error = FactSyncError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
