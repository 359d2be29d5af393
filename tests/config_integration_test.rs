//! Integration tests for configuration loading and validation
//!
//! Every test here takes `ENV_MUTEX`: the loader reads `FACTSYNC_*`
//! overrides, so tests that set them would otherwise leak into the others.

use factsync::config::{load_config, Environment, StagingBackend};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    for var in [
        "FACTSYNC_APPLICATION_LOG_LEVEL",
        "FACTSYNC_APPLICATION_DRY_RUN",
        "FACTSYNC_TARGET_BASE_URL",
        "FACTSYNC_TARGET_PASSWORD",
        "FACTSYNC_TARGET_MAX_CONCURRENCY",
        "FACTSYNC_STAGING_BACKEND",
        "FACTSYNC_REGISTRY_PATH",
        "TEST_FACTSYNC_PASSWORD",
        "TEST_FACTSYNC_SECRET",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

const MINIMAL: &str = r#"
[target]
base_url = "https://ehr.example.org:9300"
username = "factsync"
password = "pass"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
environment = "staging"

[application]
log_level = "debug"
dry_run = true

[target]
base_url = "https://ehr.example.org:9300"
site = "clinic"
username = "factsync"
password = "pass"
client_id = "preset-client"
client_secret = "preset-secret"
client_name = "FactSync Test"
contact_email = "ops@example.org"
scopes = ["openid", "api:fhir"]
timeout_seconds = 45
tls_verify = false
token_refresh_buffer_seconds = 60
max_concurrency = 4

[target.activation]
command = "ehr-admin"
args = ["enable-client", "{client_id}"]

[staging]
backend = "postgresql"

[staging.postgresql]
connection_string = "postgresql://factsync:pw@db.internal:5432/facts"
max_connections = 5
ssl_mode = "require"

[registry]
path = "/etc/factsync/registry.toml"

[mapping]
note_max_chars = 200
extension_base_url = "https://example.org/fhir/StructureDefinition/"

[logging]
local_enabled = true
local_path = "/tmp/factsync-logs"
local_rotation = "hourly"
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);

    assert_eq!(config.target.site, "clinic");
    assert_eq!(config.target.client_id.as_deref(), Some("preset-client"));
    assert_eq!(
        config
            .target
            .client_secret
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_str(),
        "preset-secret"
    );
    assert_eq!(config.target.scope_string(), "openid api:fhir");
    assert_eq!(config.target.timeout_seconds, 45);
    assert!(!config.target.tls_verify);
    assert_eq!(config.target.token_refresh_buffer_seconds, 60);
    assert_eq!(config.target.max_concurrency, 4);
    assert_eq!(config.target.activation.command.as_deref(), Some("ehr-admin"));
    assert_eq!(config.target.activation.args.len(), 2);

    assert_eq!(config.staging.backend, StagingBackend::PostgreSQL);
    let pg = config.staging.postgresql.as_ref().unwrap();
    assert_eq!(pg.max_connections, 5);
    assert_eq!(pg.ssl_mode, "require");

    assert_eq!(
        config.registry.path.as_deref(),
        Some("/etc/factsync/registry.toml")
    );
    assert_eq!(config.mapping.note_max_chars, 200);
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_load_minimal_config_with_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.application.log_level, "info");
    assert!(!config.application.dry_run);
    assert_eq!(config.target.site, "default");
    assert!(config.target.client_id.is_none());
    assert!(config.target.tls_verify);
    assert_eq!(config.target.token_refresh_buffer_seconds, 30);
    assert_eq!(config.target.max_concurrency, 1);
    assert!(config.target.activation.command.is_none());
    assert_eq!(config.staging.backend, StagingBackend::Memory);
    assert!(config.registry.path.is_none());
    assert_eq!(config.mapping.note_max_chars, 500);
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_FACTSYNC_PASSWORD", "secret_pass");
    std::env::set_var("TEST_FACTSYNC_SECRET", "client_secret");

    let toml_content = r#"
# password = "${NOT_SET_BUT_COMMENTED}"
[target]
base_url = "https://ehr.example.org"
username = "factsync"
password = "${TEST_FACTSYNC_PASSWORD}"
client_id = "c1"
client_secret = "${TEST_FACTSYNC_SECRET}"
"#;

    let temp_file = write_config(toml_content);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.target.password.expose_secret().as_str(), "secret_pass");
    assert_eq!(
        config
            .target
            .client_secret
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_str(),
        "client_secret"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_vars_are_all_reported() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
[target]
base_url = "https://ehr.example.org"
username = "factsync"
password = "${TEST_FACTSYNC_PASSWORD}"
client_secret = "${TEST_FACTSYNC_SECRET}"
"#;

    let temp_file = write_config(toml_content);
    let message = load_config(temp_file.path()).unwrap_err().to_string();

    assert!(message.contains("TEST_FACTSYNC_PASSWORD"));
    assert!(message.contains("TEST_FACTSYNC_SECRET"));
}

#[test]
fn test_env_var_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("FACTSYNC_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("FACTSYNC_TARGET_BASE_URL", "http://localhost:8300");
    std::env::set_var("FACTSYNC_TARGET_MAX_CONCURRENCY", "8");
    std::env::set_var("FACTSYNC_REGISTRY_PATH", "/tmp/registry.toml");

    let temp_file = write_config(MINIMAL);
    let config = load_config(temp_file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.target.base_url, "http://localhost:8300");
    assert_eq!(config.target.max_concurrency, 8);
    assert_eq!(config.registry.path.as_deref(), Some("/tmp/registry.toml"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_backend_override_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("FACTSYNC_STAGING_BACKEND", "sqlite");

    let temp_file = write_config(MINIMAL);
    let result = load_config(temp_file.path());
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test]
fn test_production_forbids_disabled_tls_verification() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = r#"
environment = "production"

[target]
base_url = "https://ehr.example.org"
username = "factsync"
password = "pass"
tls_verify = false
"#;

    let temp_file = write_config(toml_content);
    let message = load_config(temp_file.path()).unwrap_err().to_string();
    assert!(message.contains("TLS certificate verification"));
}

#[test]
fn test_postgresql_backend_requires_section() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let toml_content = format!("{MINIMAL}\n[staging]\nbackend = \"postgresql\"\n");
    let temp_file = write_config(&toml_content);
    let message = load_config(temp_file.path()).unwrap_err().to_string();
    assert!(message.contains("staging.postgresql"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        r#"
[target]
base_url = "ftp://ehr.example.org"
username = "u"
password = "p"
"#,
        r#"
[target]
base_url = "https://ehr.example.org"
username = "u"
password = ""
"#,
        r#"
[target]
base_url = "https://ehr.example.org"
username = "u"
password = "p"
max_concurrency = 0
"#,
        r#"
[application]
log_level = "verbose"

[target]
base_url = "https://ehr.example.org"
username = "u"
password = "p"
"#,
        r#"
[target]
base_url = "https://ehr.example.org"
username = "u"
password = "p"

[logging]
local_rotation = "weekly"
"#,
    ];

    for case in cases {
        let temp_file = write_config(case);
        assert!(
            load_config(temp_file.path()).is_err(),
            "expected rejection for:\n{case}"
        );
    }
}

#[test]
fn test_load_config_missing_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    assert!(load_config("/nonexistent/factsync.toml").is_err());
}
