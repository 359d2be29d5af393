//! Staging store factory
//!
//! Creates the configured staging backend and makes sure its schema exists.

use crate::adapters::database::traits::StagingStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{FactSyncConfig, StagingBackend};
use crate::core::staging::InMemoryStagingStore;
use crate::domain::{FactSyncError, Result};
use std::sync::Arc;

/// Create a staging store based on the configuration
///
/// # Errors
///
/// Returns an error if the backend cannot be created or its schema cannot be
/// initialized.
pub async fn create_staging_store(config: &FactSyncConfig) -> Result<Arc<dyn StagingStore>> {
    let store: Arc<dyn StagingStore> = match config.staging.backend {
        StagingBackend::Memory => {
            tracing::info!("Creating in-memory staging store");
            Arc::new(InMemoryStagingStore::new())
        }
        StagingBackend::PostgreSQL => {
            let pg_config = config.staging.postgresql.as_ref().ok_or_else(|| {
                FactSyncError::Configuration(
                    "staging.postgresql configuration is required for the postgresql backend"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL staging store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Arc::new(PostgreSQLAdapter::new(client))
        }
    };

    store.ensure_schema().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend() {
        let config: FactSyncConfig = toml::from_str(
            r#"
            [target]
            base_url = "https://fhir.example.org"
            username = "admin"
            password = "pass"
            "#,
        )
        .unwrap();

        let store = create_staging_store(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(store.test_connection().await.is_ok());
    }
}
