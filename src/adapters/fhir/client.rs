//! FHIR submission client
//!
//! The target server cannot apply a transaction bundle atomically, so each
//! bundle entry is created with its own `POST /<ResourceType>`. Results are
//! returned in bundle order even when requests run concurrently; the
//! orchestrator pairs `results[i]` with `champions[i]` by position.

use super::auth::AuthManager;
use super::models::{
    canonical_reference, created_id, EntryResult, SubmissionReport, ERROR_BODY_MAX_CHARS,
};
use crate::config::TargetConfig;
use crate::core::mapping::{Bundle, BundleEntry};
use crate::domain::fact::truncate_chars;
use crate::domain::{FactSyncError, FhirError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";

/// Submits mapped bundles to a target system
#[async_trait]
pub trait ResourceSubmitter: Send + Sync {
    /// Acquire whatever the submitter needs before the first create
    ///
    /// # Errors
    ///
    /// An error here aborts the run before any resource is sent.
    async fn prepare(&self) -> Result<()>;

    /// Create every entry, returning one result per entry in bundle order
    ///
    /// Per-entry failures are reported in the results, never as an error.
    async fn submit_bundle(&self, bundle: &Bundle) -> SubmissionReport;
}

/// Builds the HTTP client shared by authentication and submission
///
/// # Errors
///
/// Returns a `Configuration` error if the client cannot be built.
pub fn build_http_client(config: &TargetConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.timeout_seconds.min(30)));

    if !config.tls_verify {
        tracing::warn!(
            base_url = %config.base_url,
            "SECURITY WARNING: TLS certificate verification is DISABLED for the target server. \
             Only use this against local development servers with self-signed certificates."
        );
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder
        .build()
        .map_err(|e| FactSyncError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Creates resources one entry at a time on a FHIR R4 server
pub struct FhirSubmissionClient {
    http: Client,
    auth: Arc<AuthManager>,
    fhir_base: String,
    max_concurrency: usize,
}

impl FhirSubmissionClient {
    pub fn new(http: Client, auth: Arc<AuthManager>, max_concurrency: usize) -> Self {
        let fhir_base = auth.fhir_base();
        Self {
            http,
            auth,
            fhir_base,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Builds the HTTP client, auth manager and submission client from `[target]`
    pub fn from_config(config: &TargetConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let auth = Arc::new(AuthManager::new(config, http.clone()));
        Ok(Self::new(http, auth, config.max_concurrency))
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    async fn submit_entry(&self, index: usize, entry: &BundleEntry) -> EntryResult {
        let method = entry.request.method.as_str();
        if !method.eq_ignore_ascii_case("POST") {
            return EntryResult::failed(
                index,
                0,
                format!("Unsupported request method {method}, only POST is submitted"),
            );
        }

        let token = match self.auth.ensure_token().await {
            Ok(token) => token,
            Err(e) => return EntryResult::failed(index, 0, format!("Authentication failed: {e}")),
        };

        let resource_type = entry.request.url.trim_matches('/');
        let url = format!("{}/{}", self.fhir_base, resource_type);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token.expose_secret().as_str())
            .header(ACCEPT, FHIR_JSON)
            .header(CONTENT_TYPE, FHIR_JSON)
            .json(&entry.resource)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return EntryResult::failed(index, 0, format!("Request timed out: {e}"));
            }
            Err(e) => return EntryResult::failed(index, 0, format!("Request failed: {e}")),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            let fhir_id = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|json| created_id(&json))
                .map(|id| canonical_reference(resource_type, &id));

            if fhir_id.is_none() {
                tracing::warn!(
                    index,
                    resource_type,
                    status = status.as_u16(),
                    "Create succeeded but the response carried no id"
                );
            }
            EntryResult::created(index, status.as_u16(), fhir_id)
        } else {
            let body = truncate_chars(body.trim(), ERROR_BODY_MAX_CHARS);
            let error = FhirError::for_status(status.as_u16(), body.clone());
            tracing::warn!(index, resource_type, error = %error, "Create rejected by target server");
            EntryResult::failed(index, status.as_u16(), body)
        }
    }
}

#[async_trait]
impl ResourceSubmitter for FhirSubmissionClient {
    async fn prepare(&self) -> Result<()> {
        self.auth.ensure_token().await.map(|_| ())
    }

    async fn submit_bundle(&self, bundle: &Bundle) -> SubmissionReport {
        tracing::info!(
            bundle_id = %bundle.id,
            entries = bundle.len(),
            max_concurrency = self.max_concurrency,
            "Submitting bundle entries"
        );

        let pending: Vec<_> = bundle
            .entry
            .iter()
            .enumerate()
            .map(|(index, entry)| self.submit_entry(index, entry))
            .collect();

        // `buffered` yields in input order regardless of completion order
        let results: Vec<EntryResult> = stream::iter(pending)
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let report = SubmissionReport::from_results(results);
        tracing::info!(
            bundle_id = %bundle.id,
            succeeded = report.succeeded,
            failed = report.failed,
            "Bundle submission finished"
        );
        report
    }
}
