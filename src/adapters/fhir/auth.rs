//! OAuth2 credential management for the target server
//!
//! The [`AuthManager`] owns the client credentials and a cached access token.
//! Tokens are fetched with the password grant and refreshed proactively when
//! fewer than `token_refresh_buffer_seconds` remain. When no client id is
//! configured the manager registers a client once, keeps the credentials for
//! its own lifetime and runs the configured [`ClientActivator`].
//!
//! The token state sits behind a `tokio::sync::Mutex` that is held across the
//! fetch, so concurrent callers of [`AuthManager::ensure_token`] share one
//! refresh instead of racing.

use super::activation::{activator_from_config, ClientActivator};
use super::models::{RegistrationRequest, RegistrationResponse, TokenResponse};
use crate::config::{secret_string, SecretString, TargetConfig};
use crate::domain::fact::truncate_chars;
use crate::domain::{FhirError, Result};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Lifetime assumed when the token response omits `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Upper bound applied to a server-supplied `expires_in`
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 86_400;

const AUTH_BODY_MAX_CHARS: usize = 500;

#[derive(Default)]
struct CredentialState {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    access_token: Option<SecretString>,
    expires_at: Option<Instant>,
}

impl CredentialState {
    fn is_fresh(&self, buffer: Duration) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(expires_at)) => {
                expires_at.saturating_duration_since(Instant::now()) > buffer
            }
            _ => false,
        }
    }
}

/// Owns OAuth2 client credentials and the cached access token
pub struct AuthManager {
    http: Client,
    base_url: String,
    site: String,
    username: String,
    password: SecretString,
    scope: String,
    client_name: String,
    contact_email: String,
    refresh_buffer: Duration,
    activator: Box<dyn ClientActivator>,
    state: Mutex<CredentialState>,
}

impl AuthManager {
    /// Creates a manager from `[target]`, sharing `http` with the submission client
    pub fn new(config: &TargetConfig, http: Client) -> Self {
        let state = CredentialState {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            ..CredentialState::default()
        };

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            site: config.site.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            scope: config.scope_string(),
            client_name: config.client_name.clone(),
            contact_email: config.contact_email.clone(),
            refresh_buffer: Duration::from_secs(config.token_refresh_buffer_seconds),
            activator: activator_from_config(&config.activation),
            state: Mutex::new(state),
        }
    }

    /// Replaces the activator chosen from configuration
    pub fn with_activator(mut self, activator: Box<dyn ClientActivator>) -> Self {
        self.activator = activator;
        self
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/{}/token", self.base_url, self.site)
    }

    pub fn registration_url(&self) -> String {
        format!("{}/oauth2/{}/registration", self.base_url, self.site)
    }

    /// FHIR API root, e.g. `https://ehr.example.org/apis/default/fhir`
    pub fn fhir_base(&self) -> String {
        format!("{}/apis/{}/fhir", self.base_url, self.site)
    }

    fn approval_url(&self) -> String {
        format!("{}/interface/smart/register-app.php", self.base_url)
    }

    /// Returns a token with more than the refresh buffer left, fetching one if needed
    ///
    /// # Errors
    ///
    /// Returns `RegistrationFailed` or `AuthenticationFailed` when the server
    /// rejects the request, `ConnectionFailed` on transport errors.
    pub async fn ensure_token(&self) -> Result<SecretString> {
        let mut state = self.state.lock().await;

        if state.is_fresh(self.refresh_buffer) {
            if let Some(token) = &state.access_token {
                return Ok(token.clone());
            }
        }

        if state.client_id.is_none() {
            let registered = self.register_client().await?;
            state.client_id = Some(registered.client_id);
            state.client_secret = registered.client_secret.map(secret_string);
        }

        let client_id = state.client_id.clone().unwrap_or_default();
        let (token, lifetime) = self
            .fetch_token(&client_id, state.client_secret.as_ref())
            .await?;

        let expires_at = Instant::now().checked_add(lifetime).ok_or_else(|| {
            FhirError::InvalidResponse(format!(
                "Token lifetime of {}s cannot be represented",
                lifetime.as_secs()
            ))
        })?;

        state.access_token = Some(token.clone());
        state.expires_at = Some(expires_at);
        Ok(token)
    }

    /// Requests a new access token with the password grant
    ///
    /// Does not touch the cache; [`ensure_token`](Self::ensure_token) does.
    pub async fn fetch_token(
        &self,
        client_id: &str,
        client_secret: Option<&SecretString>,
    ) -> Result<(SecretString, Duration)> {
        let mut form = vec![
            ("grant_type", "password".to_string()),
            ("username", self.username.clone()),
            ("password", self.password.expose_secret().as_str().to_string()),
            ("user_role", "users".to_string()),
            ("client_id", client_id.to_string()),
            ("scope", self.scope.clone()),
        ];
        if let Some(secret) = client_secret {
            form.push(("client_secret", secret.expose_secret().as_str().to_string()));
        }

        tracing::debug!(
            token_url = %self.token_url(),
            client_id = %client_id,
            username = %self.username,
            "Requesting access token"
        );

        let response = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FhirError::Timeout(format!("Token request timed out: {e}"))
                } else {
                    FhirError::ConnectionFailed(format!("Failed to request access token: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let remediation = self.token_remediation(&body);
            tracing::error!(
                status = status.as_u16(),
                client_id = %client_id,
                "Token request rejected"
            );
            return Err(FhirError::AuthenticationFailed {
                status: status.as_u16(),
                message: truncate_chars(body.trim(), AUTH_BODY_MAX_CHARS),
                remediation,
            }
            .into());
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            FhirError::InvalidResponse(format!("Failed to parse token response: {e}"))
        })?;

        if token.access_token.trim().is_empty() {
            return Err(FhirError::InvalidResponse(
                "Token response contained an empty access_token".to_string(),
            )
            .into());
        }

        let requested = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let lifetime = requested.min(MAX_TOKEN_LIFETIME_SECS);
        if lifetime < requested {
            tracing::warn!(
                expires_in = requested,
                capped_to = lifetime,
                "Token lifetime exceeds the supported maximum, capping it"
            );
        }
        tracing::info!(expires_in = lifetime, "Access token acquired");

        Ok((secret_string(token.access_token), Duration::from_secs(lifetime)))
    }

    async fn register_client(&self) -> Result<RegistrationResponse> {
        let request = RegistrationRequest::private_client(
            &self.base_url,
            &self.client_name,
            &self.contact_email,
            &self.scope,
        );

        tracing::info!(
            registration_url = %self.registration_url(),
            client_name = %self.client_name,
            "No client id configured, registering OAuth2 client"
        );

        let response = self
            .http
            .post(self.registration_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FhirError::Timeout(format!("Client registration timed out: {e}"))
                } else {
                    FhirError::ConnectionFailed(format!("Failed to register OAuth2 client: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(FhirError::RegistrationFailed {
                status: status.as_u16(),
                message: truncate_chars(body.trim(), AUTH_BODY_MAX_CHARS),
            }
            .into());
        }

        let registered: RegistrationResponse = serde_json::from_str(&body).map_err(|e| {
            FhirError::InvalidResponse(format!("Failed to parse registration response: {e}"))
        })?;

        tracing::info!(client_id = %registered.client_id, "OAuth2 client registered");

        if let Err(e) = self.activator.activate(&registered.client_id).await {
            tracing::warn!(
                client_id = %registered.client_id,
                activator = %self.activator.name(),
                error = %e,
                "Client registered but not activated. Approve it at {} or set \
                 FACTSYNC_TARGET_CLIENT_ID and FACTSYNC_TARGET_CLIENT_SECRET to a pre-approved client",
                self.approval_url()
            );
        }

        Ok(registered)
    }

    fn token_remediation(&self, body: &str) -> String {
        if body.contains("invalid_client") {
            format!(
                "The OAuth2 client is unknown or not enabled. Approve it at {} or set \
                 FACTSYNC_TARGET_CLIENT_ID and FACTSYNC_TARGET_CLIENT_SECRET to a pre-approved client.",
                self.approval_url()
            )
        } else {
            "Check target.username, target.password and target.scopes.".to_string()
        }
    }

    /// Drops the cached token so the next call fetches a new one
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.access_token = None;
        state.expires_at = None;
        tracing::debug!("Access token invalidated");
    }

    /// Whether a cached token with more than the refresh buffer left exists
    pub async fn has_valid_token(&self) -> bool {
        self.state.lock().await.is_fresh(self.refresh_buffer)
    }

    /// Client id in use, configured or registered
    pub async fn client_id(&self) -> Option<String> {
        self.state.lock().await.client_id.clone()
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("base_url", &self.base_url)
            .field("site", &self.site)
            .field("username", &self.username)
            .field("activator", &self.activator.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(base_url: &str) -> TargetConfig {
        let toml = format!(
            r#"
            [target]
            base_url = "{base_url}/"
            site = "clinic"
            username = "admin"
            password = "pass"
            client_id = "preset"
            "#
        );
        let config: crate::config::FactSyncConfig = toml::from_str(&toml).unwrap();
        config.target
    }

    #[test]
    fn test_endpoint_urls() {
        let auth = AuthManager::new(&target("https://ehr.example.org"), Client::new());
        assert_eq!(auth.token_url(), "https://ehr.example.org/oauth2/clinic/token");
        assert_eq!(
            auth.registration_url(),
            "https://ehr.example.org/oauth2/clinic/registration"
        );
        assert_eq!(auth.fhir_base(), "https://ehr.example.org/apis/clinic/fhir");
    }

    #[test]
    fn test_remediation_mentions_approval_page() {
        let auth = AuthManager::new(&target("https://ehr.example.org"), Client::new());
        let hint = auth.token_remediation(r#"{"error":"invalid_client"}"#);
        assert!(hint.contains("https://ehr.example.org/interface/smart/register-app.php"));
        assert!(!auth
            .token_remediation(r#"{"error":"invalid_grant"}"#)
            .contains("register-app"));
    }

    #[test]
    fn test_credential_state_freshness() {
        let buffer = Duration::from_secs(30);
        let mut state = CredentialState::default();
        assert!(!state.is_fresh(buffer));

        state.access_token = Some(secret_string("t".to_string()));
        state.expires_at = Some(Instant::now() + Duration::from_secs(10));
        assert!(!state.is_fresh(buffer));

        state.expires_at = Some(Instant::now() + Duration::from_secs(3600));
        assert!(state.is_fresh(buffer));
    }

    #[tokio::test]
    async fn test_invalidate_clears_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/clinic/token")
            .with_status(200)
            .with_body(r#"{"access_token":"abc","expires_in":3600}"#)
            .expect(2)
            .create_async()
            .await;

        let auth = AuthManager::new(&target(&server.url()), Client::new());
        auth.ensure_token().await.unwrap();
        assert!(auth.has_valid_token().await);

        auth.invalidate().await;
        assert!(!auth.has_valid_token().await);
        auth.ensure_token().await.unwrap();

        mock.assert_async().await;
    }
}
