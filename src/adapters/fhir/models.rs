//! Wire models for the target server's OAuth2 and FHIR endpoints

use serde::{Deserialize, Serialize};

/// Maximum characters of an error response body kept on a failed entry
pub const ERROR_BODY_MAX_CHARS: usize = 300;

/// Dynamic client registration request
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub application_type: String,
    pub redirect_uris: Vec<String>,
    pub client_name: String,
    pub token_endpoint_auth_method: String,
    pub contacts: Vec<String>,
    pub scope: String,
}

impl RegistrationRequest {
    /// Private client authenticating with `client_secret_post`
    pub fn private_client(base_url: &str, client_name: &str, contact: &str, scope: &str) -> Self {
        Self {
            application_type: "private".to_string(),
            redirect_uris: vec![format!("{base_url}/callback")],
            client_name: client_name.to_string(),
            token_endpoint_auth_method: "client_secret_post".to_string(),
            contacts: vec![contact.to_string()],
            scope: scope.to_string(),
        }
    }
}

/// Dynamic client registration response
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Outcome of one bundle entry submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryResult {
    /// Position of the entry in the submitted bundle
    pub index: usize,
    pub success: bool,
    /// Canonical `<ResourceType>/<id>` reference of the created resource
    pub fhir_id: Option<String>,
    /// HTTP status, 0 when no response was received
    pub http_status: u16,
    pub error: Option<String>,
}

impl EntryResult {
    pub fn created(index: usize, http_status: u16, fhir_id: Option<String>) -> Self {
        Self {
            index,
            success: true,
            fhir_id,
            http_status,
            error: None,
        }
    }

    pub fn failed(index: usize, http_status: u16, error: impl Into<String>) -> Self {
        Self {
            index,
            success: false,
            fhir_id: None,
            http_status,
            error: Some(error.into()),
        }
    }
}

/// Per-entry results for one bundle, in bundle order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub results: Vec<EntryResult>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SubmissionReport {
    pub fn from_results(results: Vec<EntryResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            failed: results.len() - succeeded,
            succeeded,
            results,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Extracts the server-assigned id from a create response body
///
/// Servers disagree on the field name: most return `id`, some only a `uuid`
/// surrogate.
pub fn created_id(body: &serde_json::Value) -> Option<String> {
    ["id", "uuid"].iter().find_map(|field| match body.get(*field) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Canonical reference form for a created resource
pub fn canonical_reference(resource_type: &str, id: &str) -> String {
    if id.starts_with(&format!("{resource_type}/")) {
        id.to_string()
    } else {
        format!("{resource_type}/{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_id_prefers_id_over_uuid() {
        assert_eq!(
            created_id(&json!({"id": "42", "uuid": "abc"})).as_deref(),
            Some("42")
        );
        assert_eq!(created_id(&json!({"uuid": "abc"})).as_deref(), Some("abc"));
        assert_eq!(created_id(&json!({"id": 7})).as_deref(), Some("7"));
        assert_eq!(created_id(&json!({"id": ""})), None);
        assert_eq!(created_id(&json!({})), None);
    }

    #[test]
    fn test_canonical_reference() {
        assert_eq!(canonical_reference("Observation", "12"), "Observation/12");
        assert_eq!(
            canonical_reference("Observation", "Observation/12"),
            "Observation/12"
        );
    }

    #[test]
    fn test_report_counts() {
        let report = SubmissionReport::from_results(vec![
            EntryResult::created(0, 201, Some("Observation/1".to_string())),
            EntryResult::failed(1, 400, "bad"),
            EntryResult::created(2, 201, None),
        ]);
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_registration_payload() {
        let request = RegistrationRequest::private_client(
            "https://ehr.example.org",
            "FactSync",
            "ops@example.org",
            "openid api:fhir",
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["application_type"], "private");
        assert_eq!(json["redirect_uris"][0], "https://ehr.example.org/callback");
        assert_eq!(json["token_endpoint_auth_method"], "client_secret_post");
        assert_eq!(json["contacts"][0], "ops@example.org");
    }
}
