//! Transaction bundle assembled from mapped resources
//!
//! The target server has no atomic multi-resource transaction, so the bundle
//! is never posted as a whole. It is the ordered work list the submission
//! client walks entry by entry.

use super::resource::FhirResource;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// `Bundle.entry.request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleRequest {
    pub method: String,
    pub url: String,
}

/// One resource and its create intent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: String,
    pub resource: FhirResource,
    pub request: BundleRequest,
}

impl BundleEntry {
    /// POST entry with a fresh `urn:uuid` full URL
    pub fn create(resource: FhirResource) -> Self {
        let url = resource.kind().as_str().to_string();
        Self {
            full_url: format!("urn:uuid:{}", Uuid::new_v4()),
            resource,
            request: BundleRequest {
                method: "POST".to_string(),
                url,
            },
        }
    }
}

/// FHIR transaction bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,
    pub id: String,
    #[serde(rename = "type")]
    pub bundle_type: String,
    pub timestamp: String,
    pub total: usize,
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    /// Transaction bundle over `entries`, in order
    pub fn transaction(entries: Vec<BundleEntry>, now: DateTime<Utc>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            id: Uuid::new_v4().to_string(),
            bundle_type: "transaction".to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            total: entries.len(),
            entry: entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }
}
