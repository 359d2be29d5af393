//! Resource mapper
//!
//! Turns ordered champions into an ordered bundle, one entry per champion.
//! The orchestrator compares the entry count with the champion count and
//! treats any difference as a run-level mapping failure.

use super::allergy::build_allergy;
use super::bundle::{Bundle, BundleEntry};
use super::observation::build_observation;
use super::resource::FhirResource;
use crate::config::MappingConfig;
use crate::core::registry::{CodeRegistry, ResourceKind};
use crate::domain::{PatientId, Result, StagedFact};
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

/// Mapping knobs taken from `[mapping]`
#[derive(Debug, Clone)]
pub struct MappingOptions {
    pub note_max_chars: usize,
    pub extension_base_url: String,
}

impl Default for MappingOptions {
    fn default() -> Self {
        MappingConfig::default().into()
    }
}

impl From<MappingConfig> for MappingOptions {
    fn from(config: MappingConfig) -> Self {
        Self {
            note_max_chars: config.note_max_chars,
            extension_base_url: config.extension_base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Maps champions to a bundle
///
/// Implementations must return entries in champion order. Returning fewer
/// entries than champions is allowed and is how a mapper signals it could not
/// build a resource.
pub trait ResourceMapping: Send + Sync {
    fn map_champions(
        &self,
        champions: &[&StagedFact],
        patient: &PatientId,
        effective: DateTime<Utc>,
    ) -> Result<Bundle>;
}

/// Registry-driven mapper
pub struct ResourceMapper {
    registry: Arc<CodeRegistry>,
    options: MappingOptions,
}

impl ResourceMapper {
    pub fn new(registry: Arc<CodeRegistry>, options: MappingOptions) -> Self {
        Self { registry, options }
    }

    /// Builds the resource for one fact, or `None` when its marker is unknown
    pub fn build_resource(
        &self,
        fact: &StagedFact,
        patient: &PatientId,
        effective: DateTime<Utc>,
    ) -> Option<FhirResource> {
        let entry = self.registry.resolve(&fact.marker_name)?;
        let timestamp = effective.to_rfc3339_opts(SecondsFormat::Secs, true);

        Some(match entry.kind {
            ResourceKind::Observation => FhirResource::Observation(build_observation(
                entry,
                fact,
                patient,
                &timestamp,
                &self.options,
            )),
            ResourceKind::AllergyIntolerance => FhirResource::AllergyIntolerance(build_allergy(
                entry,
                fact,
                patient,
                &timestamp,
                &self.options,
            )),
        })
    }
}

impl ResourceMapping for ResourceMapper {
    fn map_champions(
        &self,
        champions: &[&StagedFact],
        patient: &PatientId,
        effective: DateTime<Utc>,
    ) -> Result<Bundle> {
        let mut entries = Vec::with_capacity(champions.len());

        for fact in champions {
            match self.build_resource(fact, patient, effective) {
                Some(resource) => entries.push(BundleEntry::create(resource)),
                None => {
                    tracing::warn!(
                        fact_id = %fact.id,
                        marker = %fact.marker_name,
                        "No registry entry for champion, resource not built"
                    );
                }
            }
        }

        let bundle = Bundle::transaction(entries, effective);
        tracing::debug!(
            champions = champions.len(),
            entries = bundle.len(),
            bundle_id = %bundle.id,
            "Mapped champions to bundle"
        );
        Ok(bundle)
    }
}
