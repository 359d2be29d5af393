//! Fact-to-FHIR resource mapping
//!
//! The registry entry's [`ResourceKind`](crate::core::registry::ResourceKind)
//! selects one of two fixed-shape builders:
//!
//! - [`observation::build_observation`] for everything measured or observed
//! - [`allergy::build_allergy`] for medication allergies
//!
//! Both attach the same provenance note and evidence extensions.

pub mod allergy;
pub mod bundle;
pub mod mapper;
pub mod observation;
pub mod resource;
pub mod value;

pub use bundle::{Bundle, BundleEntry, BundleRequest};
pub use mapper::{MappingOptions, ResourceMapper, ResourceMapping};
pub use resource::{FhirResource, ObservationValue};

use crate::domain::fact::truncate_chars;
use crate::domain::StagedFact;
use resource::Extension;

/// Provenance note text, capped at `max_chars`
pub(crate) fn provenance_note(fact: &StagedFact, max_chars: usize) -> Option<String> {
    let text = fact.raw_text.trim();
    if text.is_empty() {
        None
    } else {
        Some(truncate_chars(text, max_chars))
    }
}

/// Evidence metadata extensions for the fact's session, file and confidence
pub(crate) fn evidence_extensions(fact: &StagedFact, base_url: &str) -> Vec<Extension> {
    let mut extensions = vec![Extension::string(
        format!("{base_url}/evidence-session-id"),
        fact.session_id.as_str(),
    )];

    if let Some(source_file) = fact.source_file.as_deref().filter(|s| !s.trim().is_empty()) {
        extensions.push(Extension::string(
            format!("{base_url}/source-file"),
            source_file,
        ));
    }

    extensions.push(Extension::decimal(
        format!("{base_url}/extraction-confidence"),
        fact.confidence,
    ));

    extensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FactId, NewFact, SessionId};
    use chrono::Utc;

    #[test]
    fn test_note_truncated_to_cap() {
        let fact = NewFact::new(SessionId::new("s").unwrap(), "ER", "positive", "x".repeat(300))
            .unwrap();
        let fact = StagedFact::from_new(FactId::new(1), fact, Utc::now());
        assert_eq!(provenance_note(&fact, 120).unwrap().chars().count(), 120);
    }

    #[test]
    fn test_extensions_skip_missing_source_file() {
        let fact = NewFact::new(SessionId::new("s-9").unwrap(), "ER", "positive", "ER +")
            .unwrap()
            .with_confidence(0.75);
        let fact = StagedFact::from_new(FactId::new(1), fact, Utc::now());

        let extensions = evidence_extensions(&fact, "https://example.org/sd");
        let urls: Vec<_> = extensions.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.org/sd/evidence-session-id",
                "https://example.org/sd/extraction-confidence"
            ]
        );
        assert_eq!(extensions[0].value_string.as_deref(), Some("s-9"));
        assert_eq!(extensions[1].value_decimal, Some(0.75));
    }
}
