//! Observation builder

use super::mapper::MappingOptions;
use super::resource::{
    Annotation, CodeableConcept, Coding, Observation, Reference,
};
use super::value::observation_value;
use super::{evidence_extensions, provenance_note};
use crate::core::registry::{CodeRegistryEntry, LOINC_SYSTEM, OBSERVATION_CATEGORY_SYSTEM};
use crate::domain::{PatientId, StagedFact};

/// Builds a final-status Observation for one champion fact
pub fn build_observation(
    entry: &CodeRegistryEntry,
    fact: &StagedFact,
    patient: &PatientId,
    effective: &str,
    options: &MappingOptions,
) -> Observation {
    let category = CodeableConcept::from_coding(Coding::new(
        OBSERVATION_CATEGORY_SYSTEM,
        entry.category.as_str(),
        entry.category_display.as_str(),
    ));

    let code = CodeableConcept::from_coding(Coding::new(
        LOINC_SYSTEM,
        entry.code.as_str(),
        entry.display.as_str(),
    ))
    .with_text(entry.display.as_str());

    Observation {
        status: "final".to_string(),
        category: vec![category],
        code,
        subject: Reference {
            reference: patient.reference(),
        },
        effective_date_time: effective.to_string(),
        value: observation_value(entry, &fact.marker_value),
        note: provenance_note(fact, options.note_max_chars)
            .map(|text| vec![Annotation { text }])
            .unwrap_or_default(),
        extension: evidence_extensions(fact, &options.extension_base_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapping::resource::ObservationValue;
    use crate::core::registry::CodeRegistry;
    use crate::domain::{FactId, NewFact, SessionId};
    use chrono::Utc;

    fn staged(marker: &str, value: &str, raw: &str) -> StagedFact {
        let fact = NewFact::new(SessionId::new("sess-1").unwrap(), marker, value, raw)
            .unwrap()
            .with_source_file("labs.pdf")
            .with_confidence(0.8);
        StagedFact::from_new(FactId::new(1), fact, Utc::now())
    }

    #[test]
    fn test_er_positive_is_coded() {
        let registry = CodeRegistry::builtin();
        let fact = staged("ER", "positive", "ER: positive (90%)");
        let obs = build_observation(
            registry.resolve("ER").unwrap(),
            &fact,
            &PatientId::new("42").unwrap(),
            "2025-03-01T10:00:00Z",
            &MappingOptions::default(),
        );

        assert_eq!(obs.status, "final");
        assert_eq!(obs.category[0].coding[0].code.as_deref(), Some("laboratory"));
        assert_eq!(obs.category[0].coding[0].display.as_deref(), Some("Laboratory"));
        assert_eq!(obs.code.coding[0].code.as_deref(), Some("85336-6"));
        assert_eq!(obs.subject.reference, "Patient/42");
        match &obs.value {
            Some(ObservationValue::CodeableConcept(cc)) => {
                assert_eq!(cc.coding[0].display.as_deref(), Some("Positive"));
            }
            other => panic!("expected coded value, got {other:?}"),
        }
        assert_eq!(obs.note[0].text, "ER: positive (90%)");
        assert_eq!(obs.extension.len(), 3);
    }

    #[test]
    fn test_temp_is_quantity_in_json() {
        let registry = CodeRegistry::builtin();
        let fact = staged("Temp", "38.5", "Temp 38.5 C");
        let obs = build_observation(
            registry.resolve("Temp").unwrap(),
            &fact,
            &PatientId::new("42").unwrap(),
            "2025-03-01T10:00:00Z",
            &MappingOptions::default(),
        );

        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["valueQuantity"]["value"], 38.5);
        assert_eq!(json["valueQuantity"]["unit"], "°C");
        assert_eq!(json["effectiveDateTime"], "2025-03-01T10:00:00Z");
    }
}
