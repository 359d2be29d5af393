//! AllergyIntolerance builder
//!
//! The reaction block is deliberately generic: extracted facts name the
//! substance but carry no manifestation or severity detail, so one fixed
//! "adverse drug reaction" manifestation of mild severity is recorded until
//! richer source data exists.

use super::mapper::MappingOptions;
use super::resource::{
    AllergyIntolerance, AllergyReaction, Annotation, CodeableConcept, Coding, Reference,
};
use super::value::SNOMED_SYSTEM;
use super::{evidence_extensions, provenance_note};
use crate::core::registry::{CodeRegistryEntry, LOINC_SYSTEM};
use crate::domain::{PatientId, StagedFact};

const CLINICAL_STATUS_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical";
const VERIFICATION_STATUS_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/allergyintolerance-verification";
const RXNORM_SYSTEM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";

const MANIFESTATION_CODE: &str = "418038007";
const MANIFESTATION_DISPLAY: &str = "Propensity to adverse reactions to drug";
const MANIFESTATION_TEXT: &str = "Adverse drug reaction";

/// Builds an unconfirmed, active medication allergy for one champion fact
///
/// The registry code fills `code.coding`; the extracted substance is only
/// used as text.
pub fn build_allergy(
    entry: &CodeRegistryEntry,
    fact: &StagedFact,
    patient: &PatientId,
    recorded: &str,
    options: &MappingOptions,
) -> AllergyIntolerance {
    let substance = fact.value().to_string();
    let reference = Reference {
        reference: patient.reference(),
    };

    let code = CodeableConcept::from_coding(Coding::new(
        LOINC_SYSTEM,
        entry.code.as_str(),
        entry.display.as_str(),
    ))
    .with_text(substance.as_str());

    let reaction = AllergyReaction {
        substance: CodeableConcept::from_coding(Coding::display_only(
            RXNORM_SYSTEM,
            substance.as_str(),
        ))
        .with_text(substance.as_str()),
        manifestation: vec![CodeableConcept::from_coding(Coding::new(
            SNOMED_SYSTEM,
            MANIFESTATION_CODE,
            MANIFESTATION_DISPLAY,
        ))
        .with_text(MANIFESTATION_TEXT)],
        severity: "mild".to_string(),
    };

    AllergyIntolerance {
        clinical_status: CodeableConcept::from_coding(Coding::new(
            CLINICAL_STATUS_SYSTEM,
            "active",
            "Active",
        )),
        verification_status: CodeableConcept::from_coding(Coding::new(
            VERIFICATION_STATUS_SYSTEM,
            "unconfirmed",
            "Unconfirmed",
        )),
        allergy_type: "allergy".to_string(),
        category: vec!["medication".to_string()],
        code,
        patient: reference.clone(),
        subject: reference,
        recorded_date: recorded.to_string(),
        reaction: vec![reaction],
        note: provenance_note(fact, options.note_max_chars)
            .map(|text| vec![Annotation { text }])
            .unwrap_or_default(),
        extension: evidence_extensions(fact, &options.extension_base_url),
    }
}
