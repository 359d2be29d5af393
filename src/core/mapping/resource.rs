//! Typed FHIR R4 resource model
//!
//! Only the elements FactSync emits are modelled. Every type serializes to
//! the FHIR JSON shape; nothing here is parsed back.

use crate::core::registry::ResourceKind;
use serde::Serialize;

/// `Coding` datatype
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Coding with all three elements set
    pub fn new(
        system: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
    ) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: Some(display.into()),
        }
    }

    /// Coding with a system and display but no code
    pub fn display_only(system: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: None,
            display: Some(display.into()),
        }
    }
}

/// `CodeableConcept` datatype
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn from_coding(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// `Reference` datatype
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub reference: String,
}

/// `Quantity` datatype with a UCUM unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
    pub system: String,
    pub code: String,
}

/// `Annotation` datatype, text only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub text: String,
}

/// Extension carrying a string or decimal value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_decimal: Option<f64>,
}

impl Extension {
    pub fn string(url: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            value_string: Some(value.into()),
            value_decimal: None,
        }
    }

    pub fn decimal(url: impl Into<String>, value: f64) -> Self {
        Self {
            url: url.into(),
            value_string: None,
            value_decimal: Some(value),
        }
    }
}

/// `Observation.value[x]` choice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObservationValue {
    #[serde(rename = "valueQuantity")]
    Quantity(Quantity),
    #[serde(rename = "valueCodeableConcept")]
    CodeableConcept(CodeableConcept),
    #[serde(rename = "valueString")]
    String(String),
}

/// Observation resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub status: String,
    pub category: Vec<CodeableConcept>,
    pub code: CodeableConcept,
    pub subject: Reference,
    pub effective_date_time: String,
    #[serde(flatten)]
    pub value: Option<ObservationValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

/// One entry of `AllergyIntolerance.reaction`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllergyReaction {
    pub substance: CodeableConcept,
    pub manifestation: Vec<CodeableConcept>,
    pub severity: String,
}

/// AllergyIntolerance resource
///
/// `subject` mirrors `patient` so consumers may read either element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyIntolerance {
    pub clinical_status: CodeableConcept,
    pub verification_status: CodeableConcept,
    #[serde(rename = "type")]
    pub allergy_type: String,
    pub category: Vec<String>,
    pub code: CodeableConcept,
    pub patient: Reference,
    pub subject: Reference,
    pub recorded_date: String,
    pub reaction: Vec<AllergyReaction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

/// Any resource FactSync creates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "resourceType")]
pub enum FhirResource {
    Observation(Observation),
    AllergyIntolerance(AllergyIntolerance),
}

impl FhirResource {
    /// Kind of the wrapped resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            FhirResource::Observation(_) => ResourceKind::Observation,
            FhirResource::AllergyIntolerance(_) => ResourceKind::AllergyIntolerance,
        }
    }

    /// Subject reference of the wrapped resource
    pub fn subject(&self) -> &Reference {
        match self {
            FhirResource::Observation(o) => &o.subject,
            FhirResource::AllergyIntolerance(a) => &a.subject,
        }
    }
}
