//! Code registry entry types

use serde::{Deserialize, Serialize};
use std::fmt;

/// LOINC code system URI
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// UCUM unit system URI
pub const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// HL7 observation category code system URI
pub const OBSERVATION_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/observation-category";

/// Target resource shape for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Rendered as a FHIR `Observation`
    Observation,
    /// Rendered as a FHIR `AllergyIntolerance`
    AllergyIntolerance,
}

impl ResourceKind {
    /// FHIR resource type name, also the create endpoint path segment
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Observation => "Observation",
            ResourceKind::AllergyIntolerance => "AllergyIntolerance",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical unit attached to numeric markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    /// Human readable symbol, e.g. `°C`
    pub display: String,
    /// UCUM code, e.g. `Cel`
    pub code: String,
}

impl UnitOfMeasure {
    pub fn new(display: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            code: code.into(),
        }
    }

    /// Unit system URI
    pub fn system(&self) -> &'static str {
        UCUM_SYSTEM
    }
}

/// Canonical marker definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRegistryEntry {
    /// Canonical marker name, e.g. `ER Status`
    pub key: String,
    /// LOINC code
    pub code: String,
    /// LOINC display text
    pub display: String,
    /// Which resource builder handles this marker
    pub kind: ResourceKind,
    /// Category code, e.g. `vital-signs`
    pub category: String,
    /// Category display text, e.g. `Vital Signs`
    pub category_display: String,
    /// Unit for numeric values, if the marker is a measurement
    pub unit: Option<UnitOfMeasure>,
}

impl CodeRegistryEntry {
    /// Creates an entry whose category display is derived from the category code
    pub fn new(
        key: impl Into<String>,
        code: impl Into<String>,
        display: impl Into<String>,
        kind: ResourceKind,
        category: impl Into<String>,
    ) -> Self {
        let category = category.into();
        Self {
            key: key.into(),
            code: code.into(),
            display: display.into(),
            kind,
            category_display: category_display_for(&category),
            category,
            unit: None,
        }
    }

    /// Attaches a unit of measure
    pub fn with_unit(mut self, display: impl Into<String>, code: impl Into<String>) -> Self {
        self.unit = Some(UnitOfMeasure::new(display, code));
        self
    }
}

/// Title-cases a hyphenated category code: `vital-signs` becomes `Vital Signs`
pub fn category_display_for(category: &str) -> String {
    category
        .split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
