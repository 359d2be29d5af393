//! Observation value decision tree
//!
//! 1. The registry entry declares a unit and the value contains a numeric
//!    token: `valueQuantity`.
//! 2. The normalized value is a clinical-status term: `valueCodeableConcept`
//!    coded in SNOMED CT.
//! 3. Anything else: `valueString`.
//!
//! An empty value yields no value element at all.

use super::resource::{CodeableConcept, Coding, ObservationValue, Quantity};
use crate::core::registry::CodeRegistryEntry;
use regex::Regex;
use std::sync::OnceLock;

pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Clinical-status vocabulary: normalized term, SNOMED code, display
const VOCABULARY: &[(&str, &str, &str)] = &[
    ("positive", "10828004", "Positive"),
    ("negative", "260385009", "Negative"),
    ("detected", "260373001", "Detected"),
    ("not detected", "260415000", "Not detected"),
    ("present", "52101004", "Present"),
    ("absent", "2667000", "Absent"),
    ("high", "75540009", "High"),
    ("low", "62482003", "Low"),
    ("normal", "17621005", "Normal"),
    ("equivocal", "42425007", "Equivocal"),
    ("unknown", "261665006", "Unknown"),
];

fn numeric_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[-+]?\d+(?:\.\d+)?").ok())
        .as_ref()
}

/// First numeric token in `value`
///
/// ```
/// use factsync::core::mapping::value::leading_number;
///
/// assert_eq!(leading_number("38.5 C"), Some(38.5));
/// assert_eq!(leading_number("BP 120/80"), Some(120.0));
/// assert_eq!(leading_number("none"), None);
/// ```
pub fn leading_number(value: &str) -> Option<f64> {
    numeric_pattern()?
        .find(value)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Lowercase, trimmed, with `-` and `_` read as spaces
pub fn normalize_term(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// SNOMED coding for a clinical-status term
pub fn vocabulary_coding(value: &str) -> Option<Coding> {
    let term = normalize_term(value);
    VOCABULARY
        .iter()
        .find(|(t, _, _)| *t == term)
        .map(|(_, code, display)| Coding::new(SNOMED_SYSTEM, *code, *display))
}

/// Chooses the `value[x]` element for an observation
pub fn observation_value(entry: &CodeRegistryEntry, raw_value: &str) -> Option<ObservationValue> {
    let value = raw_value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(unit) = &entry.unit {
        if let Some(number) = leading_number(value) {
            return Some(ObservationValue::Quantity(Quantity {
                value: number,
                unit: unit.display.clone(),
                system: unit.system().to_string(),
                code: unit.code.clone(),
            }));
        }
    }

    if let Some(coding) = vocabulary_coding(value) {
        return Some(ObservationValue::CodeableConcept(
            CodeableConcept::from_coding(coding).with_text(value),
        ));
    }

    Some(ObservationValue::String(value.to_string()))
}
