//! Built-in marker table
//!
//! Covers the markers the upstream extractor is known to emit: receptor
//! panel results, vital signs, allergy statements and narrative sections.

use super::entry::{CodeRegistryEntry, ResourceKind};

/// Built-in canonical entries
pub fn builtin_entries() -> Vec<CodeRegistryEntry> {
    use ResourceKind::{AllergyIntolerance, Observation};

    vec![
        // Physical therapy
        CodeRegistryEntry::new(
            "PT Duration",
            "61473-5",
            "Physical therapy episode of care [Duration]",
            Observation,
            "therapy",
        ),
        CodeRegistryEntry::new(
            "PT Note",
            "11508-9",
            "Physical therapy Consult note",
            Observation,
            "clinical-note",
        ),
        // Receptor panel
        CodeRegistryEntry::new(
            "ER Status",
            "85336-6",
            "Estrogen receptor Ag [Presence] in Breast cancer specimen by Immune stain",
            Observation,
            "laboratory",
        ),
        CodeRegistryEntry::new(
            "PR Status",
            "85339-0",
            "Progesterone receptor Ag [Presence] in Breast cancer specimen by Immune stain",
            Observation,
            "laboratory",
        ),
        CodeRegistryEntry::new(
            "HER2 Status",
            "85337-4",
            "HER2 [Presence] in Breast cancer specimen by Immune stain",
            Observation,
            "laboratory",
        ),
        CodeRegistryEntry::new(
            "Biopsy Report",
            "11526-1",
            "Pathology study observation",
            Observation,
            "laboratory",
        ),
        // Allergies
        CodeRegistryEntry::new(
            "Drug Allergy",
            "48765-2",
            "Allergies and adverse drug reactions",
            AllergyIntolerance,
            "medication",
        ),
        // History and problems
        CodeRegistryEntry::new(
            "Med History",
            "10160-0",
            "History of Medication use Narrative",
            Observation,
            "social-history",
        ),
        CodeRegistryEntry::new(
            "Problem List",
            "11450-4",
            "Problem list - Reported",
            Observation,
            "clinical-note",
        ),
        // Vital signs
        CodeRegistryEntry::new(
            "Temp",
            "8310-5",
            "Body temperature",
            Observation,
            "vital-signs",
        )
        .with_unit("°C", "Cel"),
        CodeRegistryEntry::new("Heart Rate", "8867-4", "Heart rate", Observation, "vital-signs")
            .with_unit("beats/min", "/min"),
        CodeRegistryEntry::new(
            "BP Sys",
            "8480-6",
            "Systolic blood pressure",
            Observation,
            "vital-signs",
        )
        .with_unit("mmHg", "mm[Hg]"),
        CodeRegistryEntry::new(
            "BP Dia",
            "8462-4",
            "Diastolic blood pressure",
            Observation,
            "vital-signs",
        )
        .with_unit("mmHg", "mm[Hg]"),
        CodeRegistryEntry::new(
            "O2 Sat",
            "2708-6",
            "Oxygen saturation in Arterial blood",
            Observation,
            "vital-signs",
        )
        .with_unit("%", "%"),
        // Social and narrative sections
        CodeRegistryEntry::new(
            "Tobacco",
            "72166-2",
            "Tobacco smoking status",
            Observation,
            "social-history",
        ),
        CodeRegistryEntry::new(
            "Social History",
            "29762-2",
            "Social history Narrative",
            Observation,
            "social-history",
        ),
        CodeRegistryEntry::new(
            "Encounter",
            "46240-8",
            "History of Hospitalizations+Outpatient visits Narrative",
            Observation,
            "clinical-note",
        ),
        CodeRegistryEntry::new(
            "Surgical Note",
            "11504-8",
            "Surgical operation note",
            Observation,
            "clinical-note",
        ),
    ]
}

/// Built-in aliases, keyed by normalized spelling
pub fn builtin_aliases() -> Vec<(&'static str, &'static str)> {
    vec![
        ("ER", "ER Status"),
        ("PR", "PR Status"),
        ("HER2", "HER2 Status"),
        ("TEMPERATURE", "Temp"),
        ("HEARTRATE", "Heart Rate"),
        ("HEART_RATE", "Heart Rate"),
        ("BPS", "BP Sys"),
        ("BPD", "BP Dia"),
        ("O2SAT", "O2 Sat"),
        ("SPO2", "O2 Sat"),
        ("TOBACCO", "Tobacco"),
        ("SMOKING", "Tobacco"),
        ("ALLERGY", "Drug Allergy"),
        ("DRUG_ALLERGY", "Drug Allergy"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_keys_unique() {
        let entries = builtin_entries();
        let keys: HashSet<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys.len(), entries.len());
    }

    #[test]
    fn test_builtin_aliases_point_at_entries() {
        let entries = builtin_entries();
        for (alias, target) in builtin_aliases() {
            assert!(
                entries.iter().any(|e| e.key == target),
                "alias {alias} points at missing key {target}"
            );
        }
    }

    #[test]
    fn test_only_drug_allergy_is_allergy_kind() {
        let allergy: Vec<_> = builtin_entries()
            .into_iter()
            .filter(|e| e.kind == ResourceKind::AllergyIntolerance)
            .map(|e| e.key)
            .collect();
        assert_eq!(allergy, vec!["Drug Allergy".to_string()]);
    }
}
