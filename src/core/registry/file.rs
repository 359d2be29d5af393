//! TOML overlay format for the code registry
//!
//! ```toml
//! [[entries]]
//! key = "Weight"
//! code = "29463-7"
//! display = "Body weight"
//! kind = "Observation"
//! category = "vital-signs"
//! unit_display = "kg"
//! unit_code = "kg"
//!
//! [aliases]
//! WT = "Weight"
//! ```

use super::entry::{category_display_for, CodeRegistryEntry, ResourceKind, UnitOfMeasure};
use super::lookup::CodeRegistry;
use crate::domain::{FactSyncError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub(super) struct RegistryFile {
    #[serde(default)]
    entries: Vec<RegistryFileEntry>,

    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFileEntry {
    key: String,
    code: String,
    display: String,
    kind: ResourceKind,
    category: String,
    #[serde(default)]
    category_display: Option<String>,
    #[serde(default)]
    unit_display: Option<String>,
    #[serde(default)]
    unit_code: Option<String>,
}

impl RegistryFileEntry {
    fn into_entry(self) -> Result<CodeRegistryEntry> {
        if self.key.trim().is_empty() || self.code.trim().is_empty() {
            return Err(FactSyncError::Configuration(
                "Registry entries require a non-empty key and code".to_string(),
            ));
        }

        let unit = match (self.unit_display, self.unit_code) {
            (Some(display), Some(code)) => Some(UnitOfMeasure::new(display, code)),
            (None, None) => None,
            _ => {
                return Err(FactSyncError::Configuration(format!(
                    "Registry entry '{}' must set both unit_display and unit_code, or neither",
                    self.key
                )))
            }
        };

        let category_display = self
            .category_display
            .unwrap_or_else(|| category_display_for(&self.category));

        Ok(CodeRegistryEntry {
            key: self.key,
            code: self.code,
            display: self.display,
            kind: self.kind,
            category: self.category,
            category_display,
            unit,
        })
    }
}

impl RegistryFile {
    /// Inserts file entries first so aliases may target them
    pub(super) fn apply(self, registry: &mut CodeRegistry) -> Result<()> {
        for entry in self.entries {
            let entry = entry.into_entry()?;
            if registry.contains_key(&entry.key) {
                tracing::debug!(key = %entry.key, "Registry file overrides built-in entry");
            }
            registry.insert(entry);
        }

        for (alias, key) in &self.aliases {
            registry.add_alias(alias, key)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_unit_rejected() {
        let toml = r#"
[[entries]]
key = "Weight"
code = "29463-7"
display = "Body weight"
kind = "Observation"
category = "vital-signs"
unit_display = "kg"
"#;
        let file: RegistryFile = toml::from_str(toml).unwrap();
        let mut registry = CodeRegistry::empty();
        assert!(file.apply(&mut registry).is_err());
    }

    #[test]
    fn test_unknown_kind_rejected_at_parse() {
        let toml = r#"
[[entries]]
key = "Weight"
code = "29463-7"
display = "Body weight"
kind = "Procedure"
category = "vital-signs"
"#;
        assert!(toml::from_str::<RegistryFile>(toml).is_err());
    }

    #[test]
    fn test_explicit_category_display_kept() {
        let toml = r#"
[[entries]]
key = "Imaging"
code = "18748-4"
display = "Diagnostic imaging study"
kind = "Observation"
category = "imaging"
category_display = "Imaging Study"
"#;
        let file: RegistryFile = toml::from_str(toml).unwrap();
        let mut registry = CodeRegistry::empty();
        file.apply(&mut registry).unwrap();
        assert_eq!(
            registry.resolve("imaging").unwrap().category_display,
            "Imaging Study"
        );
    }
}
