//! Marker name resolution
//!
//! The registry maps the free-text marker names written by the extractor to
//! canonical [`CodeRegistryEntry`] values. Resolution tries, in order:
//!
//! 1. exact key match
//! 2. case-insensitive match on the trimmed name
//! 3. alias lookup on the normalized name (uppercase, spaces and hyphens
//!    turned into `_`), then with underscores removed, then plain uppercase
//!
//! A miss is not an error. It is the "unknown marker" outcome consumed by
//! prescreening.

use super::builtin::{builtin_aliases, builtin_entries};
use super::entry::CodeRegistryEntry;
use super::file::RegistryFile;
use crate::domain::{FactSyncError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Read-only lookup table from marker names to codes
#[derive(Debug, Clone, Default)]
pub struct CodeRegistry {
    entries: BTreeMap<String, CodeRegistryEntry>,
    lowercase_keys: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

impl CodeRegistry {
    /// Creates an empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the registry with the built-in marker table
    ///
    /// # Examples
    ///
    /// ```
    /// use factsync::core::registry::CodeRegistry;
    ///
    /// let registry = CodeRegistry::builtin();
    /// let entry = registry.resolve("er").unwrap();
    /// assert_eq!(entry.code, "85336-6");
    /// assert!(registry.resolve("Ki-67").is_none());
    /// ```
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for entry in builtin_entries() {
            registry.insert(entry);
        }
        for (alias, key) in builtin_aliases() {
            registry.aliases.insert(alias.to_string(), key.to_string());
        }
        registry
    }

    /// Loads the built-in table and overlays entries and aliases from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an alias
    /// points at a key that exists in neither the file nor the built-in table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FactSyncError::Configuration(format!(
                "Failed to read code registry {}: {e}",
                path.display()
            ))
        })?;

        let registry = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            entries = registry.len(),
            aliases = registry.alias_count(),
            "Code registry loaded"
        );
        Ok(registry)
    }

    /// Same as [`CodeRegistry::from_file`] but from an in-memory TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(contents)?;
        let mut registry = Self::builtin();
        file.apply(&mut registry)?;
        Ok(registry)
    }

    /// Adds or replaces a canonical entry
    pub fn insert(&mut self, entry: CodeRegistryEntry) {
        self.lowercase_keys
            .insert(entry.key.trim().to_lowercase(), entry.key.clone());
        self.entries.insert(entry.key.clone(), entry);
    }

    /// Adds an alias, normalizing its spelling
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is not a canonical entry.
    pub fn add_alias(&mut self, alias: &str, key: &str) -> Result<()> {
        if !self.entries.contains_key(key) {
            return Err(FactSyncError::Configuration(format!(
                "Alias '{alias}' points at unknown registry key '{key}'"
            )));
        }
        self.aliases.insert(normalize_alias(alias), key.to_string());
        Ok(())
    }

    /// Resolves a raw marker name to its canonical entry
    pub fn resolve(&self, raw_name: &str) -> Option<&CodeRegistryEntry> {
        if let Some(entry) = self.entries.get(raw_name) {
            return Some(entry);
        }

        let lower = raw_name.trim().to_lowercase();
        if let Some(key) = self.lowercase_keys.get(&lower) {
            return self.entries.get(key);
        }

        let normalized = normalize_alias(raw_name);
        let collapsed = normalized.replace('_', "");
        let upper = raw_name.trim().to_uppercase();

        [normalized, collapsed, upper]
            .iter()
            .find_map(|candidate| self.aliases.get(candidate))
            .and_then(|key| self.entries.get(key))
    }

    /// Resolves and returns the LOINC code only
    pub fn resolve_code(&self, raw_name: &str) -> Option<&str> {
        self.resolve(raw_name).map(|entry| entry.code.as_str())
    }

    /// Number of canonical entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of aliases
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Canonical entries in key order
    pub fn entries(&self) -> impl Iterator<Item = &CodeRegistryEntry> {
        self.entries.values()
    }

    /// True when `key` is a canonical entry key
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Uppercases and turns spaces and hyphens into underscores
pub fn normalize_alias(raw: &str) -> String {
    raw.trim().to_uppercase().replace([' ', '-'], "_")
}
