//! CLI command implementations
//!
//! Every command returns its process exit code:
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | sync finished with FAILED rows |
//! | 2 | configuration error |
//! | 3 | sync run aborted |
//! | 4 | connection or staging store error |
//! | 5 | fatal error |

pub mod promote;
pub mod status;
pub mod sync;
pub mod validate;

use crate::config::FactSyncConfig;
use crate::core::registry::CodeRegistry;
use crate::domain::Result;

pub(crate) const EXIT_SUCCESS: i32 = 0;
pub(crate) const EXIT_FAILED_ROWS: i32 = 1;
pub(crate) const EXIT_CONFIG_ERROR: i32 = 2;
pub(crate) const EXIT_ABORTED: i32 = 3;
pub(crate) const EXIT_CONNECTION_ERROR: i32 = 4;
pub(crate) const EXIT_FATAL: i32 = 5;

/// Built-in registry, overlaid with `[registry] path` when configured
pub(crate) fn load_registry(config: &FactSyncConfig) -> Result<CodeRegistry> {
    match &config.registry.path {
        Some(path) => CodeRegistry::from_file(path),
        None => Ok(CodeRegistry::builtin()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with_registry(path: Option<&str>) -> FactSyncConfig {
        let registry = path
            .map(|p| format!("[registry]\npath = \"{p}\"\n"))
            .unwrap_or_default();
        let toml = format!(
            r#"
            [target]
            base_url = "https://ehr.example.org"
            username = "u"
            password = "p"

            {registry}
            "#
        );
        toml::from_str(&toml).unwrap()
    }

    #[test]
    fn test_load_registry_builtin_by_default() {
        let registry = load_registry(&config_with_registry(None)).unwrap();
        assert!(registry.resolve("ER").is_some());
    }

    #[test]
    fn test_load_registry_missing_file_is_error() {
        let config = config_with_registry(Some("/nonexistent/registry.toml"));
        assert!(load_registry(&config).is_err());
    }

    #[test]
    fn test_load_registry_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[aliases]\n\"Estrogen Rcptr\" = \"ER Status\"").unwrap();
        let path = file.path().to_string_lossy().replace('\\', "/");

        let registry = load_registry(&config_with_registry(Some(&path))).unwrap();
        assert!(registry.resolve("estrogen rcptr").is_some());
    }
}
