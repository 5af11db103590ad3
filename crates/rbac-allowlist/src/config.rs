//! Settings read once per invocation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AllowlistError, Result};
use crate::input::latest_dataset;
use crate::store::StoreLayout;

/// Default store file, relative to the working directory.
pub const DEFAULT_EXCEPTIONS_PATH: &str = "exceptions.json";

/// Configuration for allow-list operations.
///
/// ```json
/// {
///   "exceptionsPath": "governance/exceptions.json",
///   "datasetDir": "exports",
///   "filenamePattern": "rbac_audit_",
///   "csaEnforced": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AllowlistConfig {
    /// Path of the exception store file.
    pub exceptions_path: PathBuf,

    /// Directory searched for dataset exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_dir: Option<PathBuf>,

    /// File name prefix of dataset exports in `dataset_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_pattern: Option<String>,

    /// When false, filtering is report-only and suppresses nothing.
    pub csa_enforced: bool,

    /// Layout used when the store file is created.
    pub layout: StoreLayout,

    /// Archive the previous store file before each overwrite.
    pub keep_history: bool,

    /// Refuse to save when the store file changed since it was loaded.
    pub optimistic_locking: bool,
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            exceptions_path: PathBuf::from(DEFAULT_EXCEPTIONS_PATH),
            dataset_dir: None,
            filename_pattern: None,
            csa_enforced: true,
            layout: StoreLayout::Flat,
            keep_history: false,
            optimistic_locking: false,
        }
    }
}

impl AllowlistConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AllowlistError::FileNotFound {
                path: path.to_path_buf(),
                what: "Configuration file".to_string(),
            },
            _ => AllowlistError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let config: AllowlistConfig = serde_json::from_str(&contents).map_err(|e| {
            AllowlistError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;

        config.check()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn with_exceptions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exceptions_path = path.into();
        self
    }

    pub fn with_dataset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dataset_dir = Some(dir.into());
        self
    }

    pub fn with_filename_pattern(mut self, prefix: impl Into<String>) -> Self {
        self.filename_pattern = Some(prefix.into());
        self
    }

    pub fn with_csa_enforced(mut self, enforced: bool) -> Self {
        self.csa_enforced = enforced;
        self
    }

    /// Resolve the dataset to filter: an explicit path wins, otherwise the
    /// newest file in `dataset_dir` named with `filename_pattern`.
    pub fn resolve_dataset(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }

        let dir = self.dataset_dir.as_ref().ok_or_else(|| {
            AllowlistError::Config("no dataset given and no datasetDir configured".to_string())
        })?;
        let prefix = self.filename_pattern.as_deref().unwrap_or("");

        latest_dataset(dir, prefix)
    }

    fn check(&self) -> Result<()> {
        if self.exceptions_path.as_os_str().is_empty() {
            return Err(AllowlistError::Config(
                "exceptionsPath must not be empty".to_string(),
            ));
        }
        if self.filename_pattern.is_some() && self.dataset_dir.is_none() {
            return Err(AllowlistError::Config(
                "filenamePattern requires datasetDir".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_recognized_options() {
        let file = config_file(
            r#"{"exceptionsPath": "gov/ex.json", "datasetDir": "exports",
                "filenamePattern": "rbac_", "csaEnforced": false}"#,
        );
        let config = AllowlistConfig::load(file.path()).unwrap();

        assert_eq!(config.exceptions_path, PathBuf::from("gov/ex.json"));
        assert_eq!(config.dataset_dir, Some(PathBuf::from("exports")));
        assert_eq!(config.filename_pattern.as_deref(), Some("rbac_"));
        assert!(!config.csa_enforced);
        assert_eq!(config.layout, StoreLayout::Flat);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let file = config_file("{}");
        assert_eq!(AllowlistConfig::load(file.path()).unwrap(), AllowlistConfig::default());
    }

    #[test]
    fn test_malformed_config() {
        let file = config_file(r#"{"csaEnforced": "yes"}"#);
        assert!(matches!(
            AllowlistConfig::load(file.path()),
            Err(AllowlistError::Config(_))
        ));

        let unknown = config_file(r#"{"exceptionPath": "typo.json"}"#);
        assert!(matches!(
            AllowlistConfig::load(unknown.path()),
            Err(AllowlistError::Config(_))
        ));

        let orphan_prefix = config_file(r#"{"filenamePattern": "rbac_"}"#);
        assert!(matches!(
            AllowlistConfig::load(orphan_prefix.path()),
            Err(AllowlistError::Config(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            AllowlistConfig::load("/nonexistent/config.json"),
            Err(AllowlistError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_dataset_prefers_explicit_path() {
        let config = AllowlistConfig::new();
        let explicit = Path::new("findings.csv");
        assert_eq!(config.resolve_dataset(Some(explicit)).unwrap(), explicit);
        assert!(matches!(
            config.resolve_dataset(None),
            Err(AllowlistError::Config(_))
        ));
    }
}
