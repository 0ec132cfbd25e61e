//! User-tunable scan settings.
//!
//! Settings come from an optional JSON file; every field is optional and
//! falls back to the built-in default. Command-line flags are applied on top
//! by the binary.
use crate::error::ConfigError;
use crate::model::{
    ScanRequest, DEFAULT_INITIAL_BATCH_SIZE, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_DEPTH,
};
use crate::policy::{IgnoreSet, DEFAULT_IGNORE_PATTERNS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the settings file.
pub const CONFIG_ENV_VAR: &str = "CDSLEUTH_CONFIG";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub max_depth: usize,
    pub use_ignore_patterns: bool,
    pub initial_batch_size: usize,
    pub max_batch_size: usize,
    /// Directory names pruned when `use_ignore_patterns` is set.
    pub ignore_patterns: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            use_ignore_patterns: true,
            initial_batch_size: DEFAULT_INITIAL_BATCH_SIZE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ScanSettings {
    /// Parse settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load from the file named by [`CONFIG_ENV_VAR`], or defaults if unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(&PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    /// Build a request for scanning `root` with these settings.
    pub fn request_for(&self, root: impl Into<PathBuf>) -> ScanRequest {
        ScanRequest::new(root)
            .with_max_depth(self.max_depth)
            .with_ignore_patterns(self.use_ignore_patterns)
            .with_ignore_set(IgnoreSet::from_names(self.ignore_patterns.iter().cloned()))
            .with_batch_sizes(self.initial_batch_size, self.max_batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_depth": 2, "ignore_patterns": ["tmp"] }}"#).unwrap();

        let settings = ScanSettings::load(file.path()).unwrap();
        assert_eq!(settings.max_depth, 2);
        assert_eq!(settings.ignore_patterns, vec!["tmp".to_string()]);
        assert!(settings.use_ignore_patterns);
        assert_eq!(settings.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "max_depth = 2").unwrap();
        assert!(matches!(
            ScanSettings::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            ScanSettings::load(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn request_carries_settings() {
        let settings = ScanSettings {
            max_depth: 3,
            use_ignore_patterns: false,
            initial_batch_size: 10,
            max_batch_size: 40,
            ignore_patterns: vec!["x".into()],
        };
        let req = settings.request_for("/srv");
        assert_eq!(req.root, PathBuf::from("/srv"));
        assert_eq!(req.max_depth, 3);
        assert!(!req.use_ignore_patterns);
        assert_eq!((req.initial_batch_size, req.max_batch_size), (10, 40));
        assert!(req.ignore_set.should_ignore("x"));
    }
}
