//! Runtime configuration with source provenance
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Optional TOML file
//! 3. JSON overrides (CLI flags)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use super::merge::merge_layers;

/// Global switches read during instance construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Skip the development render proxy and perf marks
    pub production: bool,

    /// Record `component-perf-*` marks around initialization
    pub performance: bool,
}

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    File,
    Cli,
}

/// A contributing config layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl RuntimeConfig {
    /// Perf marks are only recorded outside production
    pub fn perf_enabled(&self) -> bool {
        self.performance && !self.production
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "production": self.production,
            "performance": self.performance,
        })
    }

    /// Deserialize a merged config object
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Build the effective config from defaults, a TOML file and overrides
    pub fn load(
        path: Option<&Path>,
        overrides: Option<Value>,
    ) -> Result<(Self, Vec<ConfigSource>), ConfigError> {
        let mut layers = vec![Self::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = path {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(overrides) = overrides {
            layers.push(overrides);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let config = Self::from_value(merge_layers(layers))?;
        Ok((config, sources))
    }
}

/// Load and parse a TOML file, returning the value and digest
pub(crate) fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes)
        .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
    let value: Value = toml::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

    Ok((value, digest))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_only() {
        let (config, sources) = RuntimeConfig::load(None, None).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "performance = true").unwrap();

        let (config, sources) =
            RuntimeConfig::load(Some(file.path()), Some(json!({"production": true}))).unwrap();

        assert!(config.performance);
        assert!(config.production);
        assert!(!config.perf_enabled());
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[1].origin, ConfigOrigin::File);
        assert_eq!(sources[1].digest.as_ref().unwrap().len(), 64);
    }

    #[test]
    fn test_override_wins_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "performance = true").unwrap();

        let (config, _) =
            RuntimeConfig::load(Some(file.path()), Some(json!({"performance": false}))).unwrap();
        assert!(!config.performance);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "devtools = true").unwrap();

        let err = RuntimeConfig::load(Some(file.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RuntimeConfig::load(Some(Path::new("/nonexistent/runtime.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "performance = ").unwrap();

        let err = RuntimeConfig::load(Some(file.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
