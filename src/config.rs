//! Engine configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings fixed at plan compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Whether a reference to a key absent from the record is an evaluation
    /// error. When off, the value is the empty string.
    pub strict_attributes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_attributes: true,
        }
    }
}

impl EngineConfig {
    pub fn lenient() -> Self {
        Self {
            strict_attributes: false,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse engine config")
    }

    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_strict() {
        assert!(EngineConfig::default().strict_attributes);
        assert!(!EngineConfig::lenient().strict_attributes);
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json_str(r#"{"strict_attributes": false}"#).unwrap();
        assert_eq!(config, EngineConfig::lenient());

        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());

        assert!(EngineConfig::from_json_str(r#"{"strict": false}"#).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/logsql.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
