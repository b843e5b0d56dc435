use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{EditorError, EditorResult};

/// Undo history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    /// Maximum number of undo groups kept; older groups are dropped
    pub depth: usize,

    /// Milliseconds after which a new edit starts a new undo group
    pub new_group_delay: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            depth: 100,
            new_group_delay: 500,
        }
    }
}

/// Editor configuration (camelCase JSON, every field optional)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub history: HistoryConfig,

    /// Record undo history at all
    pub enable_history: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            enable_history: true,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(source: &str) -> EditorResult<Self> {
        serde_json::from_str(source).map_err(|e| EditorError::Config(e.to_string()))
    }

    /// Load config from a file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> EditorResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| EditorError::Config(format!("{}: {}", path.display(), e)))?;
            Self::from_json_str(&content)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "history": { "depth": 20, "newGroupDelay": 1000 },
            "enableHistory": false
        }"#;

        let config = EditorConfig::from_json_str(json).unwrap();
        assert_eq!(config.history.depth, 20);
        assert_eq!(config.history.new_group_delay, 1000);
        assert!(!config.enable_history);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EditorConfig::from_json_str(r#"{ "history": { "depth": 5 } }"#).unwrap();
        assert_eq!(config.history.depth, 5);
        assert_eq!(config.history.new_group_delay, 500);
        assert!(config.enable_history);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history.depth, 100);
        assert!(config.enable_history);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = EditorConfig::load(Path::new("/nonexistent/scribe.config.json")).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            EditorConfig::from_json_str("{ depth"),
            Err(EditorError::Config(_))
        ));
    }
}
