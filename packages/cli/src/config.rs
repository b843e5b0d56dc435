use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use scribe_editor::plugins;
use scribe_editor::{EditorConfig, Plugin};

pub const DEFAULT_CONFIG_NAME: &str = "scribe.config.json";

/// Scribe configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor settings (history depth, grouping delay, ...)
    #[serde(default)]
    pub editor: EditorConfig,

    /// Built-in plugins to enable, by name
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,
}

fn default_plugins() -> Vec<String> {
    plugins::default_plugins()
        .iter()
        .map(|plugin| plugin.name().to_string())
        .collect()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        Self::load_file(&PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME))
    }

    /// Load config from a file, or the defaults if it does not exist
    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Resolve the configured plugin names. The core plugin is implied.
    pub fn resolve_plugins(&self) -> anyhow::Result<Vec<Arc<dyn Plugin>>> {
        self.plugins
            .iter()
            .filter(|name| name.as_str() != "core")
            .map(|name| plugins::by_name(name).ok_or_else(|| anyhow::anyhow!("Unknown plugin: {}", name)))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            plugins: default_plugins(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "editor": {
                "history": { "depth": 10, "newGroupDelay": 250 },
                "enableHistory": true
            },
            "plugins": ["history", "formatting"]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.history.depth, 10);
        assert_eq!(config.editor.history.new_group_delay, 250);
        assert_eq!(config.plugins, vec!["history", "formatting"]);
        assert_eq!(config.resolve_plugins().unwrap().len(), 2);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor, EditorConfig::default());
        assert_eq!(config.plugins.len(), 8);
        assert!(config.resolve_plugins().is_ok());
    }

    #[test]
    fn test_unknown_plugin() {
        let config: Config = serde_json::from_str(r#"{ "plugins": ["sparkles"] }"#).unwrap();
        let err = config.resolve_plugins().err().unwrap();
        assert!(err.to_string().contains("sparkles"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config.plugins, default_plugins());
    }
}
