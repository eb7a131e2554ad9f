//! Configuration defaults, optionally loaded from a JSON file
//!
//! The file lives in the platform config dir (`solverd/config.json`) and only
//! carries solve defaults; the API credential always comes from the CLI or
//! the environment.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Solve-run defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_model: String,
    pub default_num_agents: u32,
    pub default_timeout_secs: Option<u64>,
    pub default_max_iterations: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_model: "google/gemini-2.5-pro".to_string(),
            default_num_agents: 10,
            default_timeout_secs: None,
            default_max_iterations: 30,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("solverd").join("config.json"))
    }

    /// Load from the given path, or the default location when None
    ///
    /// A missing or unreadable file yields the defaults; a malformed file is
    /// logged and also yields the defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => {
                    debug!("Config::load: no config dir, using defaults");
                    return Self::default();
                }
            },
        };

        debug!(path = %path.display(), "Config::load: called");
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!(path = %path.display(), "Config::load: no config file, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "Config::save: called");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).context("Failed to write config file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_model, "google/gemini-2.5-pro");
        assert_eq!(config.default_num_agents, 10);
        assert_eq!(config.default_max_iterations, 30);
        assert!(config.default_timeout_secs.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json")));
        assert_eq!(config.default_num_agents, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            default_model: "openai/gpt-oss-20b:free".to_string(),
            default_num_agents: 4,
            default_timeout_secs: Some(600),
            default_max_iterations: 12,
        };
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path));
        assert_eq!(loaded.default_model, "openai/gpt-oss-20b:free");
        assert_eq!(loaded.default_num_agents, 4);
        assert_eq!(loaded.default_timeout_secs, Some(600));
        assert_eq!(loaded.default_max_iterations, 12);
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json {").unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.default_num_agents, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"default_num_agents": 2}"#).unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.default_num_agents, 2);
        assert_eq!(config.default_max_iterations, 30);
    }
}
