//! Configuration file support.

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default CLI options.
    pub defaults: Defaults,
}

/// Default CLI options.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Suppress per-node warning output.
    pub quiet: bool,
    /// Directory searched when a pipeline argument is a bare name.
    pub pipeline_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from the default location (~/.config/strata/config.toml).
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strata").join("config.toml"))
    }

    /// Resolve a pipeline argument: an existing path wins; otherwise a
    /// bare name is looked up under the configured pipeline directory.
    pub fn resolve_pipeline(&self, given: &PathBuf) -> PathBuf {
        if given.exists() {
            return given.clone();
        }
        if let Some(dir) = &self.defaults.pipeline_dir {
            let candidate = dir.join(given);
            if candidate.exists() {
                return candidate;
            }
            let with_ext = dir.join(format!("{}.json", given.display()));
            if with_ext.exists() {
                return with_ext;
            }
        }
        given.clone()
    }
}
