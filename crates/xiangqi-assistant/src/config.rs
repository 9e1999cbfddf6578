//! Configuration file loading for the assistant.
//!
//! Settings live in `assistant.toml` in the current directory unless a path
//! is given. A missing default file means built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use xiangqi_arbiter::SearchParameters;
use xiangqi_engine::RuleVariant;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Opening book settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct BookConfig {
    /// JSON book to use instead of the built-in one.
    pub path: Option<PathBuf>,
    /// Further JSON books loaded next to the built-in one.
    pub library: Vec<PathBuf>,
    /// Name of the book to probe; overrides `path`.
    pub active: Option<String>,
}

/// Main assistant configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AssistantConfig {
    /// Rule variant validating every decision.
    pub rules: RuleVariant,
    /// Pause after each completed depth, in milliseconds.
    pub pacing_ms: u64,
    pub engine: SearchParameters,
    pub book: BookConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            rules: RuleVariant::Standard,
            pacing_ms: 0,
            engine: SearchParameters::default(),
            book: BookConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Loads the configuration.
    ///
    /// An explicit `path` must exist; without one, [`Self::config_path`] is
    /// read if present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };
        if !required && !config_path.exists() {
            tracing::debug!("no {} found, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| {
            ConfigError::ReadError {
                path: config_path.clone(),
                source,
            }
        })?;
        let config = toml::from_str(&content)?;
        tracing::info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Returns the default path to the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("assistant.toml")
    }
}
