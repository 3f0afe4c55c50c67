//! TOML configuration for a pipeline run.
//!
//! Every field has a default, so an absent file, an empty file, or a file
//! naming only a few keys all produce a usable [`PipelineConfig`].

mod defaults;
mod types;
mod validate;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use types::{
    AugmentSettings, ClassifierSettings, DataSettings, ExplainSettings, GanSettings,
    PipelineConfig, SplitSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config TOML at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    SerializeToml(#[from] toml::ser::Error),
    #[error("Failed to write config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Load `path` when it exists, defaults otherwise.
pub fn load_or_default(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return Ok(PipelineConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse(text: &str) -> Result<PipelineConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Write the effective configuration, e.g. next to a run's outputs.
pub fn save(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
