//! Where runs and logs land on disk.
//!
//! Everything lives under one root: `ATTRITION_GAN_HOME` when set, otherwise
//! the platform data directory for `attrition-gan`.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

/// Environment variable that relocates the application root.
pub const HOME_ENV: &str = "ATTRITION_GAN_HOME";
const APPLICATION: &str = "attrition-gan";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No platform data directory available; set ATTRITION_GAN_HOME")]
    NoBaseDir,
    #[error("Failed to create directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    root: PathBuf,
}

impl AppDirs {
    /// Resolve the root from the environment or the platform defaults.
    pub fn discover() -> Result<Self, AppDirError> {
        if let Some(path) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::at(PathBuf::from(path)));
        }
        ProjectDirs::from("", "", APPLICATION)
            .map(|dirs| Self::at(dirs.data_dir().to_path_buf()))
            .ok_or(AppDirError::NoBaseDir)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/logs`, created on demand.
    pub fn logs_dir(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join("logs"))
    }

    /// `<root>/runs`, the default output directory, created on demand.
    pub fn runs_dir(&self) -> Result<PathBuf, AppDirError> {
        ensure_dir(self.root.join("runs"))
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    std::fs::create_dir_all(&path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
