//! YAML plan files
//!
//! A plan file carries the plan itself and, optionally, the Monte Carlo batch
//! settings. Every field falls back to the reference plan's value, so a file
//! only needs the keys it changes.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rothplan_core::error::ConfigError;
use rothplan_core::model::MonteCarloConfig;
use rothplan_core::PlanConfig;
use serde::{Deserialize, Serialize};

use crate::util::io::atomic_write;

/// Contents of a plan file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanFile {
    pub plan: PlanConfig,
    pub monte_carlo: MonteCarloConfig,
}

#[derive(Debug)]
pub enum PlanFileError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_saphyr::Error),
    Serialize(serde_saphyr::ser::Error),
    Invalid(ConfigError),
}

impl fmt::Display for PlanFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanFileError::Io { path, source } => {
                write!(f, "cannot access {}: {source}", path.display())
            }
            PlanFileError::Parse(e) => write!(f, "invalid plan YAML: {e}"),
            PlanFileError::Serialize(e) => write!(f, "cannot write plan YAML: {e}"),
            PlanFileError::Invalid(e) => write!(f, "invalid plan: {e}"),
        }
    }
}

impl std::error::Error for PlanFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanFileError::Io { source, .. } => Some(source),
            PlanFileError::Parse(e) => Some(e),
            PlanFileError::Serialize(e) => Some(e),
            PlanFileError::Invalid(e) => Some(e),
        }
    }
}

impl From<ConfigError> for PlanFileError {
    fn from(e: ConfigError) -> Self {
        PlanFileError::Invalid(e)
    }
}

impl PlanFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, PlanFileError> {
        serde_saphyr::from_str(yaml).map_err(PlanFileError::Parse)
    }

    pub fn to_yaml(&self) -> Result<String, PlanFileError> {
        serde_saphyr::to_string(self).map_err(PlanFileError::Serialize)
    }

    /// Read and validate a plan file
    pub fn load(path: &Path) -> Result<Self, PlanFileError> {
        let content = fs::read_to_string(path).map_err(|source| PlanFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = Self::from_yaml(&content)?;
        file.validate()?;
        tracing::debug!(path = %path.display(), "plan file loaded");
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), PlanFileError> {
        let yaml = self.to_yaml()?;
        atomic_write(path, &yaml).map_err(|source| PlanFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan.validate()?;
        self.monte_carlo.validate()
    }
}
