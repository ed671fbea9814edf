//! Application configuration
//!
//! Defaults, an optional JSON file, then environment overrides.

use crate::error::{PredMaintError, Result};
use crate::export::ArtifactStore;
use crate::inference::ScoringConfig;
use crate::preprocessing::PreprocessingConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `data_path`
pub const DATA_PATH_ENV: &str = "PREDMAINT_DATA_PATH";
/// Overrides `models_dir`
pub const MODELS_DIR_ENV: &str = "PREDMAINT_MODELS_DIR";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Raw AI4I-format CSV
    pub data_path: PathBuf,

    /// Directory holding the artifacts
    pub models_dir: PathBuf,

    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
    pub scoring: ScoringConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/ai4i2020.csv"),
            models_dir: PathBuf::from("models"),
            preprocessing: PreprocessingConfig::default(),
            training: TrainingConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PredMaintError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PredMaintError::Config(format!("invalid {}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "Configuration file read");
        Ok(config)
    }

    /// Defaults or file, then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply path overrides from a key lookup (the process environment in
    /// `load`). Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(DATA_PATH_ENV).filter(|v| !v.is_empty()) {
            self.data_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(MODELS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.models_dir = PathBuf::from(value);
        }
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_models_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_dir = path.into();
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocessing.validate()?;
        self.training.validate()?;
        self.scoring.validate()?;
        Ok(())
    }

    /// Artifact store over `models_dir`
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.models_dir)
    }
}
