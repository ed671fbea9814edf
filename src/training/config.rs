//! Training configuration

use super::linear_models::LogisticConfig;
use super::models::ClassifierVariant;
use super::split::SplitConfig;
use super::xgboost::XGBoostConfig;
use crate::error::{PredMaintError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Train/test split
    pub split: SplitConfig,

    /// Baseline (logistic regression) settings
    pub baseline: LogisticConfig,

    /// Primary (boosted trees) settings
    pub primary: XGBoostConfig,

    /// Variants to train, in order
    pub variants: Vec<ClassifierVariant>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            baseline: LogisticConfig::default(),
            primary: XGBoostConfig::default(),
            variants: ClassifierVariant::ALL.to_vec(),
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_baseline(mut self, baseline: LogisticConfig) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn with_primary(mut self, primary: XGBoostConfig) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_variants(mut self, variants: Vec<ClassifierVariant>) -> Self {
        self.variants = variants;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.split.validate()?;
        self.baseline.validate()?;
        self.primary.validate()?;
        if self.variants.is_empty() {
            return Err(PredMaintError::Config("no classifier variants selected".to_string()));
        }
        Ok(())
    }
}
