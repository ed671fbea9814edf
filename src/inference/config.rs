//! Scoring configuration

use crate::error::{PredMaintError, Result};
use crate::training::ClassifierVariant;
use serde::{Deserialize, Serialize};

/// Configuration for single-observation scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Probability at or above which an observation is flagged at risk
    pub decision_threshold: f64,

    /// Model served by the scorer
    pub variant: ClassifierVariant,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
            variant: ClassifierVariant::Primary,
        }
    }
}

impl ScoringConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.decision_threshold = threshold;
        self
    }

    pub fn with_variant(mut self, variant: ClassifierVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(PredMaintError::invalid_parameter(
                "decision_threshold",
                self.decision_threshold,
                "must lie in [0, 1]",
            ));
        }
        Ok(())
    }
}
