//! Classifier variants and the shared prediction contract

use super::linear_models::LogisticRegression;
use super::xgboost::XGBoostClassifier;
use crate::error::Result;
use crate::preprocessing::FeatureMatrix;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two classifier variants. They differ in model family and in how they
/// compensate class imbalance (class weighting vs positive upweighting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassifierVariant {
    /// Class-balanced logistic regression
    Baseline,
    /// Gradient-boosted trees with positive upweighting
    Primary,
}

impl ClassifierVariant {
    pub const ALL: [ClassifierVariant; 2] = [ClassifierVariant::Baseline, ClassifierVariant::Primary];

    pub fn name(&self) -> &'static str {
        match self {
            ClassifierVariant::Baseline => "baseline",
            ClassifierVariant::Primary => "primary",
        }
    }

    /// Artifact name the fitted model is stored under
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ClassifierVariant::Baseline => "baseline_logreg",
            ClassifierVariant::Primary => "xgb_model",
        }
    }

    /// Heading used in evaluation reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ClassifierVariant::Baseline => "Logistic Regression",
            ClassifierVariant::Primary => "XGBoost",
        }
    }
}

impl fmt::Display for ClassifierVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Prediction contract shared by every fitted model
pub trait Classifier: Send + Sync {
    /// Probability of failure for each row
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions at the 0.5 threshold
    fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn variant(&self) -> ClassifierVariant;

    /// Input width the model was fitted on
    fn n_features(&self) -> usize;
}

/// A fitted model of either variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainedModel {
    Baseline(LogisticRegression),
    Primary(XGBoostClassifier),
}

impl TrainedModel {
    pub fn as_baseline(&self) -> Option<&LogisticRegression> {
        match self {
            TrainedModel::Baseline(model) => Some(model),
            TrainedModel::Primary(_) => None,
        }
    }

    pub fn as_primary(&self) -> Option<&XGBoostClassifier> {
        match self {
            TrainedModel::Primary(model) => Some(model),
            TrainedModel::Baseline(_) => None,
        }
    }
}

impl Classifier for TrainedModel {
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        match self {
            TrainedModel::Baseline(model) => model.predict_proba(x),
            TrainedModel::Primary(model) => model.predict_proba(x),
        }
    }

    fn variant(&self) -> ClassifierVariant {
        match self {
            TrainedModel::Baseline(_) => ClassifierVariant::Baseline,
            TrainedModel::Primary(_) => ClassifierVariant::Primary,
        }
    }

    fn n_features(&self) -> usize {
        match self {
            TrainedModel::Baseline(model) => model.n_features(),
            TrainedModel::Primary(model) => model.n_features(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names() {
        assert_eq!(ClassifierVariant::Baseline.artifact_name(), "baseline_logreg");
        assert_eq!(ClassifierVariant::Primary.artifact_name(), "xgb_model");
        assert_eq!(ClassifierVariant::Primary.to_string(), "primary");
        assert_eq!(ClassifierVariant::ALL.len(), 2);
    }

    #[test]
    fn test_variant_serde() {
        let json = serde_json::to_string(&ClassifierVariant::Baseline).unwrap();
        assert_eq!(json, "\"Baseline\"");
    }

    #[test]
    fn test_trained_model_dispatch() {
        let model = TrainedModel::Baseline(LogisticRegression::default());
        assert_eq!(model.variant(), ClassifierVariant::Baseline);
        assert!(model.as_primary().is_none());
        assert_eq!(model.n_features(), 0);
    }
}
