//! Model training module
//!
//! Provides:
//! - Stratified train/test splitting
//! - Class-weighted logistic regression (baseline)
//! - Sparsity-aware gradient boosted trees (primary)
//! - The `Trainer` and the end-to-end `TrainingPipeline`

mod config;
mod engine;
mod models;
pub mod linear_models;
pub mod split;
pub mod xgboost;

pub use config::TrainingConfig;
pub use engine::{labels_from_records, PipelineOutcome, Trainer, TrainingPipeline, VariantOutcome};
pub use linear_models::{ClassWeight, LogisticConfig, LogisticRegression};
pub use models::{Classifier, ClassifierVariant, TrainedModel};
pub use split::{SplitConfig, SplitIndices, StratifiedSplitter};
pub use xgboost::{compute_scale_pos_weight, XGBoostClassifier, XGBoostConfig};
