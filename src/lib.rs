//! PredMaint - machine failure prediction for the AI4I 2020 dataset
//!
//! This crate provides an offline training pipeline and an online scorer:
//! - CSV loading and header canonicalisation
//! - Stratified train/test splitting
//! - A fit-once feature transformer (standard scaling plus one-hot encoding)
//! - Two classifiers: class-weighted logistic regression and boosted trees
//! - Evaluation reports and checksummed artifact persistence
//! - Lazy, load-once scoring of single observations
//!
//! # Modules
//!
//! - [`schema`] - Column names and row types
//! - [`utils`] - Data loading and dataset summaries
//! - [`preprocessing`] - Scaling, encoding and the sparse feature matrix
//! - [`training`] - Splitting, models and the training pipeline
//! - [`evaluation`] - Classification metrics and reports
//! - [`export`] - Artifact store
//! - [`inference`] - Scoring
//! - [`config`] - Application configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod schema;
pub mod utils;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod inference;

// Persistence and configuration
pub mod export;
pub mod config;

// Services
pub mod cli;

pub use error::{PredMaintError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PredMaintError, Result};

    // Data
    pub use crate::schema::{MachineRecord, Observation};
    pub use crate::utils::{DataLoader, DatasetInfo};

    // Preprocessing
    pub use crate::preprocessing::{FeatureMatrix, FeatureTransformer, FeatureTransformerBuilder, PreprocessingConfig};

    // Training
    pub use crate::training::{
        Classifier, ClassifierVariant, StratifiedSplitter, TrainedModel, Trainer, TrainingConfig,
        TrainingPipeline,
    };

    // Evaluation
    pub use crate::evaluation::{evaluate, ClassificationReport};

    // Export
    pub use crate::export::ArtifactStore;

    // Inference
    pub use crate::inference::{LazyScorer, ModelContext, Scorer, ScoringConfig};

    // Configuration
    pub use crate::config::AppConfig;
}
