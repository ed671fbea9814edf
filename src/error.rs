//! Error types for the predictive maintenance pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PredMaintError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PredMaintError {
    /// Raw data is missing a required column or holds values that cannot be
    /// cast to the canonical schema.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Degenerate input handed to a training routine.
    #[error("Training error: {0}")]
    Training(String),

    /// The requested artifact was never written.
    #[error("model not ready: artifact '{name}' not found at {}; run training first", path.display())]
    ArtifactNotFound { name: String, path: PathBuf },

    /// The artifact exists but its bytes cannot be reconstructed.
    #[error("artifact '{name}' is corrupt: {reason}")]
    ArtifactCorrupt { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PredMaintError {
    /// True when the failure means "no training run has produced artifacts yet",
    /// as opposed to storage corruption or any other fault.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, PredMaintError::ArtifactNotFound { .. })
    }

    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: &str,
    ) -> Self {
        PredMaintError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for PredMaintError {
    fn from(err: polars::error::PolarsError) -> Self {
        PredMaintError::DataFormat(err.to_string())
    }
}

impl From<serde_json::Error> for PredMaintError {
    fn from(err: serde_json::Error) -> Self {
        PredMaintError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PredMaintError {
    fn from(err: ndarray::ShapeError) -> Self {
        PredMaintError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
