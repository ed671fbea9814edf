//! Feature transformer: standard scaling plus one-hot encoding
//!
//! The transformer is fitted exactly once. `UnfitTransformer::fit` consumes
//! the descriptor and returns a `FeatureTransformer` that only transforms.

use super::{
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    matrix::FeatureMatrix,
    scaler::{ScalerParams, StandardScaler},
};
use crate::error::{PredMaintError, Result};
use crate::schema::{MachineRecord, Observation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Builds the unfit transformer from configuration
#[derive(Debug, Clone, Default)]
pub struct FeatureTransformerBuilder {
    config: PreprocessingConfig,
}

impl FeatureTransformerBuilder {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Produce the unfit transformer. Nothing is learned here.
    pub fn build(&self) -> Result<UnfitTransformer> {
        self.config.validate()?;
        Ok(UnfitTransformer {
            config: self.config.clone(),
        })
    }
}

/// Column layout waiting for training data
#[derive(Debug, Clone)]
pub struct UnfitTransformer {
    config: PreprocessingConfig,
}

impl UnfitTransformer {
    /// Learn scaling statistics and category sets from training rows.
    pub fn fit(self, rows: &[Observation]) -> Result<FeatureTransformer> {
        if rows.is_empty() {
            return Err(PredMaintError::InvalidInput(
                "cannot fit transformer on an empty dataset".to_string(),
            ));
        }
        let start = Instant::now();

        let scaler = StandardScaler::fit(&self.config.numeric_columns, rows)?;
        let encoder = OneHotEncoder::fit(&self.config.categorical_columns, rows)?;
        let n_features = scaler.n_columns() + encoder.n_outputs();

        info!(
            n_rows = rows.len(),
            n_numeric = scaler.n_columns(),
            n_indicators = encoder.n_outputs(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feature transformer fitted"
        );

        Ok(FeatureTransformer {
            scaler,
            encoder,
            n_features,
            n_fit_rows: rows.len(),
        })
    }

    /// Fit on the feature part of training records
    pub fn fit_records(self, records: &[MachineRecord]) -> Result<FeatureTransformer> {
        let rows: Vec<Observation> = records.iter().map(|r| r.features.clone()).collect();
        self.fit(&rows)
    }
}

/// Fitted transformer. Output layout is the scaled numerics in configured
/// order followed by one indicator block per categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformer {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    n_features: usize,
    n_fit_rows: usize,
}

impl FeatureTransformer {
    /// Output width
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Rows seen at fit time
    pub fn n_fit_rows(&self) -> usize {
        self.n_fit_rows
    }

    pub fn scaler_params(&self) -> &[ScalerParams] {
        self.scaler.params()
    }

    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.encoder.categories(column)
    }

    /// Output column names in layout order
    pub fn feature_names(&self) -> Vec<String> {
        self.scaler
            .params()
            .iter()
            .map(|p| p.column.clone())
            .chain(self.encoder.feature_names())
            .collect()
    }

    fn encode(&self, row: &Observation) -> Result<Vec<(usize, f64)>> {
        let scaled = self.scaler.transform_row(row)?;
        let offset = scaled.len();
        let hot = self.encoder.encode_row(row)?;

        let mut entries = Vec::with_capacity(offset + hot.len());
        // Numerics are stored even when zero so every row has them explicitly.
        entries.extend(scaled.into_iter().enumerate());
        entries.extend(hot.into_iter().map(|idx| (offset + idx, 1.0)));
        Ok(entries)
    }

    /// Transform many rows; row order is preserved.
    pub fn transform(&self, rows: &[Observation]) -> Result<FeatureMatrix> {
        let encoded = rows
            .par_iter()
            .map(|row| self.encode(row))
            .collect::<Result<Vec<_>>>()?;

        let nnz = encoded.iter().map(Vec::len).sum();
        let mut matrix = FeatureMatrix::with_capacity(self.n_features, rows.len(), nnz);
        for entries in encoded {
            matrix.push_row(entries)?;
        }

        debug!(n_rows = matrix.nrows(), nnz = matrix.nnz(), "Transformed rows");
        Ok(matrix)
    }

    pub fn transform_records(&self, records: &[MachineRecord]) -> Result<FeatureMatrix> {
        let rows: Vec<Observation> = records.iter().map(|r| r.features.clone()).collect();
        self.transform(&rows)
    }

    /// Transform a single observation into a one-row matrix
    pub fn transform_one(&self, row: &Observation) -> Result<FeatureMatrix> {
        let mut matrix = FeatureMatrix::new(self.n_features);
        matrix.push_row(self.encode(row)?)?;
        Ok(matrix)
    }
}
