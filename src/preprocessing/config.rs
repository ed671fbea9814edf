//! Preprocessing configuration

use crate::error::{PredMaintError, Result};
use crate::schema::{self, ColumnType};
use serde::{Deserialize, Serialize};

/// Configuration for the feature transformer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Columns standard-scaled, in output order
    pub numeric_columns: Vec<String>,

    /// Columns one-hot encoded, in output order
    pub categorical_columns: Vec<String>,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            numeric_columns: schema::NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            categorical_columns: schema::CATEGORICAL_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the numeric columns
    pub fn with_numeric_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.numeric_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the categorical columns
    pub fn with_categorical_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categorical_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Every column must be a schema feature of the matching kind
    pub fn validate(&self) -> Result<()> {
        if self.numeric_columns.is_empty() && self.categorical_columns.is_empty() {
            return Err(PredMaintError::Config("no feature columns configured".to_string()));
        }

        for column in &self.numeric_columns {
            match schema::column_type(column) {
                Some(ColumnType::Float) | Some(ColumnType::Integer) if column != schema::ID_COLUMN => {}
                _ => {
                    return Err(PredMaintError::Config(format!(
                        "'{}' is not a numeric feature column",
                        column
                    )))
                }
            }
        }

        for column in &self.categorical_columns {
            if schema::column_type(column) != Some(ColumnType::Categorical) {
                return Err(PredMaintError::Config(format!(
                    "'{}' is not a categorical feature column",
                    column
                )));
            }
        }

        Ok(())
    }
}
