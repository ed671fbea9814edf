//! One-of-k encoding of the categorical feature columns

use crate::error::{PredMaintError, Result};
use crate::schema::Observation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fitted one-hot encoder.
///
/// Categories are enumerated at fit time and sorted per column. A value
/// outside the fitted set encodes as an all-zero block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    // Sorted, so lookup is a binary search
    categories: Vec<Vec<String>>,
    offsets: Vec<usize>,
}

impl OneHotEncoder {
    /// Enumerate the distinct values of each column
    pub fn fit(columns: &[String], rows: &[Observation]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PredMaintError::InvalidInput(
                "cannot fit encoder on zero rows".to_string(),
            ));
        }

        let mut categories = Vec::with_capacity(columns.len());
        for column in columns {
            let mut seen = BTreeSet::new();
            for row in rows {
                let value = row
                    .categorical(column)
                    .ok_or_else(|| PredMaintError::FeatureNotFound(column.clone()))?;
                if !seen.contains(value) {
                    seen.insert(value.to_string());
                }
            }
            categories.push(seen.into_iter().collect::<Vec<_>>());
        }

        let mut offsets = Vec::with_capacity(columns.len());
        let mut offset = 0;
        for cats in &categories {
            offsets.push(offset);
            offset += cats.len();
        }

        Ok(Self {
            columns: columns.to_vec(),
            categories,
            offsets,
        })
    }

    /// Total width of all indicator blocks
    pub fn n_outputs(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Fitted categories of a column, in block order
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.categories[idx].as_slice())
    }

    /// Output names such as `type_M`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(column, cats)| cats.iter().map(move |cat| format!("{}_{}", column, cat)))
            .collect()
    }

    /// Positions (relative to the start of the encoder output) of the set
    /// indicators for one observation. Unknown values contribute nothing.
    pub fn encode_row(&self, row: &Observation) -> Result<Vec<usize>> {
        let mut hot = Vec::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            let value = row
                .categorical(column)
                .ok_or_else(|| PredMaintError::FeatureNotFound(column.clone()))?;
            if let Ok(pos) = self.categories[idx].binary_search_by(|c| c.as_str().cmp(value)) {
                hot.push(self.offsets[idx] + pos);
            }
        }
        Ok(hot)
    }
}
