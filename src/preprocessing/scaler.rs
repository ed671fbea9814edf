//! Standard (z-score) scaling of the numeric feature columns

use crate::error::{PredMaintError, Result};
use crate::schema::Observation;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub column: String,
    pub mean: f64,
    /// Population standard deviation; zero marks a degenerate column
    pub std: f64,
}

/// Fitted standard scaler: `(x - mean) / std`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
}

impl StandardScaler {
    /// Fit per-column mean and population standard deviation
    pub fn fit(columns: &[String], rows: &[Observation]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PredMaintError::InvalidInput(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let params = columns
            .iter()
            .map(|column| {
                let values = rows
                    .iter()
                    .map(|row| {
                        row.numeric(column)
                            .ok_or_else(|| PredMaintError::FeatureNotFound(column.clone()))
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok(compute_params(column, &values))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn n_columns(&self) -> usize {
        self.params.len()
    }

    /// Scale one value of column `idx`
    pub fn scale(&self, idx: usize, value: f64) -> f64 {
        let p = &self.params[idx];
        if p.std == 0.0 {
            0.0
        } else {
            (value - p.mean) / p.std
        }
    }

    /// Scaled numeric features of one observation, in fit order
    pub fn transform_row(&self, row: &Observation) -> Result<Vec<f64>> {
        self.params
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let value = row
                    .numeric(&p.column)
                    .ok_or_else(|| PredMaintError::FeatureNotFound(p.column.clone()))?;
                if !value.is_finite() {
                    return Err(PredMaintError::InvalidInput(format!(
                        "{} must be finite, got {}",
                        p.column, value
                    )));
                }
                Ok(self.scale(idx, value))
            })
            .collect()
    }
}

fn compute_params(column: &str, values: &[f64]) -> ScalerParams {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let mut std = variance.sqrt();

    // Rounding in the mean leaves a residue on constant columns.
    if std <= 10.0 * f64::EPSILON * mean.abs().max(1.0) {
        warn!(column = %column, mean, "Zero-variance column, scaled output fixed at 0");
        std = 0.0;
    }

    ScalerParams {
        column: column.to_string(),
        mean,
        std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(air: f64, wear: i64) -> Observation {
        Observation {
            air_temperature_k: air,
            process_temperature_k: 310.0,
            rotational_speed_rpm: 1500,
            torque_nm: 40.0,
            tool_wear_min: wear,
            product_id: "M1".to_string(),
            machine_type: "M".to_string(),
        }
    }

    #[test]
    fn test_standard_scaler() {
        let rows: Vec<Observation> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|&a| obs(a, 0)).collect();
        let scaler = StandardScaler::fit(&["air_temperature_k".to_string()], &rows).unwrap();

        let scaled: Vec<f64> = rows.iter().map(|r| scaler.transform_row(r).unwrap()[0]).collect();
        let mean: f64 = scaled.iter().sum::<f64>() / 5.0;
        let var: f64 = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 5.0;

        assert!(mean.abs() < 1e-10);
        assert!((var.sqrt() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_variance_column_scales_to_zero() {
        let rows = vec![obs(0.1, 7), obs(0.1, 7), obs(0.1, 7)];
        let scaler = StandardScaler::fit(&["air_temperature_k".to_string()], &rows).unwrap();

        assert_eq!(scaler.params()[0].std, 0.0);
        assert_eq!(scaler.transform_row(&obs(0.1, 7)).unwrap(), vec![0.0]);
        assert_eq!(scaler.transform_row(&obs(500.0, 7)).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = StandardScaler::fit(&["type".to_string()], &[obs(1.0, 1)]).unwrap_err();
        assert!(matches!(err, PredMaintError::FeatureNotFound(_)));
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let scaler = StandardScaler::fit(&["air_temperature_k".to_string()], &[obs(1.0, 1), obs(2.0, 1)]).unwrap();
        assert!(scaler.transform_row(&obs(f64::NAN, 1)).is_err());
    }
}
