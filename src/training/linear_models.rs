//! Class-weighted logistic regression over sparse features

use crate::error::{PredMaintError, Result};
use crate::preprocessing::FeatureMatrix;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Per-class loss weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every row counts once
    Uniform,
    /// Class `c` weighted by `n / (2 * n_c)`
    Balanced,
}

/// Logistic regression configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    /// L2 penalty on the coefficients (intercept is not penalised)
    pub alpha: f64,
    pub learning_rate: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm drops below this
    pub tol: f64,
    pub class_weight: ClassWeight,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            alpha: 1e-4,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
            class_weight: ClassWeight::Balanced,
        }
    }
}

impl LogisticConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.alpha < 0.0 || !self.alpha.is_finite() {
            return Err(PredMaintError::invalid_parameter("alpha", self.alpha, "must be >= 0"));
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(PredMaintError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be > 0",
            ));
        }
        if self.max_iter == 0 {
            return Err(PredMaintError::invalid_parameter("max_iter", 0, "must be > 0"));
        }
        Ok(())
    }
}

/// Binary logistic regression fit by full-batch gradient descent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticConfig,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
    /// Weights applied to classes 0 and 1
    class_weights: [f64; 2],
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(LogisticConfig::default())
    }
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self {
            config,
            coefficients: None,
            intercept: 0.0,
            class_weights: [1.0, 1.0],
            n_iter: 0,
        }
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    /// Fit on 0/1 labels
    pub fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PredMaintError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.config.validate()?;

        self.class_weights = class_weights(y, self.config.class_weight);
        let sample_weights: Array1<f64> = y.mapv(|label| self.class_weights[usize::from(label >= 0.5)]);

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        let lr = self.config.learning_rate;
        let alpha = self.config.alpha;
        let n = n_samples as f64;

        self.n_iter = self.config.max_iter;
        for iter in 0..self.config.max_iter {
            let linear = x.dot(&weights)? + bias;
            let predictions = linear.mapv(Self::sigmoid);

            let errors = (&predictions - y) * &sample_weights;
            let dw = x.t_dot(&errors)? / n + alpha * &weights;
            let db = errors.sum() / n;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.config.tol {
                self.n_iter = iter;
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(self)
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PredMaintError::ModelNotFitted)?;
        let linear = x.dot(coefficients)?;
        Ok(linear.mapv(|z| Self::sigmoid(z + self.intercept)))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn class_weights(&self) -> [f64; 2] {
        self.class_weights
    }

    /// Iterations run before convergence (or `max_iter`)
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }
}

/// Balanced weights `n / (2 * n_c)`; a class with no rows keeps weight 1
fn class_weights(y: &Array1<f64>, mode: ClassWeight) -> [f64; 2] {
    match mode {
        ClassWeight::Uniform => [1.0, 1.0],
        ClassWeight::Balanced => {
            let n = y.len() as f64;
            let n_pos = y.iter().filter(|&&v| v >= 0.5).count() as f64;
            let n_neg = n - n_pos;
            let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
            [weight(n_neg), weight(n_pos)]
        }
    }
}
