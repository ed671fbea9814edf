//! XGBoost-style gradient boosting with second-order approximation
//!
//! - Uses both gradient (first derivative) and hessian (second derivative) of the logistic loss
//! - Regularized leaf weights: w* = -G / (H + lambda)
//! - Gain-based split scoring: Gain = 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - (GL+GR)²/(HL+HR+λ)]
//! - Sparsity-aware exact greedy splits: implicit zeros of a column form one block
//! - Positive rows upweighted by `scale_pos_weight`

use crate::error::{PredMaintError, Result};
use crate::preprocessing::{FeatureMatrix, RowView};
use ndarray::Array1;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// XGBoost configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XGBoostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// L1 regularization on leaf weights
    pub reg_alpha: f64,
    /// Minimum loss reduction to make a split (gamma)
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    /// Fixed positive-class weight; `None` derives it from the labels
    pub scale_pos_weight: Option<f64>,
    pub random_state: Option<u64>,
}

impl Default for XGBoostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 5,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            scale_pos_weight: None,
            random_state: Some(42),
        }
    }
}

impl XGBoostConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PredMaintError::invalid_parameter("n_estimators", 0, "must be > 0"));
        }
        if self.max_depth == 0 {
            return Err(PredMaintError::invalid_parameter("max_depth", 0, "must be > 0"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PredMaintError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be > 0",
            ));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample_bytree", self.colsample_bytree)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(PredMaintError::invalid_parameter(name, ratio, "must lie in (0, 1]"));
            }
        }
        if let Some(w) = self.scale_pos_weight {
            if !(w > 0.0 && w.is_finite()) {
                return Err(PredMaintError::invalid_parameter("scale_pos_weight", w, "must be > 0"));
            }
        }
        Ok(())
    }
}

/// Positive-class weight `negatives / positives`.
///
/// With no positive rows nothing can be compensated, so the neutral weight
/// 1.0 is returned and a warning is logged.
pub fn compute_scale_pos_weight(y: &Array1<f64>) -> f64 {
    let positives = y.iter().filter(|&&v| v >= 0.5).count();
    let negatives = y.len() - positives;
    if positives == 0 {
        warn!(n_rows = y.len(), "No positive examples, scale_pos_weight defaults to 1.0");
        return 1.0;
    }
    negatives as f64 / positives as f64
}

/// A single node in the XGBoost tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum XGBNode {
    Leaf { weight: f64 },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<XGBNode>,
        right: Box<XGBNode>,
    },
}

impl XGBNode {
    fn predict(&self, sample: RowView<'_>) -> f64 {
        match self {
            XGBNode::Leaf { weight } => *weight,
            XGBNode::Split { feature, threshold, left, right } => {
                if sample.get(*feature) <= *threshold {
                    left.predict(sample)
                } else {
                    right.predict(sample)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Shared state for growing one tree
struct TreeBuilder<'a> {
    x: &'a FeatureMatrix,
    /// Stored entries per column as `(row, value)`, sorted by value
    columns: &'a [Vec<(usize, f64)>],
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    config: &'a XGBoostConfig,
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, rows: &[usize], depth: usize) -> XGBNode {
        let g_sum: f64 = rows.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = rows.iter().map(|&i| self.hess[i]).sum();
        let leaf_weight =
            compute_leaf_weight(g_sum, h_sum, self.config.reg_lambda, self.config.reg_alpha);

        if depth >= self.config.max_depth || rows.len() < 2 || h_sum < self.config.min_child_weight {
            return XGBNode::Leaf { weight: leaf_weight };
        }

        let mut in_node = vec![false; self.x.nrows()];
        for &i in rows {
            in_node[i] = true;
        }

        // Ties on gain resolve to the lowest feature index, whatever the
        // parallel reduction order.
        let best = self
            .features
            .par_iter()
            .filter_map(|&f| self.best_split_for_feature(f, &in_node, rows.len(), g_sum, h_sum))
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| b.feature.cmp(&a.feature))
            });

        match best {
            Some(split) if split.gain > self.config.gamma => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&i| self.x.get(i, split.feature) <= split.threshold);

                if left_idx.is_empty() || right_idx.is_empty() {
                    return XGBNode::Leaf { weight: leaf_weight };
                }

                let left = self.build(&left_idx, depth + 1);
                let right = self.build(&right_idx, depth + 1);

                XGBNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            _ => XGBNode::Leaf { weight: leaf_weight },
        }
    }

    /// Exact greedy scan over one feature. Rows without a stored entry share
    /// the value 0 and enter the scan as a single block.
    fn best_split_for_feature(
        &self,
        feature: usize,
        in_node: &[bool],
        n_rows: usize,
        g_total: f64,
        h_total: f64,
    ) -> Option<SplitCandidate> {
        // (value, grad, hess) in ascending value order
        let mut items: Vec<(f64, f64, f64)> = Vec::new();
        let mut g_stored = 0.0;
        let mut h_stored = 0.0;
        let mut zero_pos = None;

        for &(row, value) in &self.columns[feature] {
            if !in_node[row] {
                continue;
            }
            if zero_pos.is_none() && value >= 0.0 {
                zero_pos = Some(items.len());
            }
            items.push((value, self.grad[row], self.hess[row]));
            g_stored += self.grad[row];
            h_stored += self.hess[row];
        }

        let n_implicit = n_rows - items.len();
        if n_implicit > 0 {
            let block = (0.0, g_total - g_stored, h_total - h_stored);
            items.insert(zero_pos.unwrap_or(items.len()), block);
        }
        if items.len() < 2 {
            return None;
        }

        let lambda = self.config.reg_lambda;
        let alpha = self.config.reg_alpha;
        let parent_score = leaf_score(g_total, h_total, lambda, alpha);

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..items.len() - 1 {
            let (value, g, h) = items[pos];
            g_left += g;
            h_left += h;

            // Skip if next sample has same feature value (avoid identical split)
            let next_value = items[pos + 1].0;
            if (next_value - value).abs() < 1e-12 {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;

            if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                continue;
            }

            let gain = 0.5
                * (leaf_score(g_left, h_left, lambda, alpha)
                    + leaf_score(g_right, h_right, lambda, alpha)
                    - parent_score);

            if best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    gain,
                });
            }
        }

        best
    }
}

/// L1 soft-thresholded gradient sum
fn threshold_l1(g: f64, alpha: f64) -> f64 {
    if g > alpha {
        g - alpha
    } else if g < -alpha {
        g + alpha
    } else {
        0.0
    }
}

/// Structure score term T(G)² / (H + λ)
fn leaf_score(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let t = threshold_l1(g, alpha);
    t * t / (h + lambda)
}

/// Optimal leaf weight with L1 (alpha) and L2 (lambda) regularization
fn compute_leaf_weight(g_sum: f64, h_sum: f64, lambda: f64, alpha: f64) -> f64 {
    -threshold_l1(g_sum, alpha) / (h_sum + lambda)
}

/// XGBoost Classifier (logistic loss with second-order approximation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XGBoostClassifier {
    config: XGBoostConfig,
    trees: Vec<XGBNode>,
    base_score: f64,
    scale_pos_weight: f64,
    n_features: usize,
}

impl Default for XGBoostClassifier {
    fn default() -> Self {
        Self::new(XGBoostConfig::default())
    }
}

impl XGBoostClassifier {
    pub fn new(config: XGBoostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
            scale_pos_weight: 1.0,
            n_features: 0,
        }
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// Fit on 0/1 labels
    pub fn fit(&mut self, x: &FeatureMatrix, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(PredMaintError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        self.config.validate()?;
        self.n_features = n_features;

        self.scale_pos_weight = match self.config.scale_pos_weight {
            Some(w) => w,
            None => compute_scale_pos_weight(y),
        };
        let sample_weights: Vec<f64> = y
            .iter()
            .map(|&v| if v >= 0.5 { self.scale_pos_weight } else { 1.0 })
            .collect();

        // Base score in log-odds space, from the weighted positive rate
        let w_total: f64 = sample_weights.iter().sum();
        let w_pos: f64 = y.iter().zip(&sample_weights).map(|(&v, &w)| v * w).sum();
        let p = (w_pos / w_total).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw_preds = vec![self.base_score; n_samples];

        let columns = sorted_columns(x);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for round in 0..self.config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p), both scaled by the row weight
            let mut grad = Vec::with_capacity(n_samples);
            let mut hess = Vec::with_capacity(n_samples);
            for ((&raw, &label), &w) in raw_preds.iter().zip(y.iter()).zip(&sample_weights) {
                let prob = Self::sigmoid(raw);
                grad.push((prob - label) * w);
                hess.push((prob * (1.0 - prob)).max(1e-7) * w);
            }

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let builder = TreeBuilder {
                x,
                columns: &columns,
                grad: &grad,
                hess: &hess,
                features: &col_indices,
                config: &self.config,
            };
            let tree = builder.build(&row_indices, 0);

            let lr = self.config.learning_rate;
            raw_preds
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, raw)| *raw += lr * tree.predict(x.row(i)));

            if round % 50 == 0 {
                debug!(round, depth = tree_depth(&tree), "Boosting round");
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn check_width(&self, x: &FeatureMatrix) -> Result<()> {
        if self.trees.is_empty() {
            return Err(PredMaintError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PredMaintError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        self.check_width(x)?;
        let lr = self.config.learning_rate;
        let probs: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let raw = self.base_score
                    + self.trees.iter().map(|tree| lr * tree.predict(row)).sum::<f64>();
                Self::sigmoid(raw)
            })
            .collect();
        Ok(Array1::from_vec(probs))
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Positive-class weight used during fitting
    pub fn scale_pos_weight(&self) -> f64 {
        self.scale_pos_weight
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn config(&self) -> &XGBoostConfig {
        &self.config
    }

    /// Compute feature importances by counting splits across all trees
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if self.n_features == 0 {
            return None;
        }
        let mut counts = vec![0.0f64; self.n_features];
        for tree in &self.trees {
            count_splits(tree, &mut counts);
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        Some(Array1::from_vec(counts))
    }
}

fn count_splits(node: &XGBNode, counts: &mut [f64]) {
    if let XGBNode::Split { feature, left, right, .. } = node {
        if *feature < counts.len() {
            counts[*feature] += 1.0;
        }
        count_splits(left, counts);
        count_splits(right, counts);
    }
}

fn tree_depth(node: &XGBNode) -> usize {
    match node {
        XGBNode::Leaf { .. } => 0,
        XGBNode::Split { left, right, .. } => 1 + tree_depth(left).max(tree_depth(right)),
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Column view of the stored entries, each column sorted by value, so every
/// node scan can walk it in order without re-sorting.
fn sorted_columns(x: &FeatureMatrix) -> Vec<Vec<(usize, f64)>> {
    let mut columns = x.to_columns();
    columns.par_iter_mut().for_each(|col| {
        col.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    });
    columns
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn classification_data() -> (FeatureMatrix, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 5.0 { 1.0 } else { 0.0 })
            .collect();
        (FeatureMatrix::from_dense(&x), y)
    }

    fn accuracy(model: &XGBoostClassifier, x: &FeatureMatrix, y: &Array1<f64>) -> f64 {
        let preds = model.predict(x).unwrap();
        let correct = preds.iter().zip(y.iter()).filter(|(p, a)| (*p - *a).abs() < 0.5).count();
        correct as f64 / y.len() as f64
    }

    #[test]
    fn test_xgboost_classifier() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 50,
            max_depth: 4,
            learning_rate: 0.3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let acc = accuracy(&model, &x, &y);
        assert!(acc >= 0.8, "XGBoost classifier accuracy = {}", acc);
    }

    #[test]
    fn test_xgboost_predict_proba() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(20));
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_sparse_indicator_split() {
        // Label is exactly the indicator in column 1; column 0 is noise.
        let x = Array2::from_shape_fn((60, 3), |(i, j)| match j {
            0 => ((i * 13) % 7) as f64,
            1 => f64::from(u8::from(i % 4 == 0)),
            _ => 0.0,
        });
        let y = Array1::from_iter((0..60).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }));
        let x = FeatureMatrix::from_dense(&x);

        let mut model = XGBoostClassifier::new(XGBoostConfig {
            n_estimators: 30,
            max_depth: 2,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(accuracy(&model, &x, &y), 1.0);
        let importances = model.feature_importances().unwrap();
        assert!(importances[1] > 0.0);
        assert_eq!(importances[2], 0.0);
    }

    #[test]
    fn test_scale_pos_weight_from_labels() {
        let y = Array1::from_iter((0..100).map(|i| if i < 5 { 1.0 } else { 0.0 }));
        assert_eq!(compute_scale_pos_weight(&y), 19.0);

        let none = Array1::<f64>::zeros(10);
        assert_eq!(compute_scale_pos_weight(&none), 1.0);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = classification_data();
        let config = XGBoostConfig::default().with_n_estimators(10);
        let mut a = XGBoostClassifier::new(config.clone());
        let mut b = XGBoostClassifier::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let (x, y) = classification_data();
        let mut model = XGBoostClassifier::new(XGBoostConfig::default().with_n_estimators(5));
        model.fit(&x, &y).unwrap();
        let wide = FeatureMatrix::from_dense(&Array2::zeros((1, 3)));
        assert!(model.predict_proba(&wide).is_err());
    }

    #[test]
    fn test_invalid_config() {
        assert!(XGBoostConfig::default().with_n_estimators(0).validate().is_err());
        assert!(XGBoostConfig { subsample: 0.0, ..Default::default() }.validate().is_err());
    }
}
