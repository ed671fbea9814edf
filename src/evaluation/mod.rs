//! Held-out evaluation of fitted classifiers
//!
//! Accuracy at the 0.5 threshold, ROC AUC, and a per-class
//! precision/recall/F1 breakdown rendered like a classification report.

use crate::error::{PredMaintError, Result};
use crate::preprocessing::FeatureMatrix;
use crate::training::{Classifier, ClassifierVariant};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

/// Hard-prediction threshold used for accuracy and the per-class table
pub const EVALUATION_THRESHOLD: f64 = 0.5;

/// Precision, recall, F1 and support for one class (or an average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Evaluation results for one model on one labelled set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub variant: Option<ClassifierVariant>,
    pub accuracy: f64,
    /// `None` when the labels hold a single class
    pub roc_auc: Option<f64>,
    /// Classes 0 and 1
    pub per_class: [ClassMetrics; 2],
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub n_samples: usize,
}

/// Score `model` on `x` and compare with 0/1 labels `y`
pub fn evaluate<C: Classifier + ?Sized>(
    model: &C,
    x: &FeatureMatrix,
    y: &Array1<f64>,
) -> Result<ClassificationReport> {
    if x.nrows() != y.len() {
        return Err(PredMaintError::ShapeError {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    let proba = model.predict_proba(x)?;
    let mut report = report_from_scores(y, &proba)?;
    report.variant = Some(model.variant());
    Ok(report)
}

/// Build the report from labels and positive-class probabilities
pub fn report_from_scores(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<ClassificationReport> {
    if y_true.len() != y_score.len() {
        return Err(PredMaintError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", y_score.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PredMaintError::InvalidInput("cannot evaluate on zero rows".to_string()));
    }

    let y_pred = y_score.mapv(|p| if p >= EVALUATION_THRESHOLD { 1.0 } else { 0.0 });
    let roc_auc = roc_auc_score(y_true, y_score);
    if roc_auc.is_none() {
        warn!(n_rows = y_true.len(), "ROC AUC undefined: evaluation labels contain a single class");
    }

    let (tp, fp, tn, fn_) = confusion_counts(y_true, &y_pred);
    let per_class = [class_metrics(tn, fn_, tn + fp), class_metrics(tp, fp, tp + fn_)];

    let n = y_true.len();
    let macro_avg = ClassMetrics {
        precision: (per_class[0].precision + per_class[1].precision) / 2.0,
        recall: (per_class[0].recall + per_class[1].recall) / 2.0,
        f1_score: (per_class[0].f1_score + per_class[1].f1_score) / 2.0,
        support: n,
    };
    let weight = |c: &ClassMetrics| c.support as f64 / n as f64;
    let weighted_avg = ClassMetrics {
        precision: per_class.iter().map(|c| c.precision * weight(c)).sum(),
        recall: per_class.iter().map(|c| c.recall * weight(c)).sum(),
        f1_score: per_class.iter().map(|c| c.f1_score * weight(c)).sum(),
        support: n,
    };

    Ok(ClassificationReport {
        variant: None,
        accuracy: (tp + tn) as f64 / n as f64,
        roc_auc,
        per_class,
        macro_avg,
        weighted_avg,
        n_samples: n,
    })
}

/// Metrics for one class from its true positives, false positives and support.
/// A zero denominator gives 0.
fn class_metrics(tp: usize, fp: usize, support: usize) -> ClassMetrics {
    let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, support);
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1_score,
        support,
    }
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// Area under the ROC curve via the rank statistic, averaging ranks over
/// tied scores. `None` when either class is absent.
pub fn roc_auc_score(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].partial_cmp(&y_score[b]).unwrap_or(Ordering::Equal));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1 ..= j+1 share their mean
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] > 0.5 {
                pos_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (label, m) in self.per_class.iter().enumerate() {
            write_row(f, &label.to_string(), m)?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>10} {:>10} {:>10.4} {:>10}", "accuracy", "", "", self.accuracy, self.n_samples)?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, label: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>12} {:>10.4} {:>10.4} {:>10.4} {:>10}",
        label, m.precision, m.recall, m.f1_score, m.support
    )
}

/// Write a titled report block: heading, accuracy, ROC AUC, then the table
pub fn write_summary<W: Write>(out: &mut W, title: &str, report: &ClassificationReport) -> io::Result<()> {
    writeln!(out, "\n=== {} ===", title)?;
    writeln!(out, "{}", "-".repeat(title.len() + 8))?;
    writeln!(out, "Accuracy : {:.4}", report.accuracy)?;
    match report.roc_auc {
        Some(auc) => writeln!(out, "ROC-AUC  : {:.4}", auc)?,
        None => writeln!(out, "ROC-AUC  : undefined (single class)")?,
    }
    write!(out, "{}", report)
}
