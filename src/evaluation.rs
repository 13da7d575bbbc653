//! Held-out evaluation of the stacked model and its base learners
//!
//! Base learners are scored with the full-training-set instances stored in
//! the `StackedModel`; nothing is ever refit on held-out data.

use crate::data::Dataset;
use crate::error::Result;
use crate::learners::{Predictable, ProbabilityEmitting};
use crate::stacking::StackedModel;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Name of the ensemble row in the comparison table
pub const ENSEMBLE_ROW_NAME: &str = "stacking_ensemble";

/// One row of the learner comparison table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub learner: String,
    pub accuracy: f64,
    pub f1: f64,
}

/// Confusion counts for binary predictions at the 0.5 threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
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

        Self {
            true_positives: tp,
            false_positives: fp,
            true_negatives: tn,
            false_negatives: fn_,
        }
    }
}

/// Fraction of correct predictions
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (**t > 0.5) == (**p > 0.5))
        .count();
    correct as f64 / y_true.len() as f64
}

/// F1 score of the positive class
pub fn f1_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let cm = ConfusionMatrix::from_predictions(y_true, y_pred);

    let precision_den = cm.true_positives + cm.false_positives;
    let recall_den = cm.true_positives + cm.false_negatives;
    if precision_den == 0 || recall_den == 0 {
        return 0.0;
    }

    let precision = cm.true_positives as f64 / precision_den as f64;
    let recall = cm.true_positives as f64 / recall_den as f64;
    if precision + recall == 0.0 {
        return 0.0;
    }
    2.0 * precision * recall / (precision + recall)
}

/// ROC curve points as (false positive rate, true positive rate),
/// ordered from threshold above max score down to threshold 0.
pub fn roc_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Vec<(f64, f64)> {
    let positives = y_true.iter().filter(|&&t| t > 0.5).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 0.0)];
    let mut tp = 0usize;
    let mut fp = 0usize;

    let mut i = 0;
    while i < order.len() {
        // Consume ties as one threshold step
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push((fp as f64 / negatives as f64, tp as f64 / positives as f64));
    }

    points
}

/// Evaluation output: the ordered comparison table plus the vectors the
/// metric sink needs for confusion-matrix and ROC plots.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Ensemble row first, then one row per base learner in column order
    pub rows: Vec<MetricsRow>,
    pub confusion: ConfusionMatrix,
    /// Held-out labels, ensemble predictions, ensemble probabilities
    pub y_true: Array1<f64>,
    pub y_pred: Array1<f64>,
    pub y_proba: Array1<f64>,
}

impl EvaluationReport {
    /// The ensemble's own metrics row
    pub fn ensemble(&self) -> &MetricsRow {
        &self.rows[0]
    }
}

/// Score the stacked model and each stored base learner on a held-out set.
pub fn evaluate(model: &StackedModel, holdout: &Dataset) -> Result<EvaluationReport> {
    let x = holdout.features();
    let y = holdout.labels();

    let y_pred = model.predict(x)?;
    let y_proba = model.predict_proba(x)?;

    let mut rows = vec![MetricsRow {
        learner: ENSEMBLE_ROW_NAME.to_string(),
        accuracy: accuracy(y, &y_pred),
        f1: f1_score(y, &y_pred),
    }];

    for (name, learner) in model.base_learners() {
        let pred = learner.predict(x)?;
        rows.push(MetricsRow {
            learner: name.clone(),
            accuracy: accuracy(y, &pred),
            f1: f1_score(y, &pred),
        });
    }

    let confusion = ConfusionMatrix::from_predictions(y, &y_pred);

    info!(
        accuracy = rows[0].accuracy,
        f1 = rows[0].f1,
        learners = rows.len() - 1,
        "held-out evaluation complete"
    );

    Ok(EvaluationReport {
        rows,
        confusion,
        y_true: y.clone(),
        y_pred,
        y_proba,
    })
}
