//! Fitted stacked model and inference-time meta-feature assembly

use crate::error::{Result, StackError};
use crate::learners::{Learner, Predictable, ProbabilityEmitting};
use ndarray::{concatenate, Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Concatenate learner score columns with the original features when
/// passthrough is on. Used identically by training-time assembly and
/// inference-time reconstruction so the meta-feature layout cannot drift
/// between the two.
pub fn assemble_meta_features(
    scores: &Array2<f64>,
    x: &Array2<f64>,
    passthrough: bool,
) -> Array2<f64> {
    if passthrough {
        concatenate![Axis(1), scores.view(), x.view()]
    } else {
        scores.clone()
    }
}

/// A fitted two-layer stacked classifier.
///
/// Owns the base estimators refit on the full training set, the fitted
/// meta-estimator, and the passthrough flag. The base-learner name order is
/// part of the persisted state: the predictor always rebuilds meta-features
/// from this stored order, never from a caller-supplied learner list.
/// Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackedModel {
    base_learners: Vec<(String, Learner)>,
    meta_learner: Learner,
    passthrough: bool,
    /// Original feature count seen at training time
    n_features: usize,
}

impl StackedModel {
    pub(crate) fn new(
        base_learners: Vec<(String, Learner)>,
        meta_learner: Learner,
        passthrough: bool,
        n_features: usize,
    ) -> Self {
        Self {
            base_learners,
            meta_learner,
            passthrough,
            n_features,
        }
    }

    /// Base-learner names in the order used for meta-feature columns
    pub fn base_learner_names(&self) -> Vec<&str> {
        self.base_learners.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The stored full-training-set base estimators, in column order
    pub fn base_learners(&self) -> &[(String, Learner)] {
        &self.base_learners
    }

    /// The fitted combiner
    pub fn meta_learner(&self) -> &Learner {
        &self.meta_learner
    }

    pub fn passthrough(&self) -> bool {
        self.passthrough
    }

    fn check_feature_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(StackError::model(
                "stacked_model",
                None,
                format!(
                    "meta-feature layout mismatch: trained on {} features, got {}",
                    self.n_features,
                    x.ncols()
                ),
            ));
        }
        Ok(())
    }

    /// Rebuild the meta-feature matrix for new rows: one probability column
    /// per stored base learner, in stored order, plus the original features
    /// when passthrough is on.
    fn meta_features(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_feature_width(x)?;

        let n_samples = x.nrows();
        let mut scores = Array2::zeros((n_samples, self.base_learners.len()));

        for (column, (name, learner)) in self.base_learners.iter().enumerate() {
            let proba = learner
                .predict_proba(x)
                .map_err(|e| StackError::model(name, None, e.to_string()))?;
            scores.column_mut(column).assign(&proba);
        }

        Ok(assemble_meta_features(&scores, x, self.passthrough))
    }

    /// Positive-class probability of the ensemble.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let meta_x = self.meta_features(x)?;
        self.meta_learner
            .predict_proba(&meta_x)
            .map_err(|e| StackError::model("meta", None, e.to_string()))
    }

    /// Hard 0/1 prediction, delegated to the meta-estimator's decision rule.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let meta_x = self.meta_features(x)?;
        self.meta_learner
            .predict(&meta_x)
            .map_err(|e| StackError::model("meta", None, e.to_string()))
    }

    /// Persist the model as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a model persisted with [`StackedModel::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        Ok(model)
    }
}
