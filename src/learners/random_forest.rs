//! Random forest classifier

use super::decision_tree::DecisionTreeClassifier;
use crate::error::{Result, StackError};
use ndarray::{Array1, Array2};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged ensemble of binary decision trees. Probabilities are the mean of
/// the per-tree leaf probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Seed for bootstrap sampling; tree i uses seed + i
    pub seed: u64,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the bootstrap seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the forest to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(StackError::Data(format!(
                "feature matrix has {} rows but y has {} entries",
                n_samples,
                y.len()
            )));
        }

        let n_features = x.ncols();
        // sqrt(p) features per split, as is conventional for classification
        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.seed;

        let trees: Result<Vec<DecisionTreeClassifier>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                let x_boot = x.select(ndarray::Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = DecisionTreeClassifier::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_seed(base_seed.wrapping_add(tree_idx as u64));
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.max_features = Some(max_features);

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        Ok(())
    }

    /// Predict positive-class probabilities.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(StackError::model("random_forest", None, "model not fitted"));
        }

        let tree_probas: Result<Vec<Array1<f64>>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect();
        let tree_probas = tree_probas?;

        let n_samples = x.nrows();
        let mut mean = Array1::zeros(n_samples);
        for proba in &tree_probas {
            mean = mean + proba;
        }
        Ok(mean / tree_probas.len() as f64)
    }

    /// Predict class labels by thresholding the mean probability at 0.5.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
