//! Decision tree classifier

use crate::error::{Result, StackError};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node carrying the positive-class fraction of its training rows
    Leaf {
        positive_fraction: f64,
        n_samples: usize,
    },
    /// Internal node with an axis-aligned split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    Gini,
    Entropy,
}

/// Binary decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeClassifier {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features considered per split (all by default); when
    /// restricted, the subset is drawn fresh at every split
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-split feature sampling
    pub seed: u64,
    n_features: usize,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            seed: 42,
            n_features: 0,
        }
    }

    /// Set the seed for per-split feature sampling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit the tree to training data with binary 0/1 labels.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(StackError::Data(format!(
                "feature matrix has {} rows but y has {} entries",
                n_samples,
                y.len()
            )));
        }
        if n_samples < self.min_samples_split {
            return Err(StackError::Data(format!(
                "need at least {} samples to split, got {}",
                self.min_samples_split, n_samples
            )));
        }

        self.n_features = x.ncols();

        let indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));

        Ok(())
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let positive_fraction = positives as f64 / n_samples as f64;

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || positives == 0
            || positives == n_samples;

        if should_stop {
            return TreeNode::Leaf {
                positive_fraction,
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold)) = self.find_best_split(x, y, indices, rng) {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf || right_indices.len() < self.min_samples_leaf {
                return TreeNode::Leaf {
                    positive_fraction,
                    n_samples,
                };
            }

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                positive_fraction,
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let n_features_to_try = self.max_features.unwrap_or(n_features).min(n_features);

        let candidate_features: Vec<usize> = if n_features_to_try < n_features {
            rand::seq::index::sample(rng, n_features, n_features_to_try).into_vec()
        } else {
            (0..n_features).collect()
        };

        let total_positives = indices.iter().filter(|&&i| y[i] > 0.5).count();
        let parent_impurity = self.impurity(total_positives, indices.len());

        // Each candidate feature independently finds its best threshold
        let feature_results: Vec<Option<(usize, f64, f64)>> = candidate_features
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = None;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left_count = 0usize;
                    let mut left_positives = 0usize;
                    for &idx in indices {
                        if x[[idx, feature_idx]] <= threshold {
                            left_count += 1;
                            if y[idx] > 0.5 {
                                left_positives += 1;
                            }
                        }
                    }
                    let right_count = indices.len() - left_count;
                    let right_positives = total_positives - left_positives;

                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let n = indices.len() as f64;
                    let weighted_impurity = (left_count as f64
                        * self.impurity(left_positives, left_count)
                        + right_count as f64 * self.impurity(right_positives, right_count))
                        / n;

                    let gain = parent_impurity - weighted_impurity;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = Some(threshold);
                    }
                }

                best_threshold.map(|t| (feature_idx, t, best_gain))
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    fn impurity(&self, positives: usize, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let p = positives as f64 / count as f64;
        match self.criterion {
            Criterion::Gini => 2.0 * p * (1.0 - p),
            Criterion::Entropy => {
                let mut entropy = 0.0;
                if p > 0.0 {
                    entropy -= p * p.ln();
                }
                if p < 1.0 {
                    entropy -= (1.0 - p) * (1.0 - p).ln();
                }
                entropy
            }
        }
    }

    /// Predict class labels by thresholding leaf probabilities at 0.5.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Predict positive-class probabilities.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| StackError::model("decision_tree", None, "model not fitted"))?;

        let proba: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let sample = x.row(i);
                Self::traverse(root, &sample.to_vec())
            })
            .collect();

        Ok(Array1::from_vec(proba))
    }

    fn traverse(node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf {
                positive_fraction, ..
            } => *positive_fraction,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::traverse(left, sample)
                } else {
                    Self::traverse(right, sample)
                }
            }
        }
    }

    /// Depth of the fitted tree
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.2],
            [0.2, 0.1],
            [1.0, 1.0],
            [1.1, 0.9],
            [0.9, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTreeClassifier::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_proba_in_unit_interval() {
        let x = array![[0.0], [0.4], [0.5], [1.0], [0.45], [0.55]];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTreeClassifier::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        for &p in proba.iter() {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTreeClassifier::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.depth() <= 3); // root split + one level + leaves
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let tree = DecisionTreeClassifier::new();
        let x = array![[1.0]];
        assert!(tree.predict(&x).is_err());
    }
}
