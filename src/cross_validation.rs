//! Stratified fold generation
//!
//! Partitions training rows into k folds that preserve the class ratio.
//! The partition is a pure function of the label vector, the fold count,
//! and the seed: classes are grouped in label order, each class's indices
//! are shuffled with a seeded RNG, and then dealt round-robin across the
//! folds.

use crate::error::{Result, StackError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub val_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Deterministic stratified k-fold splitter
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Generate the k train/validation splits for a label vector.
    ///
    /// Every row appears in exactly one validation set, and each fold holds
    /// ⌊n_c/k⌋ or ⌈n_c/k⌉ members of class c.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<Fold>> {
        if self.n_splits < 2 {
            return Err(StackError::Configuration(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }

        // BTreeMap keeps class iteration order stable across runs
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        for (&class, indices) in &class_indices {
            if indices.len() < self.n_splits {
                return Err(StackError::Data(format!(
                    "class {} has only {} members, cannot stratify into {} folds",
                    class,
                    indices.len(),
                    self.n_splits
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for indices in class_indices.values_mut() {
            indices.shuffle(&mut rng);
            for (i, &idx) in indices.iter().enumerate() {
                fold_members[i % self.n_splits].push(idx);
            }
        }

        let folds = (0..self.n_splits)
            .map(|fold_idx| {
                let val_indices = fold_members[fold_idx].clone();
                let train_indices: Vec<usize> = fold_members
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, members)| members.iter().copied())
                    .collect();

                Fold {
                    train_indices,
                    val_indices,
                    fold_idx,
                }
            })
            .collect();

        Ok(folds)
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }
}
