//! Support vector classifier
//!
//! Binary SVC trained with SMO (Sequential Minimal Optimization).
//! Probability output is a logistic squashing of the margin.

use crate::config::SvcKernel;
use crate::error::{Result, StackError};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Support vector classifier for binary 0/1 labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvcClassifier {
    /// Regularization parameter
    pub c: f64,
    /// Kernel function
    pub kernel: SvcKernel,
    /// Tolerance for the stopping criterion
    pub tol: f64,
    /// Maximum number of SMO passes over the data
    pub max_iter: usize,
    /// Seed for working-pair selection
    pub seed: u64,
    support_vectors: Option<Array2<f64>>,
    /// Lagrange multipliers for the support vectors
    alphas: Option<Array1<f64>>,
    /// Support vector labels in ±1 encoding
    support_labels: Option<Array1<f64>>,
    bias: f64,
}

impl SvcClassifier {
    pub fn new(c: f64, kernel: SvcKernel) -> Self {
        Self {
            c,
            kernel,
            tol: 1e-3,
            max_iter: 1000,
            seed: 42,
            support_vectors: None,
            alphas: None,
            support_labels: None,
            bias: 0.0,
        }
    }

    /// Set the seed for working-pair selection
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit the classifier on binary 0/1 labels.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();

        if n != y.len() {
            return Err(StackError::Data(format!(
                "feature matrix has {} rows but y has {} entries",
                n,
                y.len()
            )));
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(StackError::model(
                "svc",
                None,
                format!(
                    "dataset has {} samples, exceeding the maximum {} for the kernel matrix",
                    n, MAX_KERNEL_MATRIX_SAMPLES
                ),
            ));
        }

        let positives = y.iter().filter(|&&v| v > 0.5).count();
        if positives == 0 || positives == n {
            return Err(StackError::model(
                "svc",
                None,
                "training set contains a single class",
            ));
        }

        // SMO works in ±1 label space
        let y_signed: Array1<f64> = y.mapv(|v| if v > 0.5 { 1.0 } else { -1.0 });

        let (alphas, bias) = self.smo_train(x, &y_signed)?;

        let support_indices: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        let sv_count = support_indices.len();
        let n_features = x.ncols();

        let mut support_vectors = Array2::zeros((sv_count, n_features));
        let mut support_labels = Array1::zeros(sv_count);
        let mut support_alphas = Array1::zeros(sv_count);

        for (i, &idx) in support_indices.iter().enumerate() {
            support_vectors.row_mut(i).assign(&x.row(idx));
            support_labels[i] = y_signed[idx];
            support_alphas[i] = alphas[idx];
        }

        self.support_vectors = Some(support_vectors);
        self.support_labels = Some(support_labels);
        self.alphas = Some(support_alphas);
        self.bias = bias;
        Ok(())
    }

    fn smo_train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(Array1<f64>, f64)> {
        let n = x.nrows();

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;

        let kernel_matrix = self.compute_kernel_matrix(x);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.max_iter {
            let mut num_changed = 0;

            if n <= 1 {
                break;
            }

            for i in 0..n {
                let e_i = Self::decision_cached(&kernel_matrix, &alphas, y, bias, i) - y[i];

                // KKT violation check
                if (y[i] * e_i < -self.tol && alphas[i] < self.c)
                    || (y[i] * e_i > self.tol && alphas[i] > 0.0)
                {
                    let j = loop {
                        let j = rng.gen_range(0..n);
                        if j != i {
                            break j;
                        }
                    };

                    let e_j = Self::decision_cached(&kernel_matrix, &alphas, y, bias, j) - y[j];

                    let alpha_i_old = alphas[i];
                    let alpha_j_old = alphas[j];

                    let (l, h) = if y[i] != y[j] {
                        (
                            (alphas[j] - alphas[i]).max(0.0),
                            (self.c + alphas[j] - alphas[i]).min(self.c),
                        )
                    } else {
                        (
                            (alphas[i] + alphas[j] - self.c).max(0.0),
                            (alphas[i] + alphas[j]).min(self.c),
                        )
                    };

                    if (l - h).abs() < 1e-10 {
                        continue;
                    }

                    let eta =
                        2.0 * kernel_matrix[[i, j]] - kernel_matrix[[i, i]] - kernel_matrix[[j, j]];
                    if eta >= 0.0 {
                        continue;
                    }

                    alphas[j] = (alphas[j] - y[j] * (e_i - e_j) / eta).max(l).min(h);

                    if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                        continue;
                    }

                    alphas[i] += y[i] * y[j] * (alpha_j_old - alphas[j]);

                    let b1 = bias
                        - e_i
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, i]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[i, j]];
                    let b2 = bias
                        - e_j
                        - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, j]]
                        - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[j, j]];

                    bias = if alphas[i] > 0.0 && alphas[i] < self.c {
                        b1
                    } else if alphas[j] > 0.0 && alphas[j] < self.c {
                        b2
                    } else {
                        (b1 + b2) / 2.0
                    };

                    num_changed += 1;
                }
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        Ok((alphas, bias))
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let val = self.kernel(&x.row(i).to_owned(), &x.row(j).to_owned());
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    fn kernel(&self, x1: &Array1<f64>, x2: &Array1<f64>) -> f64 {
        match self.kernel {
            SvcKernel::Linear => x1.dot(x2),
            SvcKernel::Rbf { gamma } => {
                let diff = x1 - x2;
                (-gamma * diff.dot(&diff)).exp()
            }
            SvcKernel::Polynomial { degree, gamma } => {
                (gamma * x1.dot(x2) + 1.0).powi(degree.min(i32::MAX as usize) as i32)
            }
        }
    }

    fn decision_cached(
        k: &Array2<f64>,
        alphas: &Array1<f64>,
        y: &Array1<f64>,
        bias: f64,
        idx: usize,
    ) -> f64 {
        let mut sum = 0.0;
        for i in 0..alphas.len() {
            sum += alphas[i] * y[i] * k[[i, idx]];
        }
        sum + bias
    }

    fn score_sample(&self, sample: &Array1<f64>) -> Result<f64> {
        let (sv, sv_labels, alphas) =
            match (&self.support_vectors, &self.support_labels, &self.alphas) {
                (Some(sv), Some(labels), Some(alphas)) => (sv, labels, alphas),
                _ => return Err(StackError::model("svc", None, "model not fitted")),
            };

        let mut sum = self.bias;
        for j in 0..sv.nrows() {
            let k_val = self.kernel(sample, &sv.row(j).to_owned());
            sum += alphas[j] * sv_labels[j] * k_val;
        }
        Ok(sum)
    }

    /// Margin values of the fitted decision function.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let n = x.nrows();
        let mut scores = Array1::zeros(n);
        for i in 0..n {
            scores[i] = self.score_sample(&x.row(i).to_owned())?;
        }
        Ok(scores)
    }

    /// Predict positive-class probabilities by squashing the margin.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        Ok(scores.mapv(|s| 1.0 / (1.0 + (-s).exp())))
    }

    /// Predict class labels from the sign of the margin.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        Ok(scores.mapv(|s| if s >= 0.0 { 1.0 } else { 0.0 }))
    }

    /// Number of support vectors retained after fitting
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors
            .as_ref()
            .map(|sv| sv.nrows())
            .unwrap_or(0)
    }
}
