//! Base and meta learner implementations
//!
//! Provides the trainable classifiers the ensemble is built from:
//! - Decision tree
//! - Logistic regression
//! - Support vector classifier (SMO)
//! - Random forest
//!
//! The stack builder is written against the capability traits below, not
//! against any concrete learner. `Learner` is a closed sum type over the
//! supported kinds; `Learner::from_spec` is the registry.

pub mod decision_tree;
pub mod linear;
pub mod random_forest;
pub mod svm;

pub use decision_tree::{Criterion, DecisionTreeClassifier, TreeNode};
pub use linear::LogisticRegression;
pub use random_forest::RandomForestClassifier;
pub use svm::SvcClassifier;

use crate::config::{LearnerKind, LearnerSpec};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Capability: can be fitted on a feature matrix and binary labels.
pub trait Trainable {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;
}

/// Capability: produces hard 0/1 class predictions.
pub trait Predictable {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Capability: produces positive-class probabilities. Required for every
/// learner feeding the stack.
pub trait ProbabilityEmitting {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// A classifier of any supported kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Learner {
    DecisionTree(DecisionTreeClassifier),
    LogisticRegression(LogisticRegression),
    Svc(SvcClassifier),
    RandomForest(RandomForestClassifier),
}

impl Learner {
    /// Build an unfitted learner from a spec. Pure factory: hyperparameters
    /// are validated here and the returned estimator owns all its state.
    ///
    /// `seed` drives any stochastic part of the learner so the whole
    /// ensemble is reproducible from one configuration seed.
    pub fn from_spec(spec: &LearnerSpec, seed: u64) -> Result<Self> {
        spec.kind.validate()?;

        Ok(match &spec.kind {
            LearnerKind::DecisionTree { max_depth } => {
                let mut tree = DecisionTreeClassifier::new();
                if let Some(d) = max_depth {
                    tree = tree.with_max_depth(*d);
                }
                Learner::DecisionTree(tree)
            }
            LearnerKind::LogisticRegression { c } => {
                Learner::LogisticRegression(LogisticRegression::new(*c))
            }
            LearnerKind::Svc { c, kernel } => {
                Learner::Svc(SvcClassifier::new(*c, *kernel).with_seed(seed))
            }
            LearnerKind::RandomForest { n_estimators } => {
                Learner::RandomForest(RandomForestClassifier::new(*n_estimators).with_seed(seed))
            }
        })
    }

    /// Kind name for logs and reports
    pub fn kind_name(&self) -> &'static str {
        match self {
            Learner::DecisionTree(_) => "decision_tree",
            Learner::LogisticRegression(_) => "logistic_regression",
            Learner::Svc(_) => "svc",
            Learner::RandomForest(_) => "random_forest",
        }
    }
}

impl Trainable for Learner {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Learner::DecisionTree(m) => m.fit(x, y),
            Learner::LogisticRegression(m) => m.fit(x, y),
            Learner::Svc(m) => m.fit(x, y),
            Learner::RandomForest(m) => m.fit(x, y),
        }
    }
}

impl Predictable for Learner {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Learner::DecisionTree(m) => m.predict(x),
            Learner::LogisticRegression(m) => m.predict(x),
            Learner::Svc(m) => m.predict(x),
            Learner::RandomForest(m) => m.predict(x),
        }
    }
}

impl ProbabilityEmitting for Learner {
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Learner::DecisionTree(m) => m.predict_proba(x),
            Learner::LogisticRegression(m) => m.predict_proba(x),
            Learner::Svc(m) => m.predict_proba(x),
            Learner::RandomForest(m) => m.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SvcKernel;
    use ndarray::array;

    #[test]
    fn test_registry_builds_every_kind() {
        let specs = [
            LearnerSpec::new("dt", LearnerKind::DecisionTree { max_depth: Some(3) }),
            LearnerSpec::new("lr", LearnerKind::LogisticRegression { c: 1.0 }),
            LearnerSpec::new(
                "svc",
                LearnerKind::Svc {
                    c: 1.0,
                    kernel: SvcKernel::Linear,
                },
            ),
            LearnerSpec::new("rf", LearnerKind::RandomForest { n_estimators: 5 }),
        ];

        for spec in &specs {
            let learner = Learner::from_spec(spec, 42).unwrap();
            assert_eq!(learner.kind_name(), spec.kind.kind_name());
        }
    }

    #[test]
    fn test_registry_rejects_invalid_hyperparameters() {
        let spec = LearnerSpec::new("lr", LearnerKind::LogisticRegression { c: 0.0 });
        assert!(Learner::from_spec(&spec, 42).is_err());
    }

    #[test]
    fn test_capability_dispatch() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let spec = LearnerSpec::new("dt", LearnerKind::DecisionTree { max_depth: None });
        let mut learner = Learner::from_spec(&spec, 42).unwrap();
        learner.fit(&x, &y).unwrap();

        let proba = learner.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), 4);
        let labels = learner.predict(&x).unwrap();
        assert!(labels.iter().all(|&v| v == 0.0 || v == 1.0));
    }
}
