//! Learner and ensemble configuration
//!
//! A `StackingConfig` declares the ordered list of base learners, the meta
//! learner, the fold count, the random seed, and the passthrough flag.
//! Learner kinds form a closed enum: adding a kind is a compile-time change,
//! not a runtime string lookup.

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Supported learner kinds with their hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LearnerKind {
    /// CART-style decision tree classifier
    DecisionTree {
        #[serde(default)]
        max_depth: Option<usize>,
    },
    /// L2-regularized logistic regression; `c` is the inverse
    /// regularization strength
    LogisticRegression {
        c: f64,
    },
    /// Support vector classifier trained with SMO
    Svc {
        c: f64,
        kernel: SvcKernel,
    },
    /// Random forest classifier (default meta learner)
    RandomForest {
        n_estimators: usize,
    },
}

/// Kernel selection for the SVC learner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvcKernel {
    Linear,
    Rbf { gamma: f64 },
    Polynomial { degree: usize, gamma: f64 },
}

impl LearnerKind {
    /// Stable display name for reports and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            LearnerKind::DecisionTree { .. } => "decision_tree",
            LearnerKind::LogisticRegression { .. } => "logistic_regression",
            LearnerKind::Svc { .. } => "svc",
            LearnerKind::RandomForest { .. } => "random_forest",
        }
    }

    /// Validate hyperparameters without constructing an estimator
    pub fn validate(&self) -> Result<()> {
        match self {
            LearnerKind::DecisionTree { max_depth } => {
                if let Some(0) = max_depth {
                    return Err(StackError::Configuration(
                        "decision_tree: max_depth must be at least 1".to_string(),
                    ));
                }
            }
            LearnerKind::LogisticRegression { c } => {
                if *c <= 0.0 || !c.is_finite() {
                    return Err(StackError::Configuration(format!(
                        "logistic_regression: C must be positive and finite, got {}",
                        c
                    )));
                }
            }
            LearnerKind::Svc { c, kernel } => {
                if *c <= 0.0 || !c.is_finite() {
                    return Err(StackError::Configuration(format!(
                        "svc: C must be positive and finite, got {}",
                        c
                    )));
                }
                match kernel {
                    SvcKernel::Rbf { gamma } | SvcKernel::Polynomial { gamma, .. } => {
                        if *gamma <= 0.0 || !gamma.is_finite() {
                            return Err(StackError::Configuration(format!(
                                "svc: gamma must be positive and finite, got {}",
                                gamma
                            )));
                        }
                    }
                    SvcKernel::Linear => {}
                }
            }
            LearnerKind::RandomForest { n_estimators } => {
                if *n_estimators == 0 {
                    return Err(StackError::Configuration(
                        "random_forest: n_estimators must be at least 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A named, immutable learner declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSpec {
    /// Name used for OOF column identity, reports, and error context
    pub name: String,
    #[serde(flatten)]
    pub kind: LearnerKind,
}

impl LearnerSpec {
    pub fn new(name: impl Into<String>, kind: LearnerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Full declarative configuration for stacked ensemble training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingConfig {
    /// Ordered base learners; order defines OOF column layout
    pub base_learners: Vec<LearnerSpec>,
    /// The combiner fitted on the meta-feature matrix
    pub meta_learner: LearnerSpec,
    /// Number of stratified folds
    pub n_folds: usize,
    /// Seed driving fold shuffling and any stochastic learner
    pub seed: u64,
    /// Whether original features are concatenated with OOF columns
    pub passthrough: bool,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            base_learners: Vec::new(),
            meta_learner: LearnerSpec::new(
                "meta",
                LearnerKind::RandomForest { n_estimators: 100 },
            ),
            n_folds: 5,
            seed: 42,
            passthrough: false,
        }
    }
}

impl StackingConfig {
    /// Load a configuration from a JSON parameters file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| StackError::Configuration(format!("invalid parameters file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check structural validity and every learner's hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.base_learners.is_empty() {
            return Err(StackError::Configuration(
                "at least one base learner is required".to_string(),
            ));
        }
        if self.n_folds < 2 {
            return Err(StackError::Configuration(format!(
                "n_folds must be at least 2, got {}",
                self.n_folds
            )));
        }

        let mut seen = HashSet::new();
        for spec in &self.base_learners {
            if !seen.insert(spec.name.as_str()) {
                return Err(StackError::Configuration(format!(
                    "duplicate base learner name '{}'",
                    spec.name
                )));
            }
            spec.kind.validate()?;
        }
        self.meta_learner.kind.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{"name": "x", "kind": "gradient_hamster"}"#;
        assert!(serde_json::from_str::<LearnerSpec>(json).is_err());
    }

    #[test]
    fn test_missing_required_hyperparameter_rejected() {
        // svc without a kernel must fail to deserialize, not default
        let json = r#"{"name": "svc", "kind": "svc", "c": 2.0}"#;
        assert!(serde_json::from_str::<LearnerSpec>(json).is_err());

        let with_kernel = r#"{"name": "svc", "kind": "svc", "c": 2.0, "kernel": {"rbf": {"gamma": 0.5}}}"#;
        let spec: LearnerSpec = serde_json::from_str(with_kernel).unwrap();
        assert_eq!(
            spec.kind,
            LearnerKind::Svc {
                c: 2.0,
                kernel: SvcKernel::Rbf { gamma: 0.5 },
            }
        );
    }

    #[test]
    fn test_selectable_svc_kernels() {
        for (json, expected) in [
            (r#""linear""#, SvcKernel::Linear),
            (r#"{"rbf": {"gamma": 1.0}}"#, SvcKernel::Rbf { gamma: 1.0 }),
            (
                r#"{"polynomial": {"degree": 3, "gamma": 0.1}}"#,
                SvcKernel::Polynomial {
                    degree: 3,
                    gamma: 0.1,
                },
            ),
        ] {
            let kernel: SvcKernel = serde_json::from_str(json).unwrap();
            assert_eq!(kernel, expected);
        }
    }

    #[test]
    fn test_validate_rejects_nonpositive_c() {
        let kind = LearnerKind::LogisticRegression { c: -1.0 };
        assert!(kind.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let config = StackingConfig {
            base_learners: vec![
                LearnerSpec::new("dt", LearnerKind::DecisionTree { max_depth: None }),
                LearnerSpec::new("dt", LearnerKind::LogisticRegression { c: 1.0 }),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_single_fold() {
        let config = StackingConfig {
            base_learners: vec![LearnerSpec::new(
                "dt",
                LearnerKind::DecisionTree { max_depth: None },
            )],
            n_folds: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = StackingConfig {
            base_learners: vec![
                LearnerSpec::new("dt", LearnerKind::DecisionTree { max_depth: Some(4) }),
                LearnerSpec::new(
                    "svc",
                    LearnerKind::Svc {
                        c: 1.0,
                        kernel: SvcKernel::Rbf { gamma: 0.5 },
                    },
                ),
            ],
            passthrough: true,
            ..Default::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let restored: StackingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.base_learners, config.base_learners);
        assert!(restored.passthrough);
    }
}
