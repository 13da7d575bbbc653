//! Stackwise - stacked ensemble training and evaluation
//!
//! Trains a two-layer stacked ensemble for binary tabular classification:
//! diverse base learners produce positive-class probabilities, and a
//! meta-learner combines them (optionally alongside the original features)
//! into the final prediction.
//!
//! # Modules
//!
//! - [`config`] - Declarative learner and ensemble configuration
//! - [`data`] - Dataset container and DataFrame ingestion
//! - [`cross_validation`] - Deterministic stratified fold generation
//! - [`learners`] - Base and meta learner implementations
//! - [`stacking`] - Out-of-fold stack builder, trainer, and fitted model
//! - [`evaluation`] - Held-out metrics and learner comparison
//! - [`report`] - Comparison table and summary report writing
//! - [`tracking`] - Experiment metric sink

pub mod error;

pub mod config;
pub mod cross_validation;
pub mod data;
pub mod evaluation;
pub mod learners;
pub mod report;
pub mod stacking;
pub mod tracking;

pub use error::{Result, StackError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{LearnerKind, LearnerSpec, StackingConfig, SvcKernel};
    pub use crate::cross_validation::{Fold, StratifiedKFold};
    pub use crate::data::Dataset;
    pub use crate::error::{Result, StackError};
    pub use crate::evaluation::{evaluate, EvaluationReport, MetricsRow};
    pub use crate::learners::{Learner, Predictable, ProbabilityEmitting, Trainable};
    pub use crate::stacking::{StackedModel, StackingTrainer};
    pub use crate::tracking::ExperimentRun;
}
