//! Error types for the stackwise crate

use std::fmt;
use thiserror::Error;

/// Result type alias for stackwise operations
pub type Result<T> = std::result::Result<T, StackError>;

/// Main error type for stacked ensemble construction and evaluation
#[derive(Error, Debug)]
pub enum StackError {
    /// Unknown learner kind, missing or invalid hyperparameter, or a fold
    /// count the dataset cannot satisfy.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Row/label misalignment, a class too rare to stratify, or a missing
    /// target column.
    #[error("data error: {0}")]
    Data(String),

    /// Underlying fit/predict failure, annotated with the learner and fold
    /// where it originated.
    #[error("model error: {0}")]
    Model(ModelFailure),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Context attached to a base- or meta-learner failure
#[derive(Debug, Clone)]
pub struct ModelFailure {
    /// Name of the learner that failed
    pub learner: String,
    /// Fold index, when the failure happened inside out-of-fold training
    pub fold: Option<usize>,
    /// Underlying cause
    pub message: String,
}

impl fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fold {
            Some(fold) => write!(f, "learner '{}' (fold {}): {}", self.learner, fold, self.message),
            None => write!(f, "learner '{}': {}", self.learner, self.message),
        }
    }
}

impl StackError {
    /// Wrap a fit/predict failure with the learner and fold it came from.
    pub fn model(learner: impl Into<String>, fold: Option<usize>, message: impl Into<String>) -> Self {
        StackError::Model(ModelFailure {
            learner: learner.into(),
            fold,
            message: message.into(),
        })
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for StackError {
    fn from(err: csv::Error) -> Self {
        StackError::Serialization(err.to_string())
    }
}
