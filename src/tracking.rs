//! Experiment metric sink
//!
//! Records scalar metrics, the confusion matrix, and ROC curve points for
//! one evaluation run, and persists them as JSON under a per-run directory
//! so an external experiment tracker can pick them up.

use crate::error::Result;
use crate::evaluation::ConfusionMatrix;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything recorded for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier (UTC timestamp based)
    pub run_id: String,
    /// Scalar metrics by name
    pub metrics: BTreeMap<String, f64>,
    pub confusion_matrix: Option<ConfusionMatrix>,
    /// (false positive rate, true positive rate) points
    pub roc_curve: Vec<(f64, f64)>,
}

/// Accumulates metrics for a single evaluation run and writes them to disk.
pub struct ExperimentRun {
    base_dir: PathBuf,
    record: RunRecord,
}

impl ExperimentRun {
    /// Start a new run under `base_dir`; the run directory is created on save.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let run_id = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            record: RunRecord {
                run_id,
                metrics: BTreeMap::new(),
                confusion_matrix: None,
                roc_curve: Vec::new(),
            },
        }
    }

    /// Record one scalar metric.
    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        self.record.metrics.insert(name.into(), value);
    }

    /// Record the confusion matrix of the ensemble predictions.
    pub fn log_confusion_matrix(&mut self, confusion: ConfusionMatrix) {
        self.record.confusion_matrix = Some(confusion);
    }

    /// Record ROC curve points.
    pub fn log_roc_curve(&mut self, points: Vec<(f64, f64)>) {
        self.record.roc_curve = points;
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Persist the run record as JSON and return the run directory.
    pub fn save(&self) -> Result<PathBuf> {
        let run_dir = self.base_dir.join(&self.record.run_id);
        std::fs::create_dir_all(&run_dir)?;

        let json = serde_json::to_string_pretty(&self.record)?;
        std::fs::write(run_dir.join("run.json"), json)?;

        info!(run_id = %self.record.run_id, dir = %run_dir.display(), "experiment run saved");
        Ok(run_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_round_trip() {
        let dir = std::env::temp_dir().join("stackwise_tracking_test");
        let mut run = ExperimentRun::new(&dir);
        run.log_metric("accuracy", 0.97);
        run.log_metric("f1_score", 0.96);
        run.log_confusion_matrix(ConfusionMatrix {
            true_positives: 40,
            false_positives: 2,
            true_negatives: 55,
            false_negatives: 3,
        });
        run.log_roc_curve(vec![(0.0, 0.0), (0.1, 0.9), (1.0, 1.0)]);

        let run_dir = run.save().unwrap();
        let json = std::fs::read_to_string(run_dir.join("run.json")).unwrap();
        let restored: RunRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.metrics["accuracy"], 0.97);
        assert_eq!(restored.roc_curve.len(), 3);
        assert_eq!(restored.confusion_matrix.unwrap().true_positives, 40);
    }
}
