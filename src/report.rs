//! Comparison table and summary report writing

use crate::error::Result;
use crate::evaluation::MetricsRow;
use crate::stacking::StackedModel;
use std::fmt::Write as _;
use std::path::Path;

/// Write the learner comparison table as CSV (ensemble row first).
pub fn write_comparison_csv(rows: &[MetricsRow], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render the free-text summary naming the base and meta learners and
/// listing the comparison table.
pub fn render_summary(model: &StackedModel, rows: &[MetricsRow]) -> String {
    let mut out = String::new();
    out.push_str("Stacking Ensemble Results\n");

    let base_names: Vec<String> = model
        .base_learners()
        .iter()
        .map(|(name, learner)| format!("{} ({})", name, learner.kind_name()))
        .collect();
    let _ = writeln!(out, "Base Learners: {}", base_names.join(", "));
    let _ = writeln!(out, "Meta Learner: {}", model.meta_learner().kind_name());
    let _ = writeln!(out, "Passthrough: {}", model.passthrough());
    out.push('\n');

    let name_width = rows
        .iter()
        .map(|r| r.learner.len())
        .max()
        .unwrap_or(7)
        .max("learner".len());

    let _ = writeln!(out, "{:<name_width$}  accuracy      f1", "learner");
    for row in rows {
        let _ = writeln!(
            out,
            "{:<name_width$}    {:.4}  {:.4}",
            row.learner, row.accuracy, row.f1
        );
    }

    out
}

/// Write the summary report to a text file.
pub fn write_summary(
    model: &StackedModel,
    rows: &[MetricsRow],
    path: impl AsRef<Path>,
) -> Result<()> {
    std::fs::write(path, render_summary(model, rows))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearnerKind, LearnerSpec, StackingConfig};
    use crate::data::Dataset;
    use crate::stacking::StackingTrainer;
    use ndarray::{Array, Array1, Array2};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fitted_model() -> StackedModel {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let n = 40;
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let label = (i % 2) as f64;
            rows.push(label * 2.0 + rng.gen_range(-0.5..0.5));
            labels.push(label);
        }
        let x: Array2<f64> = Array::from_shape_vec((n, 1), rows).unwrap();
        let dataset =
            Dataset::new(x, vec!["f0".to_string()], Array1::from_vec(labels)).unwrap();

        let config = StackingConfig {
            base_learners: vec![LearnerSpec::new(
                "dt",
                LearnerKind::DecisionTree { max_depth: Some(3) },
            )],
            meta_learner: LearnerSpec::new("rf", LearnerKind::RandomForest { n_estimators: 10 }),
            n_folds: 4,
            seed: 42,
            passthrough: false,
        };
        StackingTrainer::new(config).fit(&dataset).unwrap()
    }

    #[test]
    fn test_summary_names_learners() {
        let model = fitted_model();
        let rows = vec![
            MetricsRow {
                learner: "stacking_ensemble".to_string(),
                accuracy: 0.95,
                f1: 0.94,
            },
            MetricsRow {
                learner: "dt".to_string(),
                accuracy: 0.90,
                f1: 0.89,
            },
        ];

        let summary = render_summary(&model, &rows);
        assert!(summary.contains("decision_tree"));
        assert!(summary.contains("random_forest"));
        assert!(summary.contains("stacking_ensemble"));
        assert!(summary.contains("0.9500"));
    }

    #[test]
    fn test_csv_round_trip() {
        let rows = vec![
            MetricsRow {
                learner: "stacking_ensemble".to_string(),
                accuracy: 0.9,
                f1: 0.8,
            },
            MetricsRow {
                learner: "svc".to_string(),
                accuracy: 0.7,
                f1: 0.6,
            },
        ];

        let dir = std::env::temp_dir().join("stackwise_report_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("comparison_table.csv");
        write_comparison_csv(&rows, &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let restored: Vec<MetricsRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(restored, rows);
        // Ensemble row stays first
        assert_eq!(restored[0].learner, "stacking_ensemble");
    }
}
