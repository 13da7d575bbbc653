//! Stacked ensemble training orchestration

use super::model::{assemble_meta_features, StackedModel};
use super::oof::{build_oof_matrix, refit_on_full};
use crate::config::StackingConfig;
use crate::cross_validation::StratifiedKFold;
use crate::data::Dataset;
use crate::error::{Result, StackError};
use crate::learners::{Learner, Trainable};
use tracing::info;

/// Drives the full training path: configuration validation, stratified fold
/// generation, out-of-fold meta-feature construction, meta-learner fitting,
/// and full-set refit of the base learners.
#[derive(Debug, Clone)]
pub struct StackingTrainer {
    config: StackingConfig,
}

impl StackingTrainer {
    pub fn new(config: StackingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StackingConfig {
        &self.config
    }

    /// Fit the stacked ensemble on a training dataset.
    ///
    /// Configuration problems surface before fold generation, and fold
    /// generation problems surface before any learner is fitted. On any
    /// failure no partial model is returned.
    pub fn fit(&self, dataset: &Dataset) -> Result<StackedModel> {
        self.config.validate()?;

        // Instantiating every learner up front catches bad specs before
        // any cross-validation work starts.
        for spec in &self.config.base_learners {
            Learner::from_spec(spec, self.config.seed)?;
        }
        Learner::from_spec(&self.config.meta_learner, self.config.seed)?;

        let x = dataset.features();
        let y = dataset.labels();

        info!(
            n_samples = dataset.n_samples(),
            n_features = dataset.n_features(),
            n_base_learners = self.config.base_learners.len(),
            n_folds = self.config.n_folds,
            passthrough = self.config.passthrough,
            "starting stacked ensemble training"
        );

        let folds = StratifiedKFold::new(self.config.n_folds, self.config.seed).split(y)?;

        let oof = build_oof_matrix(x, y, &self.config.base_learners, &folds, self.config.seed)?;
        info!(
            rows = oof.nrows(),
            columns = oof.ncols(),
            "out-of-fold matrix assembled"
        );

        let meta_x = assemble_meta_features(&oof, x, self.config.passthrough);

        let mut meta_learner = Learner::from_spec(&self.config.meta_learner, self.config.seed)?;
        meta_learner
            .fit(&meta_x, y)
            .map_err(|e| StackError::model(&self.config.meta_learner.name, None, e.to_string()))?;
        info!(
            meta = %self.config.meta_learner.name,
            meta_features = meta_x.ncols(),
            "meta-learner fitted"
        );

        let base_learners = refit_on_full(x, y, &self.config.base_learners, self.config.seed)?;
        info!(
            learners = base_learners.len(),
            "base learners refit on the full training set"
        );

        Ok(StackedModel::new(
            base_learners,
            meta_learner,
            self.config.passthrough,
            dataset.n_features(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LearnerKind, LearnerSpec};
    use ndarray::{Array, Array1, Array2};
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn synthetic_dataset(n: usize, seed: u64) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows = Vec::with_capacity(n * 2);
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let label = (i % 2) as f64;
            let center = label * 2.0;
            rows.push(center + rng.gen_range(-0.7..0.7));
            rows.push(center + rng.gen_range(-0.7..0.7));
            labels.push(label);
        }
        let x: Array2<f64> = Array::from_shape_vec((n, 2), rows).unwrap();
        Dataset::new(
            x,
            vec!["f0".to_string(), "f1".to_string()],
            Array1::from_vec(labels),
        )
        .unwrap()
    }

    fn config() -> StackingConfig {
        StackingConfig {
            base_learners: vec![
                LearnerSpec::new("dt", LearnerKind::DecisionTree { max_depth: Some(4) }),
                LearnerSpec::new("lr", LearnerKind::LogisticRegression { c: 1.0 }),
            ],
            meta_learner: LearnerSpec::new("rf", LearnerKind::RandomForest { n_estimators: 20 }),
            n_folds: 4,
            seed: 42,
            passthrough: false,
        }
    }

    #[test]
    fn test_fit_produces_usable_model() {
        let dataset = synthetic_dataset(60, 1);
        let model = StackingTrainer::new(config()).fit(&dataset).unwrap();

        assert_eq!(model.base_learner_names(), vec!["dt", "lr"]);

        let predictions = model.predict(dataset.features()).unwrap();
        assert_eq!(predictions.len(), 60);
        assert!(predictions.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_fit_deterministic_for_fixed_seed() {
        let dataset = synthetic_dataset(60, 2);
        let a = StackingTrainer::new(config()).fit(&dataset).unwrap();
        let b = StackingTrainer::new(config()).fit(&dataset).unwrap();

        let pa = a.predict_proba(dataset.features()).unwrap();
        let pb = b.predict_proba(dataset.features()).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_passthrough_changes_meta_input() {
        let dataset = synthetic_dataset(60, 3);

        let mut with = config();
        with.passthrough = true;
        let model = StackingTrainer::new(with).fit(&dataset).unwrap();
        assert!(model.passthrough());

        let proba = model.predict_proba(dataset.features()).unwrap();
        assert_eq!(proba.len(), 60);
    }

    #[test]
    fn test_rare_class_fails_before_fit() {
        // 3 positives with 4 folds: stratification impossible
        let x: Array2<f64> = Array::zeros((23, 2));
        let mut labels = vec![0.0; 20];
        labels.extend([1.0, 1.0, 1.0]);
        let dataset = Dataset::new(
            x,
            vec!["f0".to_string(), "f1".to_string()],
            Array1::from_vec(labels),
        )
        .unwrap();

        let err = StackingTrainer::new(config()).fit(&dataset).unwrap_err();
        assert!(matches!(err, StackError::Data(_)));
    }
}
