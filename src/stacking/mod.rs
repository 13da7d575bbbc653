//! Stacked ensemble construction
//!
//! Training path: stratified folds feed the out-of-fold builder, whose
//! leakage-free matrix trains the meta-learner; the resulting
//! `StackedModel` carries full-set refits of every base learner for
//! inference.

mod model;
mod oof;
mod trainer;

pub use model::{assemble_meta_features, StackedModel};
pub use oof::{build_oof_matrix, refit_on_full};
pub use trainer::StackingTrainer;
