//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the two use cases of the application: building a screening model from a
//! labeled survey, and screening one respondent with it.

pub mod metrics;
pub mod model_selection;
mod prediction;
mod training;

pub use model_selection::{GridSearch, HyperparameterGrid, SearchResult};
pub use prediction::{PredictionService, ScreeningContext};
pub use training::{Trainer, TrainingConfig, TrainingOutcome, TrainingReport, CV_FOLDS_ENV, SEED_ENV, TEST_FRACTION_ENV};
