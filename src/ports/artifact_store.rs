//! Artifact store port: Trait for persisting the trained model pair.
//!
//! A model and its feature order are only meaningful together; stores save
//! and load them as one bundle.

use serde::{Deserialize, Serialize};

use crate::domain::survey::CategoryThresholds;
use crate::domain::FeatureColumnOrder;

use super::Classifier;

/// Training facts recorded next to the artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    /// Outcome class names, index = encoded label
    pub classes: Vec<String>,

    /// Scaler statistics used to derive the energy/oxygen categories
    pub thresholds: CategoryThresholds,

    /// Selected hyperparameters, human-readable
    pub hyperparameters: String,

    /// Mean cross-validated accuracy of the selected configuration
    pub cv_accuracy: f64,

    /// Accuracy on the held-out test split
    pub test_accuracy: f64,
}

/// A fitted model with the feature order it was trained on.
#[derive(Debug, Clone)]
pub struct ArtifactBundle<M> {
    pub model: M,
    pub feature_order: FeatureColumnOrder,
    pub metadata: TrainingMetadata,
}

/// Trait for artifact persistence.
pub trait ArtifactStore: Send + Sync {
    /// Model type persisted by this store.
    type Model: Classifier;

    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a bundle, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if serialization or writing fails.
    fn save(&self, bundle: &ArtifactBundle<Self::Model>) -> Result<(), Self::Error>;

    /// Load and verify a bundle.
    ///
    /// # Errors
    /// Returns error if files are missing, corrupted, or do not belong together.
    fn load(&self) -> Result<ArtifactBundle<Self::Model>, Self::Error>;

    /// Whether a bundle appears to be present.
    fn exists(&self) -> bool;
}
