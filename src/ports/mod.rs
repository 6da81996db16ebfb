//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (model family, artifact
//! persistence).

mod artifact_store;
mod classifier;

pub use artifact_store::{ArtifactBundle, ArtifactStore, TrainingMetadata};
pub use classifier::{argmax, Classifier};
