//! # Pulmoscreen
#![allow(non_snake_case)]
//!
//! Lung cancer risk screening from a short health questionnaire.
//!
//! This crate provides:
//! - A training pipeline that fits a random forest on a labeled survey
//! - Verified persistence of the model together with its feature order
//! - A prediction service that turns one respondent's answers into a verdict
//! - Terminal UI questionnaire for local use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (answers, feature encoding, survey cleaning, verdicts)
//! - `ports`: Trait definitions for the classifier and artifact storage
//! - `adapters`: Concrete implementations (random forest, JSON artifacts, CSV)
//! - `application`: Training and prediction use cases
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{Answer, Indicator, QuestionnaireAnswers, Screening, Verdict};

/// Result type for Pulmoscreen operations
pub type Result<T> = std::result::Result<T, ScreeningError>;

/// Main error type for Pulmoscreen
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("Unusable training data: {0}")]
    Data(#[from] domain::DataError),

    #[error("Schema mismatch: {0}")]
    Schema(#[from] domain::SchemaMismatch),

    #[error("Invalid answers: {0}")]
    Validation(#[from] domain::InputValidationError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Model error: {0}")]
    Model(#[from] adapters::ForestError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
