//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: random forest classifier (rayon-parallel tree fitting)
//! - `artifacts`: JSON artifact store with a SHA-256 manifest
//! - `survey_csv`: CSV dataset reader
//! - `sanitize`: respondent data filtering for logs

pub mod artifacts;
pub mod forest;
pub mod sanitize;
pub mod survey_csv;

pub use artifacts::{ArtifactError, JsonArtifactStore};
pub use forest::{ForestError, ForestParams, RandomForest};
