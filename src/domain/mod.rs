//! Domain layer: Core screening types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! Feature encoding lives here so training and inference share one code path.

pub mod features;
mod respondent;
mod screening;
pub mod survey;

pub use features::{FeatureColumnOrder, FeatureTransformer, FeatureVector, SchemaMismatch};
pub use respondent::{Answer, Indicator, InputValidationError, QuestionnaireAnswers, MAX_AGE, MIN_AGE};
pub use screening::{Screening, Verdict};
pub use survey::{DataError, EncodedDataset, SurveyTable};
