//! Feature encoding shared by training and inference.
//!
//! Every feature vector handed to a classifier is produced by
//! [`FeatureColumnOrder::reindex`], which refuses mappings whose keys do not
//! match the persisted column order exactly. Positional trust is never used.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::respondent::{Answer, Indicator, QuestionnaireAnswers};

/// Column name for respondent age.
pub const AGE_COLUMN: &str = "AGE";

/// Disagreement between feature keys and a persisted column order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("feature columns disagree with trained order (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    Columns {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("model was fitted on [{}] but feature order is [{}]", .model.join(", "), .order.join(", "))]
    ModelColumns {
        model: Vec<String>,
        order: Vec<String>,
    },

    #[error("schema hash {actual} does not match manifest {expected}")]
    SchemaHash { expected: String, actual: String },

    #[error("duplicate feature column: {0}")]
    DuplicateColumn(String),

    #[error("feature order is empty")]
    Empty,
}

/// Ordered feature names fixed at training time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureColumnOrder {
    columns: Vec<String>,
}

impl FeatureColumnOrder {
    /// Create an order from column names.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the list is empty or contains duplicates.
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaMismatch> {
        if columns.is_empty() {
            return Err(SchemaMismatch::Empty);
        }
        let mut seen = std::collections::HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaMismatch::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// The questionnaire layout: `AGE` followed by every indicator.
    #[must_use]
    pub fn questionnaire() -> Self {
        let columns = std::iter::once(AGE_COLUMN.to_string())
            .chain(Indicator::ALL.iter().map(|i| i.name().to_string()))
            .collect();
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// SHA-256 over the newline-joined column names (hex).
    #[must_use]
    pub fn schema_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update(b"\n");
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Reorder a named feature mapping into this column order.
    ///
    /// # Errors
    /// Returns `SchemaMismatch::Columns` if any required column is missing or
    /// any extra column is present.
    pub fn reindex(&self, values: &BTreeMap<String, f64>) -> Result<FeatureVector, SchemaMismatch> {
        let missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !values.contains_key(c.as_str()))
            .cloned()
            .collect();
        let unexpected: Vec<String> = values
            .keys()
            .filter(|k| !self.columns.contains(*k))
            .cloned()
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(SchemaMismatch::Columns {
                missing,
                unexpected,
            });
        }

        let values = self.columns.iter().map(|c| values[c.as_str()]).collect();
        Ok(FeatureVector {
            columns: self.columns.clone(),
            values,
        })
    }

    /// Check that a model's fitted feature names match this order exactly.
    ///
    /// # Errors
    /// Returns `SchemaMismatch::ModelColumns` on any difference, including order.
    pub fn ensure_matches(&self, model_columns: &[String]) -> Result<(), SchemaMismatch> {
        if self.columns.as_slice() == model_columns {
            Ok(())
        } else {
            Err(SchemaMismatch::ModelColumns {
                model: model_columns.to_vec(),
                order: self.columns.clone(),
            })
        }
    }
}

impl TryFrom<Vec<String>> for FeatureColumnOrder {
    type Error = SchemaMismatch;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureColumnOrder> for Vec<String> {
    fn from(order: FeatureColumnOrder) -> Self {
        order.columns
    }
}

/// A reindexed, model-ready feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// Converts respondent data into feature vectors for a fixed column order.
///
/// Both the training path (survey rows with derived categories) and the
/// inference path (questionnaire answers) go through [`Self::encode`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureTransformer<'a> {
    order: &'a FeatureColumnOrder,
}

impl<'a> FeatureTransformer<'a> {
    #[must_use]
    pub fn new(order: &'a FeatureColumnOrder) -> Self {
        Self { order }
    }

    /// Encode age plus indicator answers and reindex against the order.
    ///
    /// No defaults are filled: an indicator absent from `answers` surfaces
    /// as a missing column.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the encoded keys disagree with the order.
    pub fn encode<I>(&self, age: f64, answers: I) -> Result<FeatureVector, SchemaMismatch>
    where
        I: IntoIterator<Item = (Indicator, Answer)>,
    {
        let mut values = BTreeMap::new();
        values.insert(AGE_COLUMN.to_string(), age);
        for (indicator, answer) in answers {
            values.insert(indicator.name().to_string(), answer.encode());
        }
        self.order.reindex(&values)
    }

    /// Inference path: encode a questionnaire answer set.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the answers do not cover the order exactly.
    pub fn from_answers(&self, answers: &QuestionnaireAnswers) -> Result<FeatureVector, SchemaMismatch> {
        self.encode(
            f64::from(answers.age),
            answers.answers.iter().map(|(&i, &a)| (i, a)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questionnaire_order_layout() {
        let order = FeatureColumnOrder::questionnaire();
        assert_eq!(order.len(), 17);
        assert_eq!(order.columns()[0], "AGE");
        assert_eq!(order.columns()[16], "OXYGEN_SATURATION_KATEGORI");
    }

    #[test]
    fn test_transformer_output_follows_order() {
        // Deliberately non-alphabetical order.
        let mut columns: Vec<String> = Indicator::ALL.iter().rev().map(|i| i.name().to_string()).collect();
        columns.insert(3, AGE_COLUMN.to_string());
        let order = FeatureColumnOrder::new(columns.clone()).expect("valid order");

        let answers = QuestionnaireAnswers::uniform(42, Answer::No).with(Indicator::Smoking, Answer::Yes);
        let vector = FeatureTransformer::new(&order)
            .from_answers(&answers)
            .expect("should encode");

        assert_eq!(vector.columns(), columns.as_slice());
        assert_eq!(vector.values()[3], 42.0);
        let at = |name: &str| columns.iter().position(|c| c == name).expect("column present");
        assert_eq!(vector.values()[at("SMOKING")], 1.0);
        assert_eq!(vector.values()[at("GENDER")], 0.0);
    }

    #[test]
    fn test_missing_indicator_is_schema_mismatch() {
        let order = FeatureColumnOrder::questionnaire();
        let answers = QuestionnaireAnswers::new(50).with(Indicator::Gender, Answer::Yes);

        match FeatureTransformer::new(&order).from_answers(&answers) {
            Err(SchemaMismatch::Columns { missing, unexpected }) => {
                assert_eq!(missing.len(), 15);
                assert!(unexpected.is_empty());
            }
            other => panic!("expected Columns mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_renamed_column_reports_both_sides() {
        let base = FeatureColumnOrder::questionnaire();
        let original = &base.columns()[5];
        let mut columns = base.columns().to_vec();
        columns[5] = "SMOKING_HABIT".to_string();
        let order = FeatureColumnOrder::new(columns).expect("valid order");

        let err = FeatureTransformer::new(&order)
            .from_answers(&QuestionnaireAnswers::uniform(50, Answer::No))
            .expect_err("should reject");

        assert_eq!(
            err,
            SchemaMismatch::Columns {
                missing: vec!["SMOKING_HABIT".to_string()],
                unexpected: vec![original.clone()],
            }
        );
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let result = FeatureColumnOrder::new(vec!["AGE".into(), "AGE".into()]);
        assert_eq!(result, Err(SchemaMismatch::DuplicateColumn("AGE".into())));
    }

    #[test]
    fn test_schema_hash_depends_on_order() {
        let a = FeatureColumnOrder::new(vec!["AGE".into(), "SMOKING".into()]).expect("valid");
        let b = FeatureColumnOrder::new(vec!["SMOKING".into(), "AGE".into()]).expect("valid");
        assert_ne!(a.schema_hash(), b.schema_hash());
        assert_eq!(a.schema_hash(), a.clone().schema_hash());
        assert_eq!(a.schema_hash().len(), 64);
    }

    #[test]
    fn test_ensure_matches_rejects_reordering() {
        let order = FeatureColumnOrder::new(vec!["AGE".into(), "SMOKING".into()]).expect("valid");
        assert!(order.ensure_matches(&["AGE".into(), "SMOKING".into()]).is_ok());
        assert!(matches!(
            order.ensure_matches(&["SMOKING".into(), "AGE".into()]),
            Err(SchemaMismatch::ModelColumns { .. })
        ));
    }

    #[test]
    fn test_order_serde_rejects_duplicates() {
        let json = r#"["AGE","AGE"]"#;
        assert!(serde_json::from_str::<FeatureColumnOrder>(json).is_err());

        let json = r#"["AGE","SMOKING"]"#;
        let order: FeatureColumnOrder = serde_json::from_str(json).expect("valid order");
        assert_eq!(order.columns(), &["AGE".to_string(), "SMOKING".to_string()]);
    }
}
