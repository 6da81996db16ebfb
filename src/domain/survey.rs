//! Labeled survey data used for training.
//!
//! Turns a raw table (header + string cells) into an encoded dataset:
//! duplicate and incomplete rows are dropped, the outcome is label-encoded,
//! and the two continuous measurements are min-max scaled into [0, 0.1] and
//! thresholded at 0.05 to produce the derived indicators.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::features::{FeatureColumnOrder, FeatureTransformer, SchemaMismatch, AGE_COLUMN};
use super::respondent::{Answer, Indicator};

/// Outcome column name.
pub const LABEL_COLUMN: &str = "PULMONARY_DISEASE";

/// Continuous energy level measurement column.
pub const ENERGY_LEVEL_COLUMN: &str = "ENERGY_LEVEL";

/// Continuous oxygen saturation measurement column.
pub const OXYGEN_SATURATION_COLUMN: &str = "OXYGEN_SATURATION";

/// Upper bound of the min-max scaling range for continuous measurements.
pub const SCALED_RANGE_MAX: f64 = 0.1;

/// Scaled values strictly above this threshold map to "present".
pub const CATEGORY_THRESHOLD: f64 = 0.05;

/// Tokens treated as missing values.
const MISSING_TOKENS: [&str; 5] = ["", "na", "nan", "null", "none"];

/// Training data failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("dataset is empty after cleaning")]
    Empty,

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("row {row}: expected {expected} cells, found {found}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {column}: cannot parse {value:?}")]
    Malformed {
        row: usize,
        column: String,
        value: String,
    },

    #[error("outcome must have exactly two classes, found {0:?}")]
    ClassCount(Vec<String>),

    #[error("class {class:?} has {count} samples, too few to stratify")]
    ClassTooSmall { class: String, count: usize },

    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaMismatch),
}

/// A raw table as read from disk: header names and string cells.
#[derive(Debug, Clone, Default)]
pub struct SurveyTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One parsed, complete training row.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyRecord {
    pub age: f64,
    /// Directly supplied indicators (the two derived ones are absent)
    pub indicators: BTreeMap<Indicator, Answer>,
    pub energy_level: f64,
    pub oxygen_saturation: f64,
    pub label: String,
}

/// Result of the cleaning step.
#[derive(Debug, Clone)]
pub struct CleanedSurvey {
    pub records: Vec<SurveyRecord>,
    /// Feature order implied by the table header
    pub feature_order: FeatureColumnOrder,
    pub duplicates_dropped: usize,
    pub incomplete_dropped: usize,
}

fn is_missing(cell: &str) -> bool {
    let lowered = cell.trim().to_ascii_lowercase();
    MISSING_TOKENS.contains(&lowered.as_str())
}

/// Cell identity for duplicate detection: numbers compare by value, so `0`
/// and `0.0` are the same cell, and every missing marker is one value.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Missing,
    Number(u64),
    Text(&'a str),
}

impl<'a> CellKey<'a> {
    fn of(cell: &'a str) -> Self {
        let cell = cell.trim();
        if is_missing(cell) {
            return Self::Missing;
        }
        match cell.parse::<f64>() {
            // -0.0 and 0.0 share a key
            Ok(v) if v.is_finite() => Self::Number((v + 0.0).to_bits()),
            _ => Self::Text(cell),
        }
    }
}

/// Positions of each known column in the header.
struct ColumnMap {
    age: usize,
    energy: usize,
    oxygen: usize,
    label: usize,
    indicators: Vec<(Indicator, usize)>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Result<(Self, FeatureColumnOrder), DataError> {
        let mut positions: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, header) in headers.iter().enumerate() {
            let name = header.trim();
            if positions.insert(name, i).is_some() {
                return Err(DataError::DuplicateColumn(name.to_string()));
            }
            let known = name == AGE_COLUMN
                || name == ENERGY_LEVEL_COLUMN
                || name == OXYGEN_SATURATION_COLUMN
                || name == LABEL_COLUMN
                || Indicator::from_name(name).is_some_and(|ind| !ind.is_derived());
            if !known {
                return Err(DataError::UnknownColumn(name.to_string()));
            }
        }

        let require = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| DataError::MissingColumn(name.to_string()))
        };

        let age = require(AGE_COLUMN)?;
        let energy = require(ENERGY_LEVEL_COLUMN)?;
        let oxygen = require(OXYGEN_SATURATION_COLUMN)?;
        let label = require(LABEL_COLUMN)?;

        let mut indicators = Vec::new();
        for indicator in Indicator::ALL.iter().filter(|i| !i.is_derived()) {
            indicators.push((*indicator, require(indicator.name())?));
        }

        // Header order minus the label and continuous columns, then the
        // derived categories appended last.
        let mut columns: Vec<String> = headers
            .iter()
            .map(|h| h.trim())
            .filter(|h| ![LABEL_COLUMN, ENERGY_LEVEL_COLUMN, OXYGEN_SATURATION_COLUMN].contains(h))
            .map(str::to_string)
            .collect();
        columns.push(Indicator::EnergyLevelKategori.name().to_string());
        columns.push(Indicator::OxygenSaturationKategori.name().to_string());
        let order = FeatureColumnOrder::new(columns)?;

        Ok((
            Self {
                age,
                energy,
                oxygen,
                label,
                indicators,
            },
            order,
        ))
    }

    fn parse_row(&self, row_no: usize, headers: &[String], row: &[String]) -> Result<SurveyRecord, DataError> {
        let number = |idx: usize| -> Result<f64, DataError> {
            let cell = row[idx].trim();
            cell.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DataError::Malformed {
                    row: row_no,
                    column: headers[idx].trim().to_string(),
                    value: cell.to_string(),
                })
        };

        let mut indicators = BTreeMap::new();
        for &(indicator, idx) in &self.indicators {
            let answer = Answer::from_token(&row[idx]).ok_or_else(|| DataError::Malformed {
                row: row_no,
                column: indicator.name().to_string(),
                value: row[idx].trim().to_string(),
            })?;
            indicators.insert(indicator, answer);
        }

        Ok(SurveyRecord {
            age: number(self.age)?,
            indicators,
            energy_level: number(self.energy)?,
            oxygen_saturation: number(self.oxygen)?,
            label: row[self.label].trim().to_string(),
        })
    }
}

/// Drop exact duplicates (first kept), then rows with any missing cell, and
/// parse what remains.
///
/// # Errors
/// Returns `DataError` on schema problems, unparseable cells, or when no rows
/// survive cleaning.
pub fn clean(table: &SurveyTable) -> Result<CleanedSurvey, DataError> {
    let (columns, feature_order) = ColumnMap::from_headers(&table.headers)?;
    let width = table.headers.len();

    let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(table.rows.len());
    let mut duplicates_dropped = 0;
    let mut incomplete_dropped = 0;
    let mut records = Vec::with_capacity(table.rows.len());

    for (i, row) in table.rows.iter().enumerate() {
        // 1-based data rows, header excluded.
        let row_no = i + 1;
        if row.len() != width {
            return Err(DataError::RowWidth {
                row: row_no,
                expected: width,
                found: row.len(),
            });
        }

        let key: Vec<CellKey> = row.iter().map(|c| CellKey::of(c)).collect();
        if !seen.insert(key) {
            duplicates_dropped += 1;
            continue;
        }

        if row.iter().any(|c| is_missing(c)) {
            incomplete_dropped += 1;
            continue;
        }

        records.push(columns.parse_row(row_no, &table.headers, row)?);
    }

    if records.is_empty() {
        return Err(DataError::Empty);
    }

    tracing::debug!(
        "Cleaned survey: kept={}, duplicates={}, incomplete={}",
        records.len(),
        duplicates_dropped,
        incomplete_dropped
    );

    Ok(CleanedSurvey {
        records,
        feature_order,
        duplicates_dropped,
        incomplete_dropped,
    })
}

/// Deterministic outcome encoding: sorted class names map to 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the outcome values of the cleaned records.
    ///
    /// # Errors
    /// Returns `DataError::ClassCount` unless exactly two classes are present.
    pub fn fit(records: &[SurveyRecord]) -> Result<Self, DataError> {
        let classes: Vec<String> = records
            .iter()
            .map(|r| r.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if classes.len() != 2 {
            return Err(DataError::ClassCount(classes));
        }
        Ok(Self { classes })
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }
}

/// Observed range of one continuous column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleStats {
    pub min: f64,
    pub max: f64,
}

impl ScaleStats {
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        Self { min, max }
    }

    /// Min-max scale into [0, `SCALED_RANGE_MAX`]. A constant column maps to 0.
    #[must_use]
    pub fn scale(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return 0.0;
        }
        (value - self.min) / range * SCALED_RANGE_MAX
    }

    /// Scale, then threshold into a binary category.
    #[must_use]
    pub fn categorize(&self, value: f64) -> Answer {
        Answer::from(self.scale(value) > CATEGORY_THRESHOLD)
    }
}

/// Fitted scalers for the two continuous measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryThresholds {
    pub energy_level: ScaleStats,
    pub oxygen_saturation: ScaleStats,
}

impl CategoryThresholds {
    /// Fit over the full cleaned dataset.
    #[must_use]
    pub fn fit(records: &[SurveyRecord]) -> Self {
        Self {
            energy_level: ScaleStats::fit(records.iter().map(|r| r.energy_level)),
            oxygen_saturation: ScaleStats::fit(records.iter().map(|r| r.oxygen_saturation)),
        }
    }

    /// Derived indicator answers for one record.
    #[must_use]
    pub fn derive(&self, record: &SurveyRecord) -> [(Indicator, Answer); 2] {
        [
            (
                Indicator::EnergyLevelKategori,
                self.energy_level.categorize(record.energy_level),
            ),
            (
                Indicator::OxygenSaturationKategori,
                self.oxygen_saturation.categorize(record.oxygen_saturation),
            ),
        ]
    }
}

/// Fully encoded training matrix.
#[derive(Debug, Clone)]
pub struct EncodedDataset {
    pub feature_order: FeatureColumnOrder,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    pub encoder: LabelEncoder,
    pub thresholds: CategoryThresholds,
}

impl EncodedDataset {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sample count per encoded class.
    #[must_use]
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Label-encode, derive categories, and reindex every cleaned record.
///
/// # Errors
/// Returns `DataError` if the outcome is not binary or a row cannot be
/// reindexed into the feature order.
pub fn encode(cleaned: &CleanedSurvey) -> Result<EncodedDataset, DataError> {
    let encoder = LabelEncoder::fit(&cleaned.records)?;
    let thresholds = CategoryThresholds::fit(&cleaned.records);
    let transformer = FeatureTransformer::new(&cleaned.feature_order);

    let mut rows = Vec::with_capacity(cleaned.records.len());
    let mut labels = Vec::with_capacity(cleaned.records.len());
    for record in &cleaned.records {
        let answers = record
            .indicators
            .iter()
            .map(|(&i, &a)| (i, a))
            .chain(thresholds.derive(record));
        rows.push(transformer.encode(record.age, answers)?.into_values());
        // Fitted on these same records, so every label is known.
        labels.push(encoder.encode(&record.label).unwrap_or_default());
    }

    Ok(EncodedDataset {
        feature_order: cleaned.feature_order.clone(),
        rows,
        labels,
        encoder,
        thresholds,
    })
}
