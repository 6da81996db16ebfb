//! Training service: Runs the full model-building pipeline.
//!
//! This service coordinates:
//! - Cleaning and encoding the survey table
//! - Stratified train/test split
//! - Grid search with cross-validation
//! - Evaluation on the held-out split
//! - Importance ranking
//!
//! Evaluation is reported, never gating: a weak model is still returned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::adapters::forest::{ForestParams, RandomForest};
use crate::domain::survey::{self, CategoryThresholds};
use crate::domain::SurveyTable;
use crate::ports::{ArtifactBundle, Classifier, TrainingMetadata};
use crate::{Result, ScreeningError};

use super::metrics::{accuracy, ClassificationReport, ConfusionMatrix};
use super::model_selection::{stratified_split, GridSearch, HyperparameterGrid, TrainingSet};

pub const SEED_ENV: &str = "PULMOSCREEN_SEED";
pub const CV_FOLDS_ENV: &str = "PULMOSCREEN_CV_FOLDS";
pub const TEST_FRACTION_ENV: &str = "PULMOSCREEN_TEST_FRACTION";

/// Training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for the split, the folds, and every forest
    pub seed: u64,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub grid: HyperparameterGrid,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 5,
            grid: HyperparameterGrid::default(),
        }
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ScreeningError::Config(format!("{name}={raw:?} is not a valid value"))),
        Err(_) => Ok(None),
    }
}

impl TrainingConfig {
    /// Defaults with environment overrides applied.
    ///
    /// # Errors
    /// Returns `ScreeningError::Config` if a variable is set but unparseable,
    /// or the resulting config is invalid.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(seed) = env_override(SEED_ENV)? {
            config.seed = seed;
        }
        if let Some(folds) = env_override(CV_FOLDS_ENV)? {
            config.cv_folds = folds;
        }
        if let Some(fraction) = env_override(TEST_FRACTION_ENV)? {
            config.test_fraction = fraction;
        }
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `ScreeningError::Config` describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ScreeningError::Config(format!(
                "test fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.cv_folds < 2 {
            return Err(ScreeningError::Config(format!(
                "cv folds must be >= 2, got {}",
                self.cv_folds
            )));
        }
        if self.grid.is_empty() {
            return Err(ScreeningError::Config("hyperparameter grid is empty".into()));
        }
        Ok(())
    }
}

/// Human-readable summary of one training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows_read: usize,
    pub duplicates_dropped: usize,
    pub incomplete_dropped: usize,
    pub rows_used: usize,
    /// (class name, count) over the cleaned dataset
    pub class_counts: Vec<(String, usize)>,
    pub thresholds: CategoryThresholds,
    pub feature_order: Vec<String>,
    pub train_size: usize,
    pub test_size: usize,
    pub candidates_evaluated: usize,
    pub best_params: ForestParams,
    pub cv_accuracy: f64,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub classification: ClassificationReport,
    /// Feature importances, descending
    pub importances: Vec<(String, f64)>,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset")?;
        writeln!(
            f,
            "  rows read: {}  duplicates dropped: {}  incomplete dropped: {}  used: {}",
            self.rows_read, self.duplicates_dropped, self.incomplete_dropped, self.rows_used
        )?;
        for (class, count) in &self.class_counts {
            writeln!(f, "  {class}: {count}")?;
        }
        writeln!(
            f,
            "  ENERGY_LEVEL range [{}, {}], OXYGEN_SATURATION range [{}, {}]",
            self.thresholds.energy_level.min,
            self.thresholds.energy_level.max,
            self.thresholds.oxygen_saturation.min,
            self.thresholds.oxygen_saturation.max
        )?;
        writeln!(f, "  features ({}): {}", self.feature_order.len(), self.feature_order.join(", "))?;
        writeln!(f)?;

        writeln!(f, "Model selection")?;
        writeln!(f, "  train/test: {}/{}", self.train_size, self.test_size)?;
        writeln!(f, "  candidates evaluated: {}", self.candidates_evaluated)?;
        writeln!(f, "  best parameters: {}", self.best_params)?;
        writeln!(f, "  cv accuracy: {:.4}", self.cv_accuracy)?;
        writeln!(f)?;

        writeln!(f, "Evaluation")?;
        writeln!(f, "  train accuracy: {:.4}", self.train_accuracy)?;
        writeln!(f, "  test accuracy:  {:.4}", self.test_accuracy)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows = actual, columns = predicted)")?;
        write!(f, "{}", self.confusion)?;
        writeln!(f)?;
        writeln!(f, "Classification report")?;
        write!(f, "{}", self.classification)?;
        writeln!(f)?;

        writeln!(f, "Feature importances")?;
        for (name, importance) in &self.importances {
            writeln!(f, "  {name:<28} {importance:.4}")?;
        }
        Ok(())
    }
}

/// Result of a training run: the artifacts to persist plus the report.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle<RandomForest>,
    pub report: TrainingReport,
}

/// Service that builds a screening model from a survey table.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

fn gather(rows: &[Vec<f64>], labels: &[usize], idx: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
    (
        idx.iter().map(|&i| rows[i].clone()).collect(),
        idx.iter().map(|&i| labels[i]).collect(),
    )
}

impl Trainer {
    #[must_use]
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the full pipeline on a raw survey table.
    ///
    /// # Errors
    /// Returns `ScreeningError::Data` for unusable datasets,
    /// `ScreeningError::Config` for invalid settings, and
    /// `ScreeningError::Model` if fitting fails.
    pub fn train(&self, table: &SurveyTable) -> Result<TrainingOutcome> {
        self.config.validate()?;
        tracing::info!("Starting training pipeline (seed={})...", self.config.seed);

        tracing::debug!("Step 1: Cleaning survey table...");
        let cleaned = survey::clean(table)?;

        tracing::debug!("Step 2: Encoding labels and deriving categories...");
        let encoded = survey::encode(&cleaned)?;
        let classes = encoded.encoder.classes().to_vec();
        let feature_order = encoded.feature_order.clone();

        tracing::debug!("Step 3: Stratified split...");
        let split = stratified_split(&encoded.labels, &classes, self.config.test_fraction, self.config.seed)?;
        let (train_x, train_y) = gather(&encoded.rows, &encoded.labels, &split.train);
        let (test_x, test_y) = gather(&encoded.rows, &encoded.labels, &split.test);

        tracing::debug!("Step 4: Grid search...");
        let search = GridSearch {
            grid: self.config.grid.clone(),
            folds: self.config.cv_folds,
            seed: self.config.seed,
        }
        .run(TrainingSet {
            feature_names: feature_order.columns(),
            rows: &train_x,
            labels: &train_y,
            classes: &classes,
        })?;
        let model = search.model;

        tracing::debug!("Step 5: Evaluating...");
        let train_pred: Vec<usize> = train_x.iter().map(|x| model.predict(x)).collect();
        let test_pred: Vec<usize> = test_x.iter().map(|x| model.predict(x)).collect();
        let train_accuracy = accuracy(&train_y, &train_pred);
        let test_accuracy = accuracy(&test_y, &test_pred);
        let confusion = ConfusionMatrix::new(classes.len(), &test_y, &test_pred);
        let classification = ClassificationReport::from_confusion(&confusion, &classes);

        let mut importances: Vec<(String, f64)> = feature_order
            .columns()
            .iter()
            .cloned()
            .zip(model.feature_importances())
            .collect();
        importances.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::info!(
            "Training complete: best=({}), cv_accuracy={:.4}, test_accuracy={:.4}",
            search.best_params,
            search.best_score,
            test_accuracy
        );

        let counts = encoded.class_counts();
        let report = TrainingReport {
            rows_read: table.rows.len(),
            duplicates_dropped: cleaned.duplicates_dropped,
            incomplete_dropped: cleaned.incomplete_dropped,
            rows_used: encoded.len(),
            class_counts: classes.iter().cloned().zip(counts).collect(),
            thresholds: encoded.thresholds,
            feature_order: feature_order.columns().to_vec(),
            train_size: split.train.len(),
            test_size: split.test.len(),
            candidates_evaluated: search.candidates.len(),
            best_params: search.best_params,
            cv_accuracy: search.best_score,
            train_accuracy,
            test_accuracy,
            confusion,
            classification,
            importances,
        };

        let bundle = ArtifactBundle {
            model,
            feature_order,
            metadata: TrainingMetadata {
                classes,
                thresholds: encoded.thresholds,
                hyperparameters: search.best_params.to_string(),
                cv_accuracy: search.best_score,
                test_accuracy,
            },
        };

        Ok(TrainingOutcome { bundle, report })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::survey::tests::{row, table};
    use crate::domain::DataError;

    /// Balanced dataset where every indicator is present exactly for the
    /// positive class. Ages are unique so no row is a duplicate.
    pub(crate) fn balanced_table(n: u32) -> SurveyTable {
        table(
            (0..n)
                .map(|i| {
                    let positive = i % 2 == 0;
                    row(
                        20 + i,
                        u8::from(positive),
                        f64::from(i % 10),
                        90.0 + f64::from(i % 7),
                        if positive { "YES" } else { "NO" },
                    )
                })
                .collect(),
        )
    }

    pub(crate) fn fast_config() -> TrainingConfig {
        TrainingConfig {
            cv_folds: 3,
            grid: HyperparameterGrid {
                n_estimators: vec![7],
                max_depth: vec![Some(3), None],
                min_samples_split: vec![2],
                min_samples_leaf: vec![1],
            },
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_trains_and_reports() {
        let outcome = Trainer::new(fast_config()).train(&balanced_table(60)).expect("train");
        let report = &outcome.report;

        assert_eq!(report.rows_used, 60);
        assert_eq!(report.test_size, 12);
        assert_eq!(report.train_size, 48);
        assert_eq!(report.candidates_evaluated, 2);
        assert_eq!(report.class_counts, vec![("NO".to_string(), 30), ("YES".to_string(), 30)]);
        assert_eq!(report.test_accuracy, 1.0);
        assert_eq!(report.feature_order.len(), 17);

        // Importances sorted descending and normalized.
        assert!(report.importances.windows(2).all(|w| w[0].1 >= w[1].1));
        let total: f64 = report.importances.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);

        assert_eq!(outcome.bundle.metadata.classes, vec!["NO", "YES"]);
        assert_eq!(
            outcome.bundle.model.feature_names(),
            outcome.bundle.feature_order.columns()
        );
        assert!(report.to_string().contains("Feature importances"));
    }

    #[test]
    fn test_same_seed_reproduces_model() {
        let data = balanced_table(40);
        let a = Trainer::new(fast_config()).train(&data).expect("train");
        let b = Trainer::new(fast_config()).train(&data).expect("train");

        assert_eq!(a.bundle.feature_order, b.bundle.feature_order);
        assert_eq!(a.report.best_params, b.report.best_params);
        assert_eq!(a.bundle.model, b.bundle.model);
    }

    #[test]
    fn test_empty_dataset() {
        let result = Trainer::new(fast_config()).train(&table(vec![]));
        assert!(matches!(result, Err(ScreeningError::Data(DataError::Empty))));
    }

    #[test]
    fn test_single_class_dataset() {
        let rows = (0..10).map(|i| row(30 + i, 0, 1.0, 95.0, "NO")).collect();
        let result = Trainer::new(fast_config()).train(&table(rows));
        assert!(matches!(result, Err(ScreeningError::Data(DataError::ClassCount(_)))));
    }

    #[test]
    fn test_class_too_small_to_stratify() {
        let mut rows: Vec<Vec<String>> = (0..10).map(|i| row(30 + i, 0, 1.0, 95.0, "NO")).collect();
        rows.push(row(80, 1, 9.0, 88.0, "YES"));
        let result = Trainer::new(fast_config()).train(&table(rows));
        assert!(matches!(
            result,
            Err(ScreeningError::Data(DataError::ClassTooSmall { count: 1, .. }))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TrainingConfig {
            test_fraction: 1.5,
            ..fast_config()
        };
        assert!(matches!(
            Trainer::new(config).train(&balanced_table(20)),
            Err(ScreeningError::Config(_))
        ));
    }
}
