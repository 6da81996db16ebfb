//! Random forest adapter: Implementation of Classifier.
//!
//! Bootstrap-aggregated CART trees with sqrt feature subsampling at every
//! split. Per-tree seeds are drawn up front from one seeded ChaCha stream, so
//! fitting the trees in parallel gives the same forest regardless of how rayon
//! schedules them.

mod tree;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ports::Classifier;

use tree::{DecisionTree, TreeLimits};

/// Random forest fitting failures.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("row {row} has {found} features, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{rows} rows but {labels} labels")]
    LabelCount { rows: usize, labels: usize },

    #[error("invalid forest parameters: {0}")]
    InvalidParams(String),

    #[error("corrupted model: {0}")]
    Corrupted(String),
}

/// Hyperparameters of one forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl ForestParams {
    fn validate(&self) -> Result<(), ForestError> {
        if self.n_estimators == 0 {
            return Err(ForestError::InvalidParams("n_estimators must be >= 1".into()));
        }
        if self.max_depth == Some(0) {
            return Err(ForestError::InvalidParams("max_depth must be >= 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(ForestError::InvalidParams("min_samples_split must be >= 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(ForestError::InvalidParams("min_samples_leaf must be >= 1".into()));
        }
        Ok(())
    }
}

impl std::fmt::Display for ForestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        write!(
            f,
            "n_estimators={}, max_depth={}, min_samples_split={}, min_samples_leaf={}",
            self.n_estimators, depth, self.min_samples_split, self.min_samples_leaf
        )
    }
}

/// A fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    feature_names: Vec<String>,
    n_classes: usize,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on a dense feature matrix.
    ///
    /// `labels` must be encoded as `0..n_classes`; at least two classes are
    /// always allocated so probability vectors are binary even for a
    /// degenerate single-class fold.
    ///
    /// # Errors
    /// Returns `ForestError` on empty input, ragged rows, or invalid params.
    pub fn fit(
        params: ForestParams,
        feature_names: &[String],
        rows: &[Vec<f64>],
        labels: &[usize],
    ) -> Result<Self, ForestError> {
        params.validate()?;
        if rows.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ForestError::LabelCount {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let n_features = feature_names.len();
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_features) {
            return Err(ForestError::DimensionMismatch {
                row,
                expected: n_features,
                found: r.len(),
            });
        }

        let n_classes = labels.iter().max().map_or(2, |&m| (m + 1).max(2));
        let n_samples = rows.len();
        let limits = TreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: ((n_features as f64).sqrt() as usize).max(1),
        };

        let mut master = ChaCha8Rng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.n_estimators).map(|_| master.gen()).collect();

        let fitted: Vec<(DecisionTree, Vec<f64>)> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let bootstrap: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::fit(rows, labels, bootstrap, n_classes, &limits, &mut rng)
            })
            .collect();

        let importances = Self::aggregate_importances(n_features, fitted.iter().map(|(_, imp)| imp));
        let trees = fitted.into_iter().map(|(tree, _)| tree).collect();

        tracing::debug!("Fitted random forest ({})", params);

        Ok(Self {
            params,
            feature_names: feature_names.to_vec(),
            n_classes,
            trees,
            importances,
        })
    }

    /// Per-tree normalized impurity decrease, averaged over trees that split
    /// at least once, then renormalized to sum to 1.
    fn aggregate_importances<'a>(n_features: usize, per_tree: impl Iterator<Item = &'a Vec<f64>>) -> Vec<f64> {
        let mut sum = vec![0.0; n_features];
        let mut contributing = 0usize;
        for importances in per_tree {
            let total: f64 = importances.iter().sum();
            if total <= 0.0 {
                continue;
            }
            contributing += 1;
            for (acc, v) in sum.iter_mut().zip(importances) {
                *acc += v / total;
            }
        }
        if contributing == 0 {
            return sum;
        }

        let total: f64 = sum.iter().sum();
        sum.iter().map(|v| v / total).collect()
    }

    #[must_use]
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Total node count across all trees.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(DecisionTree::node_count).sum()
    }

    /// Deepest tree in the ensemble.
    #[must_use]
    pub fn max_tree_depth(&self) -> usize {
        self.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    }

    /// Structural check for a deserialized forest.
    ///
    /// # Errors
    /// Returns `ForestError::Corrupted` describing the first inconsistency.
    pub fn validate(&self) -> Result<(), ForestError> {
        let n_features = self.feature_names.len();
        if n_features == 0 {
            return Err(ForestError::Corrupted("no feature names".into()));
        }
        if self.trees.is_empty() {
            return Err(ForestError::Corrupted("no trees".into()));
        }
        if self.n_classes < 2 {
            return Err(ForestError::Corrupted(format!("{} classes", self.n_classes)));
        }
        if self.importances.len() != n_features {
            return Err(ForestError::Corrupted(format!(
                "{} importances for {} features",
                self.importances.len(),
                n_features
            )));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(n_features, self.n_classes)
                .map_err(|e| ForestError::Corrupted(format!("tree {i}: {e}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("F{i}")).collect()
    }

    /// Label follows feature 0; feature 1 is noise.
    fn separable(n: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
        let rows = (0..n)
            .map(|i| vec![(i % 2) as f64, ((i * 7) % 5) as f64])
            .collect();
        let labels = (0..n).map(|i| i % 2).collect();
        (rows, labels)
    }

    fn small_params(seed: u64) -> ForestParams {
        ForestParams {
            n_estimators: 15,
            seed,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_learns_separable_signal() {
        let (rows, labels) = separable(40);
        let forest = RandomForest::fit(small_params(42), &names(2), &rows, &labels).expect("fit");

        assert_eq!(forest.predict(&[1.0, 3.0]), 1);
        assert_eq!(forest.predict(&[0.0, 3.0]), 0);

        let proba = forest.predict_proba(&[1.0, 0.0]);
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (rows, labels) = separable(30);
        let a = RandomForest::fit(small_params(7), &names(2), &rows, &labels).expect("fit");
        let b = RandomForest::fit(small_params(7), &names(2), &rows, &labels).expect("fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_importances_normalized_and_ranked() {
        let (rows, labels) = separable(40);
        let forest = RandomForest::fit(small_params(3), &names(2), &rows, &labels).expect("fit");
        let importances = forest.feature_importances();

        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            RandomForest::fit(ForestParams::default(), &names(2), &[], &[]),
            Err(ForestError::EmptyTrainingSet)
        ));
        assert!(matches!(
            RandomForest::fit(ForestParams::default(), &names(2), &[vec![1.0]], &[0]),
            Err(ForestError::DimensionMismatch { row: 0, .. })
        ));
        let params = ForestParams {
            min_samples_split: 1,
            ..ForestParams::default()
        };
        assert!(matches!(
            RandomForest::fit(params, &names(1), &[vec![1.0]], &[0]),
            Err(ForestError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_serde_roundtrip_preserves_predictions() {
        let (rows, labels) = separable(20);
        let forest = RandomForest::fit(small_params(1), &names(2), &rows, &labels).expect("fit");
        let json = serde_json::to_string(&forest).expect("serialize");
        let loaded: RandomForest = serde_json::from_str(&json).expect("deserialize");

        assert!(loaded.validate().is_ok());
        for row in &rows {
            assert_eq!(loaded.predict_proba(row), forest.predict_proba(row));
        }
    }

    #[test]
    fn test_params_display() {
        let params = ForestParams {
            n_estimators: 200,
            max_depth: Some(6),
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 0,
        };
        assert_eq!(
            params.to_string(),
            "n_estimators=200, max_depth=6, min_samples_split=5, min_samples_leaf=2"
        );
    }
}
