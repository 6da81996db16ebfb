//! Model selection: stratified splitting and exhaustive grid search.
//!
//! Candidates are scored in parallel with rayon and reduced sequentially in
//! enumeration order, so the winner never depends on thread scheduling.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::adapters::forest::{ForestParams, RandomForest};
use crate::domain::DataError;
use crate::ports::Classifier;

use super::metrics::accuracy;

/// Hyperparameter values searched exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for HyperparameterGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200, 300],
            max_depth: vec![Some(4), Some(6), Some(8), None],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
        }
    }
}

impl HyperparameterGrid {
    /// Number of combinations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.min_samples_split.len() * self.min_samples_leaf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All combinations in enumeration order: max depth, min samples leaf,
    /// min samples split, tree count (last varies fastest).
    #[must_use]
    pub fn candidates(&self, seed: u64) -> Vec<ForestParams> {
        let mut out = Vec::with_capacity(self.len());
        for &max_depth in &self.max_depth {
            for &min_samples_leaf in &self.min_samples_leaf {
                for &min_samples_split in &self.min_samples_split {
                    for &n_estimators in &self.n_estimators {
                        out.push(ForestParams {
                            n_estimators,
                            max_depth,
                            min_samples_split,
                            min_samples_leaf,
                            seed,
                        });
                    }
                }
            }
        }
        out
    }
}

fn class_name(classes: &[String], label: usize) -> String {
    classes.get(label).cloned().unwrap_or_else(|| label.to_string())
}

/// Row indices grouped by class, each group shuffled.
fn shuffled_by_class(labels: &[usize], n_classes: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        groups[label].push(i);
    }
    for group in &mut groups {
        group.shuffle(rng);
    }
    groups
}

/// Train and test row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified shuffle split.
///
/// The test size is `ceil(test_fraction * n)`; it is shared out over classes
/// in proportion to their counts, with leftover rows going to the classes
/// with the largest fractional share.
///
/// # Errors
/// Returns `DataError::ClassTooSmall` if any class has fewer than two rows,
/// or if either side of the split would miss a class.
pub fn stratified_split(
    labels: &[usize],
    classes: &[String],
    test_fraction: f64,
    seed: u64,
) -> Result<Split, DataError> {
    let n = labels.len();
    let n_classes = classes.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let groups = shuffled_by_class(labels, n_classes, &mut rng);

    if let Some((label, group)) = groups.iter().enumerate().find(|(_, g)| g.len() < 2) {
        return Err(DataError::ClassTooSmall {
            class: class_name(classes, label),
            count: group.len(),
        });
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(n_classes, n - n_classes);

    let shares: Vec<f64> = groups
        .iter()
        .map(|g| n_test as f64 * g.len() as f64 / n as f64)
        .collect();
    let mut allocation: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let mut leftover = n_test - allocation.iter().sum::<usize>();

    let mut by_remainder: Vec<usize> = (0..n_classes).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &c in by_remainder.iter().cycle() {
        if leftover == 0 {
            break;
        }
        if allocation[c] < groups[c].len() {
            allocation[c] += 1;
            leftover -= 1;
        }
    }

    let mut split = Split {
        train: Vec::with_capacity(n - n_test),
        test: Vec::with_capacity(n_test),
    };
    for (label, (group, &k)) in groups.iter().zip(&allocation).enumerate() {
        if k == 0 || k == group.len() {
            return Err(DataError::ClassTooSmall {
                class: class_name(classes, label),
                count: group.len(),
            });
        }
        split.test.extend_from_slice(&group[..k]);
        split.train.extend_from_slice(&group[k..]);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

/// Stratified k-fold assignment.
///
/// Each class is shuffled and dealt round-robin across folds, continuing
/// from where the previous class stopped so fold sizes differ by at most one.
/// Returns the validation indices of each fold.
///
/// # Errors
/// Returns `DataError::ClassTooSmall` if any class has fewer rows than folds.
pub fn stratified_folds(labels: &[usize], classes: &[String], k: usize, seed: u64) -> Result<Vec<Vec<usize>>, DataError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let groups = shuffled_by_class(labels, classes.len(), &mut rng);

    if let Some((label, group)) = groups.iter().enumerate().find(|(_, g)| g.len() < k) {
        return Err(DataError::ClassTooSmall {
            class: class_name(classes, label),
            count: group.len(),
        });
    }

    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for group in &groups {
        for &i in group {
            folds[next].push(i);
            next = (next + 1) % k;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Cross-validation outcome of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ForestParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Grid search outcome, including the winner refitted on all training rows.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_params: ForestParams,
    pub best_score: f64,
    /// Every candidate, in enumeration order
    pub candidates: Vec<CandidateScore>,
    pub model: RandomForest,
}

/// Labeled rows handed to the search.
#[derive(Debug, Clone, Copy)]
pub struct TrainingSet<'a> {
    pub feature_names: &'a [String],
    pub rows: &'a [Vec<f64>],
    pub labels: &'a [usize],
    pub classes: &'a [String],
}

impl TrainingSet<'_> {
    fn subset(&self, idx: &[usize]) -> (Vec<Vec<f64>>, Vec<usize>) {
        (
            idx.iter().map(|&i| self.rows[i].clone()).collect(),
            idx.iter().map(|&i| self.labels[i]).collect(),
        )
    }
}

/// Exhaustive grid search with stratified k-fold CV and accuracy scoring.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub grid: HyperparameterGrid,
    pub folds: usize,
    pub seed: u64,
}

impl GridSearch {
    /// Score every candidate, pick the best mean accuracy (first wins ties),
    /// and refit it on the whole training set.
    ///
    /// # Errors
    /// Returns error if folds cannot be formed or a forest fails to fit.
    pub fn run(&self, data: TrainingSet<'_>) -> crate::Result<SearchResult> {
        if self.grid.is_empty() {
            return Err(crate::ScreeningError::Config("hyperparameter grid is empty".into()));
        }
        if self.folds < 2 {
            return Err(crate::ScreeningError::Config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }

        let folds = stratified_folds(data.labels, data.classes, self.folds, self.seed)?;
        let fold_data: Vec<((Vec<Vec<f64>>, Vec<usize>), (Vec<Vec<f64>>, Vec<usize>))> = (0..folds.len())
            .map(|f| {
                let train: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(g, _)| *g != f)
                    .flat_map(|(_, idx)| idx.iter().copied())
                    .collect();
                (data.subset(&train), data.subset(&folds[f]))
            })
            .collect();

        let candidates = self.grid.candidates(self.seed);
        tracing::info!(
            "Grid search: {} candidates x {} folds = {} fits",
            candidates.len(),
            self.folds,
            candidates.len() * self.folds
        );

        let scored: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|params| -> crate::Result<CandidateScore> {
                let fold_scores = fold_data
                    .iter()
                    .map(|((train_x, train_y), (val_x, val_y))| -> crate::Result<f64> {
                        let model = RandomForest::fit(*params, data.feature_names, train_x, train_y)?;
                        let predicted: Vec<usize> = val_x.iter().map(|x| model.predict(x)).collect();
                        Ok(accuracy(val_y, &predicted))
                    })
                    .collect::<crate::Result<Vec<f64>>>()?;
                let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                tracing::debug!("Candidate ({}) mean accuracy {:.4}", params, mean_score);
                Ok(CandidateScore {
                    params: *params,
                    fold_scores,
                    mean_score,
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        let mut best = &scored[0];
        for candidate in &scored[1..] {
            if candidate.mean_score > best.mean_score {
                best = candidate;
            }
        }
        let best_params = best.params;
        let best_score = best.mean_score;

        tracing::info!("Best parameters: {} (cv accuracy {:.4})", best_params, best_score);

        let model = RandomForest::fit(best_params, data.feature_names, data.rows, data.labels)?;

        Ok(SearchResult {
            best_params,
            best_score,
            candidates: scored,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["NO".into(), "YES".into()]
    }

    #[test]
    fn test_default_grid_has_108_candidates() {
        let grid = HyperparameterGrid::default();
        assert_eq!(grid.len(), 108);

        let candidates = grid.candidates(42);
        assert_eq!(candidates.len(), 108);
        assert_eq!(candidates[0].max_depth, Some(4));
        assert_eq!(candidates[0].n_estimators, 100);
        assert_eq!(candidates[1].n_estimators, 200);
        assert_eq!(candidates[3].min_samples_split, 5);
        assert_eq!(candidates[107].max_depth, None);
        assert!(candidates.iter().all(|c| c.seed == 42));
    }

    #[test]
    fn test_stratified_split_preserves_ratio() {
        // 60 negatives, 40 positives
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i >= 60)).collect();
        let split = stratified_split(&labels, &classes(), 0.2, 42).expect("split");

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 8);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratified_split_is_seeded() {
        let labels: Vec<usize> = (0..50).map(|i| i % 2).collect();
        let a = stratified_split(&labels, &classes(), 0.2, 42).expect("split");
        let b = stratified_split(&labels, &classes(), 0.2, 42).expect("split");
        let c = stratified_split(&labels, &classes(), 0.2, 7).expect("split");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_rejects_singleton_class() {
        let labels = vec![0, 0, 0, 0, 1];
        assert_eq!(
            stratified_split(&labels, &classes(), 0.2, 42),
            Err(DataError::ClassTooSmall {
                class: "YES".into(),
                count: 1
            })
        );
    }

    #[test]
    fn test_folds_are_stratified_and_disjoint() {
        let labels: Vec<usize> = (0..53).map(|i| usize::from(i % 3 == 0)).collect();
        let folds = stratified_folds(&labels, &classes(), 5, 42).expect("folds");

        assert_eq!(folds.len(), 5);
        let sizes: Vec<usize> = folds.iter().map(Vec::len).collect();
        assert!(sizes.iter().max().expect("max") - sizes.iter().min().expect("min") <= 1);

        let positives = labels.iter().filter(|&&l| l == 1).count();
        for fold in &folds {
            let pos = fold.iter().filter(|&&i| labels[i] == 1).count();
            assert!(pos.abs_diff(positives / 5) <= 1);
        }

        let mut all: Vec<usize> = folds.concat();
        all.sort_unstable();
        assert_eq!(all, (0..53).collect::<Vec<_>>());
    }

    #[test]
    fn test_folds_reject_small_class() {
        let labels = vec![0, 0, 0, 0, 0, 1, 1, 1];
        assert!(matches!(
            stratified_folds(&labels, &classes(), 5, 1),
            Err(DataError::ClassTooSmall { count: 3, .. })
        ));
    }

    #[test]
    fn test_grid_search_picks_first_best_and_refits() {
        // Both features determine the label, so every candidate scores 1.0.
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 2) as f64, (i % 2 * 3) as f64]).collect();
        let labels: Vec<usize> = (0..40).map(|i| i % 2).collect();
        let names = vec!["A".to_string(), "B".to_string()];
        let classes = classes();

        let search = GridSearch {
            grid: HyperparameterGrid {
                n_estimators: vec![5, 10],
                max_depth: vec![Some(2), None],
                min_samples_split: vec![2],
                min_samples_leaf: vec![1],
            },
            folds: 4,
            seed: 42,
        };
        let result = search
            .run(TrainingSet {
                feature_names: &names,
                rows: &rows,
                labels: &labels,
                classes: &classes,
            })
            .expect("search");

        assert_eq!(result.candidates.len(), 4);
        assert!(result.candidates.iter().all(|c| c.fold_scores.len() == 4));
        assert_eq!(result.best_score, 1.0);
        assert_eq!(result.best_params, result.candidates[0].params);
        assert_eq!(result.model.n_trees(), 5);
    }

    #[test]
    fn test_grid_search_rejects_single_fold() {
        let search = GridSearch {
            grid: HyperparameterGrid::default(),
            folds: 1,
            seed: 0,
        };
        let names = vec!["A".to_string()];
        let classes = classes();
        let result = search.run(TrainingSet {
            feature_names: &names,
            rows: &[vec![0.0], vec![1.0]],
            labels: &[0, 1],
            classes: &classes,
        });
        assert!(matches!(result, Err(crate::ScreeningError::Config(_))));
    }
}
