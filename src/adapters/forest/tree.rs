//! CART decision tree with Gini impurity.
//!
//! Nodes live in a flat arena; children always have larger indices than their
//! parent. Growth uses an explicit work stack so unbounded depth cannot
//! overflow the call stack.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeLimits {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DecisionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

fn gini(counts: &[f64], n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / n) * (c / n)).sum::<f64>()
}

fn class_counts(labels: &[usize], samples: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0.0; n_classes];
    for &i in samples {
        counts[labels[i]] += 1.0;
    }
    counts
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices, repeats allowed for bootstraps).
    ///
    /// Returns the tree and its unnormalized impurity decrease per feature.
    pub(crate) fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        samples: Vec<usize>,
        n_classes: usize,
        limits: &TreeLimits,
        rng: &mut ChaCha8Rng,
    ) -> (Self, Vec<f64>) {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut importances = vec![0.0; n_features];
        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((id, idx, depth)) = stack.pop() {
            let counts = class_counts(labels, &idx, n_classes);
            let n = idx.len();
            let impurity = gini(&counts, n as f64);

            let splittable = impurity > 0.0
                && limits.max_depth.map_or(true, |d| depth < d)
                && n >= limits.min_samples_split
                && n >= 2 * limits.min_samples_leaf;

            let split = if splittable {
                Self::best_split(rows, labels, &idx, &counts, impurity, limits, rng)
            } else {
                None
            };

            match split {
                Some(split) => {
                    importances[split.feature] += split.improvement;

                    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = idx
                        .into_iter()
                        .partition(|&i| rows[i][split.feature] <= split.threshold);

                    let left = nodes.len();
                    let right = left + 1;
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes.push(Node::Leaf {
                        distribution: Vec::new(),
                    });
                    nodes[id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left,
                        right,
                    };
                    stack.push((right, right_idx, depth + 1));
                    stack.push((left, left_idx, depth + 1));
                }
                None => {
                    let total = n.max(1) as f64;
                    nodes[id] = Node::Leaf {
                        distribution: counts.iter().map(|c| c / total).collect(),
                    };
                }
            }
        }

        (Self { nodes }, importances)
    }

    /// Search a random feature subset for the best threshold.
    ///
    /// Constant features do not count toward `max_features`, so a node is
    /// only left unsplit when every feature is constant or no threshold
    /// satisfies `min_samples_leaf`.
    fn best_split(
        rows: &[Vec<f64>],
        labels: &[usize],
        idx: &[usize],
        counts: &[f64],
        impurity: f64,
        limits: &TreeLimits,
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = idx.len();
        let n_features = rows[idx[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let parent = n as f64 * impurity;
        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature in features {
            if evaluated >= limits.max_features {
                break;
            }

            pairs.clear();
            pairs.extend(idx.iter().map(|&i| (rows[i][feature], labels[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if pairs[0].0 == pairs[n - 1].0 {
                continue;
            }
            evaluated += 1;

            let mut left = vec![0.0; counts.len()];
            let mut right = counts.to_vec();
            for k in 0..n - 1 {
                let (value, label) = pairs[k];
                left[label] += 1.0;
                right[label] -= 1.0;

                let next = pairs[k + 1].0;
                if value == next {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < limits.min_samples_leaf || n_right < limits.min_samples_leaf {
                    continue;
                }

                let child = n_left as f64 * gini(&left, n_left as f64)
                    + n_right as f64 * gini(&right, n_right as f64);
                let improvement = parent - child;

                if best.as_ref().map_or(true, |b| improvement > b.improvement) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        improvement,
                    });
                }
            }
        }

        best
    }

    /// Leaf class distribution for one row.
    pub(crate) fn predict_proba(&self, features: &[f64]) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Structural check for deserialized trees.
    pub(crate) fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!("leaf {id} has {} classes", distribution.len()));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {id} splits on feature {feature}"));
                    }
                    // Children after parent rules out cycles.
                    if *left <= id || *right <= id || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(format!("node {id} has invalid children"));
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[id] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn limits(max_depth: Option<usize>) -> TreeLimits {
        TreeLimits {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: 2,
        }
    }

    #[test]
    fn test_perfect_fit_on_separable_data() {
        let rows = vec![vec![0.0, 5.0], vec![1.0, 5.0], vec![10.0, 5.0], vec![11.0, 5.0]];
        let labels = vec![0, 0, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let (tree, importances) = DecisionTree::fit(&rows, &labels, vec![0, 1, 2, 3], 2, &limits(None), &mut rng);

        for (row, label) in rows.iter().zip(&labels) {
            let proba = tree.predict_proba(row);
            assert_eq!(proba[*label], 1.0);
        }
        // Second feature is constant and never used.
        assert!(importances[0] > 0.0);
        assert_eq!(importances[1], 0.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let rows: Vec<Vec<f64>> = (0..16).map(|i| vec![f64::from(i)]).collect();
        let labels: Vec<usize> = (0..16).map(|i| i % 2).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let limits = TreeLimits {
            max_features: 1,
            ..limits(Some(2))
        };

        let (tree, _) = DecisionTree::fit(&rows, &labels, (0..16).collect(), 2, &limits, &mut rng);
        assert!(tree.depth() <= 2);
        assert!(tree.validate(1, 2).is_ok());
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![f64::from(i)]).collect();
        let labels = vec![1, 0, 0, 0, 0, 0];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let limits = TreeLimits {
            min_samples_leaf: 2,
            max_features: 1,
            ..limits(None)
        };

        let (tree, _) = DecisionTree::fit(&rows, &labels, (0..6).collect(), 2, &limits, &mut rng);
        // The lone positive cannot be isolated into its own leaf.
        assert!(tree.predict_proba(&[0.0])[1] < 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_children() {
        let tree = DecisionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 1,
            }],
        };
        assert!(tree.validate(1, 2).is_err());
    }
}
