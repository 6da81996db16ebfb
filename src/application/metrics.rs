//! Evaluation metrics for the held-out split.
//!
//! Precision, recall and F1 follow the usual convention of reporting 0.0 when
//! the denominator is zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fraction of predictions equal to the truth. Empty input scores 0.0.
#[must_use]
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Counts indexed `[actual][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    #[must_use]
    pub fn new(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut counts = vec![vec![0; n_classes]; n_classes];
        for (&t, &p) in truth.iter().zip(predicted) {
            if t < n_classes && p < n_classes {
                counts[t][p] += 1;
            }
        }
        Self { counts }
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        self.counts[actual][predicted]
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<usize>] {
        &self.counts
    }

    fn support(&self, class: usize) -> usize {
        self.counts[class].iter().sum()
    }

    fn predicted_total(&self, class: usize) -> usize {
        self.counts.iter().map(|row| row[class]).sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.counts {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>6}")).collect();
            writeln!(f, "[{} ]", cells.join(""))?;
        }
        Ok(())
    }
}

/// Precision, recall, F1 and support for one class or average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class scores plus accuracy and macro/weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub class_names: Vec<String>,
    pub per_class: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    #[must_use]
    pub fn from_confusion(matrix: &ConfusionMatrix, class_names: &[String]) -> Self {
        let n = matrix.n_classes();
        let per_class: Vec<ClassScores> = (0..n)
            .map(|c| {
                let tp = matrix.get(c, c);
                let precision = ratio(tp, matrix.predicted_total(c));
                let recall = ratio(tp, matrix.support(c));
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassScores {
                    precision,
                    recall,
                    f1,
                    support: matrix.support(c),
                }
            })
            .collect();

        let total: usize = per_class.iter().map(|s| s.support).sum();
        let correct: usize = (0..n).map(|c| matrix.get(c, c)).sum();

        let average = |weight: &dyn Fn(&ClassScores) -> f64| {
            let norm: f64 = per_class.iter().map(|s| weight(s)).sum();
            let mean = |field: fn(&ClassScores) -> f64| {
                if norm <= 0.0 {
                    return 0.0;
                }
                per_class.iter().map(|s| field(s) * weight(s)).sum::<f64>() / norm
            };
            ClassScores {
                precision: mean(|s| s.precision),
                recall: mean(|s| s.recall),
                f1: mean(|s| s.f1),
                support: total,
            }
        };

        let class_names = (0..n)
            .map(|c| class_names.get(c).cloned().unwrap_or_else(|| c.to_string()))
            .collect();

        Self {
            class_names,
            accuracy: ratio(correct, total),
            macro_avg: average(&|_| 1.0),
            weighted_avg: average(&|s| s.support as f64),
            per_class,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .class_names
            .iter()
            .map(String::len)
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, s) in self.class_names.iter().zip(&self.per_class) {
            writeln!(
                f,
                "{name:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, s) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{name:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                s.precision, s.recall, s.f1, s.support
            )?;
        }
        Ok(())
    }
}
