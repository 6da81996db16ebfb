//! Classifier port: Trait for fitted tabular classifiers.
//!
//! The prediction service only sees this trait, so the model family can be
//! swapped without touching feature encoding or verdict mapping.

/// A fitted, immutable binary classifier over a fixed feature order.
pub trait Classifier: Send + Sync {
    /// Feature names the model was fitted on, in column order.
    fn feature_names(&self) -> &[String];

    /// Number of outcome classes.
    fn n_classes(&self) -> usize;

    /// Per-class probabilities for one feature row.
    ///
    /// The returned vector has `n_classes()` entries summing to 1.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;

    /// Predicted class for one feature row.
    ///
    /// Defaults to the most probable class; ties go to the lower label.
    fn predict(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba(features))
    }

    /// Normalized importance score per feature (same order as `feature_names`).
    fn feature_importances(&self) -> Vec<f64>;
}

/// Index of the first maximum.
#[must_use]
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
