//! Screening result types.
//!
//! Represents the output of the random-forest lung cancer risk prediction.

use serde::{Deserialize, Serialize};

/// Human-facing classification of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Label 0: no significant indication
    Negative,
    /// Label 1: at risk, consultation advised
    Positive,
}

impl Verdict {
    /// Map an encoded label to a verdict (1 → positive, anything else → negative).
    #[must_use]
    pub fn from_label(label: usize) -> Self {
        if label == 1 {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Positive => "positive",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Negative => {
                "No significant indication of lung cancer. Keep up healthy habits and routine check-ups."
            }
            Self::Positive => {
                "Potential symptoms or risk of lung cancer. Please consult a medical professional for further examination."
            }
        }
    }

    /// Get the associated color for TUI display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Negative => (16, 185, 129), // Emerald (#10B981)
            Self::Positive => (244, 63, 94),  // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negative => write!(f, "NEGATIVE"),
            Self::Positive => write!(f, "POSITIVE"),
        }
    }
}

/// Complete screening record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screening {
    /// Encoded predicted label (0 or 1)
    pub label: usize,

    /// Verdict derived from the label
    pub verdict: Verdict,

    /// Probability of the predicted class, as a percentage (0 to 100)
    pub confidence: f64,

    /// Per-class probabilities (index = encoded label)
    pub probabilities: Vec<f64>,

    /// Timestamp of screening
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Screening {
    /// Build a screening from a predicted label and class probabilities.
    #[must_use]
    pub fn new(label: usize, probabilities: Vec<f64>) -> Self {
        let confidence = probabilities
            .get(label)
            .map(|p| (p * 100.0).clamp(0.0, 100.0))
            .unwrap_or(0.0);

        Self {
            label,
            verdict: Verdict::from_label(label),
            confidence,
            probabilities,
            created_at: chrono::Utc::now(),
        }
    }

    /// Probability of the positive (label 1) class, 0.0 to 1.0.
    #[must_use]
    pub fn positive_probability(&self) -> f64 {
        self.probabilities.get(1).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_from_label() {
        assert_eq!(Verdict::from_label(1), Verdict::Positive);
        assert_eq!(Verdict::from_label(0), Verdict::Negative);
        assert_eq!(Verdict::Positive.as_str(), "positive");
        assert_eq!(Verdict::Negative.to_string(), "NEGATIVE");
    }

    #[test]
    fn test_confidence_is_predicted_class_probability() {
        let screening = Screening::new(0, vec![0.8, 0.2]);
        assert_eq!(screening.verdict, Verdict::Negative);
        assert!((screening.confidence - 80.0).abs() < 1e-9);
        assert!((screening.positive_probability() - 0.2).abs() < 1e-9);

        let screening = Screening::new(1, vec![0.35, 0.65]);
        assert_eq!(screening.verdict, Verdict::Positive);
        assert!((screening.confidence - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_verdict_serializes_lowercase() {
        let json = serde_json::to_string(&Verdict::Positive).expect("serialize");
        assert_eq!(json, "\"positive\"");
    }
}
