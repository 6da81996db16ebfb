//! Respondent answer types for lung cancer risk screening.
//!
//! A respondent supplies an age and one yes/no answer for each of the sixteen
//! indicators. Two indicators (`ENERGY_LEVEL_KATEGORI`,
//! `OXYGEN_SATURATION_KATEGORI`) are derived from continuous measurements in
//! the training data but asked directly in the questionnaire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Youngest accepted respondent age (inclusive).
pub const MIN_AGE: u32 = 20;

/// Oldest accepted respondent age (inclusive).
pub const MAX_AGE: u32 = 100;

/// Binary survey indicators, in questionnaire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Indicator {
    Gender,
    Smoking,
    FingerDiscoloration,
    ExposureToPollution,
    LongTermIllness,
    ImmuneWeakness,
    BreathingIssue,
    AlcoholConsumption,
    ThroatDiscomfort,
    ChestTightness,
    FamilyHistory,
    SmokingFamilyHistory,
    StressImmune,
    MentalStress,
    EnergyLevelKategori,
    OxygenSaturationKategori,
}

impl Indicator {
    /// All sixteen indicators in questionnaire order.
    pub const ALL: [Indicator; 16] = [
        Self::Gender,
        Self::Smoking,
        Self::FingerDiscoloration,
        Self::ExposureToPollution,
        Self::LongTermIllness,
        Self::ImmuneWeakness,
        Self::BreathingIssue,
        Self::AlcoholConsumption,
        Self::ThroatDiscomfort,
        Self::ChestTightness,
        Self::FamilyHistory,
        Self::SmokingFamilyHistory,
        Self::StressImmune,
        Self::MentalStress,
        Self::EnergyLevelKategori,
        Self::OxygenSaturationKategori,
    ];

    /// Column name used in datasets and persisted feature orders.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gender => "GENDER",
            Self::Smoking => "SMOKING",
            Self::FingerDiscoloration => "FINGER_DISCOLORATION",
            Self::ExposureToPollution => "EXPOSURE_TO_POLLUTION",
            Self::LongTermIllness => "LONG_TERM_ILLNESS",
            Self::ImmuneWeakness => "IMMUNE_WEAKNESS",
            Self::BreathingIssue => "BREATHING_ISSUE",
            Self::AlcoholConsumption => "ALCOHOL_CONSUMPTION",
            Self::ThroatDiscomfort => "THROAT_DISCOMFORT",
            Self::ChestTightness => "CHEST_TIGHTNESS",
            Self::FamilyHistory => "FAMILY_HISTORY",
            Self::SmokingFamilyHistory => "SMOKING_FAMILY_HISTORY",
            Self::StressImmune => "STRESS_IMMUNE",
            Self::MentalStress => "MENTAL_STRESS",
            Self::EnergyLevelKategori => "ENERGY_LEVEL_KATEGORI",
            Self::OxygenSaturationKategori => "OXYGEN_SATURATION_KATEGORI",
        }
    }

    /// Question shown to the respondent.
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Gender => "Are you male?",
            Self::Smoking => "Do you smoke (cigarettes or vape)?",
            Self::FingerDiscoloration => {
                "Are your fingertips yellowish or abnormally discolored?"
            }
            Self::ExposureToPollution => {
                "Are you often exposed to air pollution (traffic fumes, smoke, dusty workplace)?"
            }
            Self::LongTermIllness => {
                "Do you have a chronic or long-term illness (asthma, diabetes, hypertension, TB)?"
            }
            Self::ImmuneWeakness => "Do you feel your immune system is weak or you fall ill easily?",
            Self::BreathingIssue => "Do you often have breathing problems such as shortness of breath?",
            Self::AlcoholConsumption => "Do you drink alcohol regularly, or have you in the past?",
            Self::ThroatDiscomfort => "Do you often feel throat discomfort, such as pain when swallowing?",
            Self::ChestTightness => "Have you felt tightness, heaviness or pain in your chest?",
            Self::FamilyHistory => "Has a family member had lung cancer?",
            Self::SmokingFamilyHistory => "Does a family member smoke regularly at home?",
            Self::StressImmune => "Does stress weaken your immunity (you get sick when stressed)?",
            Self::MentalStress => "Does stress or mental pressure often affect your physical condition?",
            Self::EnergyLevelKategori => {
                "Do you tire easily without reason during daily activities?"
            }
            Self::OxygenSaturationKategori => {
                "Has your oxygen saturation been below 95%, or do you often feel short of oxygen?"
            }
        }
    }

    /// Short label for compact displays.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gender => "Male",
            Self::Smoking => "Smoking",
            Self::FingerDiscoloration => "Finger discoloration",
            Self::ExposureToPollution => "Pollution exposure",
            Self::LongTermIllness => "Long-term illness",
            Self::ImmuneWeakness => "Immune weakness",
            Self::BreathingIssue => "Breathing issue",
            Self::AlcoholConsumption => "Alcohol",
            Self::ThroatDiscomfort => "Throat discomfort",
            Self::ChestTightness => "Chest tightness",
            Self::FamilyHistory => "Family history",
            Self::SmokingFamilyHistory => "Smoking at home",
            Self::StressImmune => "Stress immunity",
            Self::MentalStress => "Mental stress",
            Self::EnergyLevelKategori => "Low energy",
            Self::OxygenSaturationKategori => "Low oxygen saturation",
        }
    }

    /// Look up an indicator by its column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|i| i.name() == name)
    }

    /// Whether the training data derives this indicator from a continuous
    /// measurement instead of supplying it directly.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::EnergyLevelKategori | Self::OxygenSaturationKategori)
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A yes/no answer to an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    /// Absent / "no"
    No,
    /// Present / "yes"
    Yes,
}

impl Answer {
    /// Binary encoding: present → 1, absent → 0.
    #[must_use]
    pub fn encode(self) -> f64 {
        match self {
            Self::No => 0.0,
            Self::Yes => 1.0,
        }
    }

    /// Parse a raw dataset token. Returns `None` for unrecognized tokens.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "1" | "1.0" | "yes" | "y" | "true" | "present" => Some(Self::Yes),
            "0" | "0.0" | "no" | "n" | "false" | "absent" => Some(Self::No),
            _ => None,
        }
    }
}

impl From<bool> for Answer {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::No => write!(f, "No"),
            Self::Yes => write!(f, "Yes"),
        }
    }
}

/// Input validation failures, raised before any feature transformation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputValidationError {
    #[error("Age {0} out of range [{MIN_AGE}, {MAX_AGE}]")]
    AgeOutOfRange(u32),

    #[error("Unanswered questions: {}", .0.join(", "))]
    Unanswered(Vec<&'static str>),
}

/// One respondent's answer set as collected by the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAnswers {
    /// Age in years (20-100 accepted)
    pub age: u32,

    /// Answers keyed by indicator; a missing key means unanswered
    pub answers: BTreeMap<Indicator, Answer>,
}

impl QuestionnaireAnswers {
    /// Start an empty answer set for the given age.
    #[must_use]
    pub fn new(age: u32) -> Self {
        Self {
            age,
            answers: BTreeMap::new(),
        }
    }

    /// Answer every indicator with the same value.
    #[must_use]
    pub fn uniform(age: u32, answer: Answer) -> Self {
        Self {
            age,
            answers: Indicator::ALL.iter().map(|&i| (i, answer)).collect(),
        }
    }

    /// Builder-style answer assignment.
    #[must_use]
    pub fn with(mut self, indicator: Indicator, answer: Answer) -> Self {
        self.answers.insert(indicator, answer);
        self
    }

    /// Record an answer.
    pub fn set(&mut self, indicator: Indicator, answer: Answer) {
        self.answers.insert(indicator, answer);
    }

    /// Indicators that have not been answered yet, in questionnaire order.
    #[must_use]
    pub fn unanswered(&self) -> Vec<Indicator> {
        Indicator::ALL
            .iter()
            .copied()
            .filter(|i| !self.answers.contains_key(i))
            .collect()
    }

    /// Validate the answer set against the input contract.
    ///
    /// # Errors
    /// Returns `InputValidationError` if the age is outside 20-100 or any
    /// indicator is unanswered.
    pub fn validate(&self) -> Result<(), InputValidationError> {
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(InputValidationError::AgeOutOfRange(self.age));
        }

        let missing = self.unanswered();
        if !missing.is_empty() {
            return Err(InputValidationError::Unanswered(
                missing.iter().map(Indicator::name).collect(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_names_roundtrip() {
        for indicator in Indicator::ALL {
            assert_eq!(Indicator::from_name(indicator.name()), Some(indicator));
        }
        assert_eq!(Indicator::from_name("AGE"), None);
    }

    #[test]
    fn test_derived_indicators() {
        let derived: Vec<_> = Indicator::ALL.iter().filter(|i| i.is_derived()).collect();
        assert_eq!(
            derived,
            vec![
                &Indicator::EnergyLevelKategori,
                &Indicator::OxygenSaturationKategori
            ]
        );
    }

    #[test]
    fn test_answer_tokens() {
        assert_eq!(Answer::from_token("1"), Some(Answer::Yes));
        assert_eq!(Answer::from_token(" YES "), Some(Answer::Yes));
        assert_eq!(Answer::from_token("absent"), Some(Answer::No));
        assert_eq!(Answer::from_token("0"), Some(Answer::No));
        assert_eq!(Answer::from_token("maybe"), None);
        assert_eq!(Answer::from_token(""), None);
    }

    #[test]
    fn test_age_boundaries() {
        assert!(QuestionnaireAnswers::uniform(20, Answer::No).validate().is_ok());
        assert!(QuestionnaireAnswers::uniform(100, Answer::No).validate().is_ok());
        assert_eq!(
            QuestionnaireAnswers::uniform(19, Answer::No).validate(),
            Err(InputValidationError::AgeOutOfRange(19))
        );
        assert_eq!(
            QuestionnaireAnswers::uniform(101, Answer::No).validate(),
            Err(InputValidationError::AgeOutOfRange(101))
        );
    }

    #[test]
    fn test_unanswered_rejected() {
        let mut answers = QuestionnaireAnswers::uniform(50, Answer::Yes);
        answers.answers.remove(&Indicator::ChestTightness);

        match answers.validate() {
            Err(InputValidationError::Unanswered(missing)) => {
                assert_eq!(missing, vec!["CHEST_TIGHTNESS"]);
            }
            other => panic!("expected Unanswered, got {other:?}"),
        }
    }
}
