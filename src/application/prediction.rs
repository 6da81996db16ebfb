//! Prediction service: Screens one respondent against the trained model.
//!
//! Pipeline per call:
//! 1. Validate the answer set (age range, every indicator answered)
//! 2. Reindex the answers against the persisted feature order
//! 3. Check the order against the model's fitted feature names
//! 4. Predict the label and class probabilities; confidence is the
//!    probability of the predicted label
//!
//! Calls are pure and synchronous. The loaded artifacts live in a
//! [`ScreeningContext`] built once at startup and shared read-only.

use std::sync::Arc;

use crate::domain::{FeatureColumnOrder, FeatureTransformer, QuestionnaireAnswers, Screening};
use crate::ports::{ArtifactBundle, ArtifactStore, Classifier, TrainingMetadata};
use crate::{Result, ScreeningError};

/// Immutable inference context: a fitted model and the order it expects.
#[derive(Debug)]
pub struct ScreeningContext<M> {
    model: Arc<M>,
    feature_order: FeatureColumnOrder,
    metadata: Option<TrainingMetadata>,
}

impl<M: Classifier> ScreeningContext<M> {
    #[must_use]
    pub fn new(model: Arc<M>, feature_order: FeatureColumnOrder) -> Self {
        Self {
            model,
            feature_order,
            metadata: None,
        }
    }

    #[must_use]
    pub fn from_bundle(bundle: ArtifactBundle<M>) -> Self {
        Self {
            model: Arc::new(bundle.model),
            feature_order: bundle.feature_order,
            metadata: Some(bundle.metadata),
        }
    }

    /// Load and verify artifacts from a store.
    ///
    /// # Errors
    /// Returns `ScreeningError::Artifact` if the store rejects the bundle.
    pub fn load<S>(store: &S) -> Result<Self>
    where
        S: ArtifactStore<Model = M>,
        S::Error: Into<crate::adapters::ArtifactError>,
    {
        let bundle = store.load().map_err(|e| ScreeningError::Artifact(e.into()))?;
        Ok(Self::from_bundle(bundle))
    }

    #[must_use]
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    #[must_use]
    pub fn feature_order(&self) -> &FeatureColumnOrder {
        &self.feature_order
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&TrainingMetadata> {
        self.metadata.as_ref()
    }
}

/// Service for screening respondents.
pub struct PredictionService<M> {
    context: Arc<ScreeningContext<M>>,
}

impl<M> Clone for PredictionService<M> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
        }
    }
}

impl<M: Classifier> PredictionService<M> {
    pub fn new(context: Arc<ScreeningContext<M>>) -> Self {
        Self { context }
    }

    #[must_use]
    pub fn context(&self) -> &ScreeningContext<M> {
        &self.context
    }

    /// Screen one respondent.
    ///
    /// # Errors
    /// Returns `ScreeningError::Validation` for incomplete or out-of-range
    /// answers (the model is never called), and `ScreeningError::Schema` if
    /// the answers, the feature order, and the model disagree on columns.
    pub fn predict(&self, answers: &QuestionnaireAnswers) -> Result<Screening> {
        answers.validate()?;

        let ctx = &self.context;
        let vector = FeatureTransformer::new(&ctx.feature_order).from_answers(answers)?;
        ctx.feature_order.ensure_matches(ctx.model.feature_names())?;

        let label = ctx.model.predict(vector.values());
        let probabilities = ctx.model.predict_proba(vector.values());
        let screening = Screening::new(label, probabilities);

        tracing::info!(
            "Screening complete: verdict={}, confidence={:.2}%",
            screening.verdict,
            screening.confidence
        );

        Ok(screening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::training::tests::{balanced_table, fast_config};
    use crate::application::Trainer;
    use crate::adapters::JsonArtifactStore;
    use crate::domain::{Answer, Indicator, InputValidationError, SchemaMismatch, Verdict};
    use crate::ports::argmax;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fixed-output classifier that counts predictions.
    struct FixedModel {
        names: Vec<String>,
        proba: Vec<f64>,
        label: Option<usize>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn new(order: &FeatureColumnOrder, proba: Vec<f64>) -> Self {
            Self {
                names: order.columns().to_vec(),
                proba,
                label: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for FixedModel {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn n_classes(&self) -> usize {
            self.proba.len()
        }

        fn predict_proba(&self, _features: &[f64]) -> Vec<f64> {
            self.proba.clone()
        }

        fn predict(&self, _features: &[f64]) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.label.unwrap_or_else(|| argmax(&self.proba))
        }

        fn feature_importances(&self) -> Vec<f64> {
            vec![0.0; self.names.len()]
        }
    }

    fn fixed_service(proba: Vec<f64>) -> (PredictionService<FixedModel>, Arc<FixedModel>) {
        let order = FeatureColumnOrder::questionnaire();
        let model = Arc::new(FixedModel::new(&order, proba));
        let context = ScreeningContext::new(Arc::clone(&model), order);
        (PredictionService::new(Arc::new(context)), model)
    }

    fn trained_service() -> PredictionService<crate::adapters::RandomForest> {
        let outcome = Trainer::new(fast_config()).train(&balanced_table(60)).expect("train");
        PredictionService::new(Arc::new(ScreeningContext::from_bundle(outcome.bundle)))
    }

    #[test]
    fn test_confidence_is_max_probability() {
        let (service, _) = fixed_service(vec![0.3, 0.7]);
        let screening = service
            .predict(&QuestionnaireAnswers::uniform(45, Answer::Yes))
            .expect("predict");

        assert_eq!(screening.verdict, Verdict::Positive);
        assert_eq!(screening.label, 1);
        assert!((screening.confidence - 70.0).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&screening.confidence));
    }

    #[test]
    fn test_verdict_follows_model_prediction() {
        let order = FeatureColumnOrder::questionnaire();
        let mut model = FixedModel::new(&order, vec![0.6, 0.4]);
        // Decision threshold below 0.5, as a calibrated model might use.
        model.label = Some(1);
        let service = PredictionService::new(Arc::new(ScreeningContext::new(Arc::new(model), order)));

        let screening = service
            .predict(&QuestionnaireAnswers::uniform(45, Answer::No))
            .expect("predict");
        assert_eq!(screening.label, 1);
        assert_eq!(screening.verdict, Verdict::Positive);
        assert!((screening.confidence - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_loaded_artifacts_predict_like_bundle() {
        let outcome = Trainer::new(fast_config()).train(&balanced_table(60)).expect("train");
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonArtifactStore::new(dir.path());
        store.save(&outcome.bundle).expect("save");

        let loaded = PredictionService::new(Arc::new(ScreeningContext::load(&store).expect("load")));
        let in_memory = PredictionService::new(Arc::new(ScreeningContext::from_bundle(outcome.bundle)));
        assert_eq!(
            loaded.context().metadata().map(|m| &m.hyperparameters),
            in_memory.context().metadata().map(|m| &m.hyperparameters)
        );

        for answers in [
            QuestionnaireAnswers::uniform(50, Answer::No),
            QuestionnaireAnswers::uniform(70, Answer::Yes),
            QuestionnaireAnswers::uniform(35, Answer::No).with(Indicator::Smoking, Answer::Yes),
        ] {
            let a = loaded.predict(&answers).expect("predict loaded");
            let b = in_memory.predict(&answers).expect("predict in memory");
            assert_eq!(a.verdict, b.verdict);
            for (p, q) in a.probabilities.iter().zip(&b.probabilities) {
                assert!((p - q).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_unanswered_rejected_before_model_call() {
        let (service, model) = fixed_service(vec![0.5, 0.5]);
        let mut answers = QuestionnaireAnswers::uniform(45, Answer::No);
        answers.answers.remove(&Indicator::OxygenSaturationKategori);

        let result = service.predict(&answers);
        assert!(matches!(
            result,
            Err(ScreeningError::Validation(InputValidationError::Unanswered(_)))
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_age_bounds() {
        let (service, model) = fixed_service(vec![0.9, 0.1]);
        assert!(service.predict(&QuestionnaireAnswers::uniform(20, Answer::No)).is_ok());
        assert!(service.predict(&QuestionnaireAnswers::uniform(100, Answer::No)).is_ok());
        assert!(matches!(
            service.predict(&QuestionnaireAnswers::uniform(19, Answer::No)),
            Err(ScreeningError::Validation(InputValidationError::AgeOutOfRange(19)))
        ));
        assert!(matches!(
            service.predict(&QuestionnaireAnswers::uniform(101, Answer::No)),
            Err(ScreeningError::Validation(InputValidationError::AgeOutOfRange(101)))
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_renamed_order_column_is_schema_mismatch() {
        let mut columns = FeatureColumnOrder::questionnaire().columns().to_vec();
        columns[2] = "SMOKER".to_string();
        let order = FeatureColumnOrder::new(columns).expect("order");
        let model = Arc::new(FixedModel::new(&order, vec![0.5, 0.5]));
        let service = PredictionService::new(Arc::new(ScreeningContext::new(Arc::clone(&model), order)));

        let result = service.predict(&QuestionnaireAnswers::uniform(45, Answer::No));
        assert!(matches!(
            result,
            Err(ScreeningError::Schema(SchemaMismatch::Columns { .. }))
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_model_fitted_on_other_columns_is_schema_mismatch() {
        let order = FeatureColumnOrder::questionnaire();
        let mut model = FixedModel::new(&order, vec![0.5, 0.5]);
        model.names.swap(0, 1);
        let service = PredictionService::new(Arc::new(ScreeningContext::new(Arc::new(model), order)));

        assert!(matches!(
            service.predict(&QuestionnaireAnswers::uniform(45, Answer::No)),
            Err(ScreeningError::Schema(SchemaMismatch::ModelColumns { .. }))
        ));
    }

    #[test]
    fn test_identical_answers_identical_screening() {
        let service = trained_service();
        let answers = QuestionnaireAnswers::uniform(61, Answer::No)
            .with(Indicator::Smoking, Answer::Yes)
            .with(Indicator::BreathingIssue, Answer::Yes);

        let a = service.predict(&answers).expect("predict");
        let b = service.predict(&answers).expect("predict");
        assert_eq!(a.verdict, b.verdict);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.probabilities, b.probabilities);
    }

    #[test]
    fn test_confidence_matches_forest_probabilities() {
        let service = trained_service();
        let screening = service
            .predict(&QuestionnaireAnswers::uniform(33, Answer::Yes))
            .expect("predict");
        let max = screening.probabilities.iter().copied().fold(f64::MIN, f64::max);
        assert!((screening.confidence - max * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_no_median_age_is_negative() {
        let service = trained_service();
        let screening = service
            .predict(&QuestionnaireAnswers::uniform(50, Answer::No))
            .expect("predict");
        assert_eq!(screening.verdict, Verdict::Negative);
        assert_eq!(screening.verdict.as_str(), "negative");
    }

    #[test]
    fn test_context_shared_across_threads() {
        let service = trained_service();
        let answers = QuestionnaireAnswers::uniform(70, Answer::Yes);
        let expected = service.predict(&answers).expect("predict").probabilities;

        std::thread::scope(|s| {
            for _ in 0..4 {
                let service = service.clone();
                let answers = answers.clone();
                let expected = expected.clone();
                s.spawn(move || {
                    let got = service.predict(&answers).expect("predict");
                    assert_eq!(got.probabilities, expected);
                });
            }
        });
    }
}
