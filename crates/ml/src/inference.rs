//! Model inference for match outcome predictions.

use std::sync::Arc;

use footy_models::{
    ClassProbabilities, ConfidenceTier, FootyError, MatchOdds, MatchRecord, PredictionResult, Result,
};
use tracing::debug;

use crate::features::{FeatureEngineer, MatchFeatures};
use crate::models::Classifier;

/// Combines the feature assembler with a loaded classifier.
pub struct Predictor {
    model: Arc<dyn Classifier>,
    engineer: FeatureEngineer,
}

impl Predictor {
    /// Refuses a model whose training columns differ from the assembler's.
    pub fn new(model: Arc<dyn Classifier>, engineer: FeatureEngineer) -> Result<Self> {
        let expected = engineer.feature_names();
        let found = model.feature_names();
        let aligned = expected.len() == found.len()
            && expected.iter().zip(found).all(|(e, f)| *e == f.as_str());
        if !aligned {
            return Err(FootyError::FeatureMismatch {
                expected: expected.iter().map(|s| (*s).to_string()).collect(),
                found: found.to_vec(),
            });
        }

        Ok(Self { model, engineer })
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    pub fn features(
        &self,
        home_team: &str,
        away_team: &str,
        odds: &MatchOdds,
        history: &[MatchRecord],
    ) -> Result<MatchFeatures> {
        self.engineer
            .extract_features(home_team, away_team, odds, history)
    }

    pub fn predict(
        &self,
        home_team: &str,
        away_team: &str,
        odds: &MatchOdds,
        history: &[MatchRecord],
    ) -> Result<PredictionResult> {
        let features = self.features(home_team, away_team, odds, history)?;
        let raw = self.model.predict_proba(&features.vector)?;

        let classes = self.model.classes();
        if raw.len() != classes.len() {
            return Err(FootyError::PredictionFailed {
                reason: format!(
                    "model returned {} probabilities for {} classes",
                    raw.len(),
                    classes.len()
                ),
            });
        }

        let probabilities =
            ClassProbabilities::new(classes.iter().copied().zip(raw).collect());
        let (prediction, confidence) =
            probabilities
                .argmax()
                .ok_or_else(|| FootyError::PredictionFailed {
                    reason: "model returned no probabilities".to_string(),
                })?;

        debug!(
            "{} vs {}: {} ({:.3}) from {} / {} matches of form",
            home_team,
            away_team,
            prediction,
            confidence,
            features.home_form.matches_considered,
            features.away_form.matches_considered
        );

        Ok(PredictionResult {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            prediction,
            confidence,
            confidence_tier: ConfidenceTier::from_confidence(confidence),
            probabilities,
            home_form: features.home_form,
            away_form: features.away_form,
        })
    }
}
