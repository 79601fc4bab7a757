// Prediction service

use std::sync::Arc;

use footy_db::{HistoryHandle, HistoryStats, MatchHistory};
use footy_ml::Predictor;
use footy_models::{FootyError, FormSnapshot, MatchOdds, MatchRecord, PredictionResult, Result};
use tracing::info;

/// Answers read-only questions against the current history snapshot.
#[derive(Clone)]
pub struct PredictorService {
    predictor: Arc<Predictor>,
    history: HistoryHandle,
    model_accuracy: Option<String>,
}

impl PredictorService {
    pub fn new(predictor: Arc<Predictor>, history: HistoryHandle) -> Self {
        Self {
            predictor,
            history,
            model_accuracy: None,
        }
    }

    pub fn with_model_accuracy(mut self, accuracy: Option<String>) -> Self {
        self.model_accuracy = accuracy;
        self
    }

    pub fn model_name(&self) -> &str {
        self.predictor.model().model_name()
    }

    pub fn model_accuracy(&self) -> Option<&str> {
        self.model_accuracy.as_deref()
    }

    pub fn history(&self) -> Arc<MatchHistory> {
        self.history.snapshot()
    }

    /// Unknown teams are predicted from the league-average prior.
    pub fn predict(&self, home_team: &str, away_team: &str, odds: MatchOdds) -> Result<PredictionResult> {
        let home_team = require_team(home_team, "home_team")?;
        let away_team = require_team(away_team, "away_team")?;

        let snapshot = self.history.snapshot();
        let result = self
            .predictor
            .predict(home_team, away_team, &odds, snapshot.records())?;

        info!(
            "Predicted {} vs {}: {} ({:.3}, {})",
            home_team,
            away_team,
            result.prediction,
            result.confidence,
            result.confidence_tier.as_str()
        );
        Ok(result)
    }

    /// Form over the default window; a team with no matches is not found.
    pub fn team_form(&self, team: &str) -> Result<FormSnapshot> {
        let snapshot = self.history.snapshot();
        let form = self.predictor.engineer().team_form(team, snapshot.records());
        if form.has_history() {
            Ok(form)
        } else {
            Err(FootyError::TeamNotFound {
                team: team.to_string(),
            })
        }
    }

    pub fn teams(&self) -> Vec<String> {
        self.history.snapshot().teams()
    }

    pub fn stats(&self) -> HistoryStats {
        self.history.snapshot().stats()
    }

    /// The last `n` rows plus the table size.
    pub fn latest_matches(&self, n: usize) -> (Vec<MatchRecord>, usize) {
        let snapshot = self.history.snapshot();
        (snapshot.latest(n).to_vec(), snapshot.len())
    }
}

fn require_team<'a>(name: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(FootyError::InvalidInput(format!("{} must not be empty", field)))
    } else {
        Ok(name)
    }
}
