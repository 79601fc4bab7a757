use serde::{Deserialize, Serialize};
use crate::matches::Outcome;

pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.60;
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.50;

/// Rolling summary of a team's most recent matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FormSnapshot {
    pub win_rate: f64,
    pub draw_rate: f64,
    pub goals_for: f64,
    pub goals_against: f64,
    pub shots_on_target: f64,
    pub corners: f64,
    pub matches_considered: usize,
}

impl FormSnapshot {
    pub const DEFAULT_SHOTS_ON_TARGET: f64 = 4.5;
    pub const DEFAULT_CORNERS: f64 = 5.0;

    /// League-average prior used when a team has no history at all.
    pub fn league_average() -> Self {
        Self {
            win_rate: 0.45,
            draw_rate: 0.24,
            goals_for: 1.5,
            goals_against: 1.3,
            shots_on_target: Self::DEFAULT_SHOTS_ON_TARGET,
            corners: Self::DEFAULT_CORNERS,
            matches_considered: 0,
        }
    }

    pub fn has_history(&self) -> bool {
        self.matches_considered > 0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Both thresholds are inclusive on the high side.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceTier::High
        } else if confidence >= MEDIUM_CONFIDENCE_THRESHOLD {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::Low => "LOW",
        }
    }
}

/// Ordered model input. Names and order are fixed by the feature assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    features: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new(features: Vec<(String, f64)>) -> Self {
        Self { features }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.features.iter().map(|(_, value)| *value).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Per-class probabilities in the model's declared class order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassProbabilities {
    entries: Vec<(Outcome, f64)>,
}

impl ClassProbabilities {
    pub fn new(entries: Vec<(Outcome, f64)>) -> Self {
        Self { entries }
    }

    /// Probability of `outcome`, or 0.0 if the model does not emit that class.
    pub fn get(&self, outcome: Outcome) -> f64 {
        self.entries
            .iter()
            .find(|(o, _)| *o == outcome)
            .map_or(0.0, |(_, p)| *p)
    }

    /// Highest-probability class. Ties go to the earliest class in model order.
    pub fn argmax(&self) -> Option<(Outcome, f64)> {
        let mut best: Option<(Outcome, f64)> = None;
        for &(outcome, p) in &self.entries {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((outcome, p)),
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Outcome, f64)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResult {
    pub home_team: String,
    pub away_team: String,
    pub prediction: Outcome,
    pub confidence: f64,
    pub confidence_tier: ConfidenceTier,
    pub probabilities: ClassProbabilities,
    pub home_form: FormSnapshot,
    pub away_form: FormSnapshot,
}

/// Presentation rounding. Internal computation always keeps full precision.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
