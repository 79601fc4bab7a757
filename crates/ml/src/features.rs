// Feature engineering

use footy_models::{FeatureVector, FormSnapshot, ImpliedProbabilities, MatchOdds, MatchRecord, Result};

use crate::form::{compute_form, DEFAULT_FORM_WINDOW};

/// Column order of the classifier input. The model's `feature_names.json`
/// must list exactly these names in exactly this order.
pub const FEATURE_NAMES: [&str; 18] = [
    "h_win_rate",
    "h_draw_rate",
    "h_goals_for",
    "h_goals_against",
    "h_shots_target",
    "h_corners",
    "a_win_rate",
    "a_draw_rate",
    "a_goals_for",
    "a_goals_against",
    "a_shots_target",
    "a_corners",
    "win_diff",
    "goals_diff",
    "sot_diff",
    "imp_home",
    "imp_draw",
    "imp_away",
];

/// Everything derived from the history and the market for one fixture.
#[derive(Debug, Clone)]
pub struct MatchFeatures {
    pub home_form: FormSnapshot,
    pub away_form: FormSnapshot,
    pub implied: ImpliedProbabilities,
    pub vector: FeatureVector,
}

pub struct FeatureEngineer {
    window: usize,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self {
            window: DEFAULT_FORM_WINDOW,
        }
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }

    pub fn team_form(&self, team: &str, history: &[MatchRecord]) -> FormSnapshot {
        compute_form(team, history, self.window)
    }

    /// Odds are validated before any history is scanned.
    pub fn extract_features(
        &self,
        home_team: &str,
        away_team: &str,
        odds: &MatchOdds,
        history: &[MatchRecord],
    ) -> Result<MatchFeatures> {
        let implied = odds.implied_probabilities()?;
        let home_form = self.team_form(home_team, history);
        let away_form = self.team_form(away_team, history);
        let vector = assemble(&home_form, &away_form, &implied);

        Ok(MatchFeatures {
            home_form,
            away_form,
            implied,
            vector,
        })
    }
}

pub fn assemble(
    home: &FormSnapshot,
    away: &FormSnapshot,
    implied: &ImpliedProbabilities,
) -> FeatureVector {
    let values = [
        home.win_rate,
        home.draw_rate,
        home.goals_for,
        home.goals_against,
        home.shots_on_target,
        home.corners,
        away.win_rate,
        away.draw_rate,
        away.goals_for,
        away.goals_against,
        away.shots_on_target,
        away.corners,
        home.win_rate - away.win_rate,
        home.goals_for - away.goals_for,
        home.shots_on_target - away.shots_on_target,
        implied.home,
        implied.draw,
        implied.away,
    ];

    FeatureVector::new(
        FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| ((*name).to_string(), value))
            .collect(),
    )
}
