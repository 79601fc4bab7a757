use chrono::NaiveDate;
use footy_models::{BookOdds, MatchRecord, Outcome, SideStats};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid row at line {line}: {reason}")]
    InvalidRow { line: usize, reason: String },

    #[error("History file not found: {0}")]
    NotFound(String),

    #[error("Another update holds {0}")]
    Locked(String),
}

impl From<HistoryError> for footy_models::FootyError {
    fn from(err: HistoryError) -> Self {
        match err {
            HistoryError::InvalidRow { .. } => footy_models::FootyError::DataCorruption(err.to_string()),
            HistoryError::Io { source, .. } => footy_models::FootyError::Io(source),
            other => footy_models::FootyError::Config(other.to_string()),
        }
    }
}

/// Flat on-disk shape of a match row. Field order is the column order
/// written back to disk; unknown columns are ignored on read and every
/// nullable column may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvMatchRow {
    #[serde(default)]
    pub league: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: String,
    pub away_goals: String,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub home_shots: String,
    #[serde(default)]
    pub away_shots: String,
    #[serde(default)]
    pub home_shots_target: String,
    #[serde(default)]
    pub away_shots_target: String,
    #[serde(default)]
    pub home_corners: String,
    #[serde(default)]
    pub away_corners: String,
    #[serde(default)]
    pub home_yellows: String,
    #[serde(default)]
    pub away_yellows: String,
    #[serde(default)]
    pub odds_home: String,
    #[serde(default)]
    pub odds_draw: String,
    #[serde(default)]
    pub odds_away: String,
    #[serde(default)]
    pub avg_odds_home: String,
    #[serde(default)]
    pub avg_odds_draw: String,
    #[serde(default)]
    pub avg_odds_away: String,
    #[serde(default)]
    pub source: String,
}

impl CsvMatchRow {
    pub fn into_record(self, line: usize) -> Result<MatchRecord, HistoryError> {
        let invalid = |reason: String| HistoryError::InvalidRow { line, reason };

        let date = parse_date(&self.date).map_err(invalid)?;
        let home_goals = parse_goals(&self.home_goals).map_err(invalid)?;
        let away_goals = parse_goals(&self.away_goals).map_err(invalid)?;

        let derived = Outcome::from_goals(home_goals, away_goals);
        let outcome = if self.outcome.trim().is_empty() {
            derived
        } else {
            let recorded = self
                .outcome
                .parse::<Outcome>()
                .map_err(|e| invalid(e.to_string()))?;
            if recorded != derived {
                return Err(invalid(format!(
                    "outcome {} contradicts score {}-{}",
                    recorded, home_goals, away_goals
                )));
            }
            recorded
        };

        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            return Err(invalid("missing team name".to_string()));
        }

        let opt = |field: &str, name: &str| parse_optional(field).map_err(|e| invalid(format!("{}: {}", name, e)));

        Ok(MatchRecord {
            league: self.league,
            date,
            home_team: self.home_team,
            away_team: self.away_team,
            home_goals,
            away_goals,
            outcome,
            home: SideStats {
                shots: opt(&self.home_shots, "home_shots")?,
                shots_on_target: opt(&self.home_shots_target, "home_shots_target")?,
                corners: opt(&self.home_corners, "home_corners")?,
                yellows: opt(&self.home_yellows, "home_yellows")?,
            },
            away: SideStats {
                shots: opt(&self.away_shots, "away_shots")?,
                shots_on_target: opt(&self.away_shots_target, "away_shots_target")?,
                corners: opt(&self.away_corners, "away_corners")?,
                yellows: opt(&self.away_yellows, "away_yellows")?,
            },
            odds: BookOdds {
                home: opt(&self.odds_home, "odds_home")?,
                draw: opt(&self.odds_draw, "odds_draw")?,
                away: opt(&self.odds_away, "odds_away")?,
            },
            avg_odds: BookOdds {
                home: opt(&self.avg_odds_home, "avg_odds_home")?,
                draw: opt(&self.avg_odds_draw, "avg_odds_draw")?,
                away: opt(&self.avg_odds_away, "avg_odds_away")?,
            },
            source: self.source,
        })
    }
}

impl From<&MatchRecord> for CsvMatchRow {
    fn from(record: &MatchRecord) -> Self {
        Self {
            league: record.league.clone(),
            date: record.date.format(DATE_FORMAT).to_string(),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            home_goals: record.home_goals.to_string(),
            away_goals: record.away_goals.to_string(),
            outcome: record.outcome.as_str().to_string(),
            home_shots: format_optional(record.home.shots),
            away_shots: format_optional(record.away.shots),
            home_shots_target: format_optional(record.home.shots_on_target),
            away_shots_target: format_optional(record.away.shots_on_target),
            home_corners: format_optional(record.home.corners),
            away_corners: format_optional(record.away.corners),
            home_yellows: format_optional(record.home.yellows),
            away_yellows: format_optional(record.away.yellows),
            odds_home: format_optional(record.odds.home),
            odds_draw: format_optional(record.odds.draw),
            odds_away: format_optional(record.odds.away),
            avg_odds_home: format_optional(record.avg_odds.home),
            avg_odds_draw: format_optional(record.avg_odds.draw),
            avg_odds_away: format_optional(record.avg_odds.away),
            source: record.source.clone(),
        }
    }
}

/// Accepts `YYYY-MM-DD` with an optional trailing time component.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|e| format!("bad date '{}': {}", raw, e))
}

/// Accepts integral goal counts written as `2` or `2.0`.
fn parse_goals(raw: &str) -> Result<u16, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("bad goal count '{}'", raw))?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u16::MAX) {
        return Err(format!("bad goal count '{}'", raw));
    }
    Ok(value as u16)
}

fn parse_optional(raw: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("not a number: '{}'", raw))
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
