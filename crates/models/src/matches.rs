use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FootyError;

/// Full-time result of a match from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];

    pub fn from_goals(home_goals: u16, away_goals: u16) -> Self {
        match home_goals.cmp(&away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "HOME_WIN",
            Outcome::Draw => "DRAW",
            Outcome::AwayWin => "AWAY_WIN",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = FootyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "HOME_WIN" => Ok(Outcome::HomeWin),
            "DRAW" => Ok(Outcome::Draw),
            "AWAY_WIN" => Ok(Outcome::AwayWin),
            other => Err(FootyError::DataCorruption(format!(
                "unknown outcome label '{}'",
                other
            ))),
        }
    }
}

/// Per-side counting stats. All of them are nullable: API-sourced rows carry none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub shots: Option<f64>,
    pub shots_on_target: Option<f64>,
    pub corners: Option<f64>,
    pub yellows: Option<f64>,
}

/// Recorded 1X2 prices. Each leg may be missing independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookOdds {
    pub home: Option<f64>,
    pub draw: Option<f64>,
    pub away: Option<f64>,
}

/// One row of the historical match table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub league: String,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u16,
    pub away_goals: u16,
    pub outcome: Outcome,
    pub home: SideStats,
    pub away: SideStats,
    pub odds: BookOdds,
    pub avg_odds: BookOdds,
    pub source: String,
}

/// Identity of a fixture for deduplication: exact date and team names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
}

impl MatchRecord {
    pub fn new(
        league: String,
        date: NaiveDate,
        home_team: String,
        away_team: String,
        home_goals: u16,
        away_goals: u16,
        source: String,
    ) -> Self {
        Self {
            league,
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            outcome: Outcome::from_goals(home_goals, away_goals),
            home: SideStats::default(),
            away: SideStats::default(),
            odds: BookOdds::default(),
            avg_odds: BookOdds::default(),
            source,
        }
    }

    pub fn with_stats(mut self, home: SideStats, away: SideStats) -> Self {
        self.home = home;
        self.away = away;
        self
    }

    pub fn key(&self) -> MatchKey {
        MatchKey {
            date: self.date,
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn is_consistent(&self) -> bool {
        self.outcome == Outcome::from_goals(self.home_goals, self.away_goals)
    }
}
