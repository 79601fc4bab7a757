use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use footy_db::{HistoryStore, MatchHistory};
use footy_models::MatchRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::football_data::{parse_match, FetchOutcome, MatchSource};

pub const DEFAULT_SEASON: u16 = 2024;
/// Rows kept in a summary's `latest_added` list.
const LATEST_ADDED_LIMIT: usize = 5;

/// Upstream competition code and the league code stored in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Competition {
    pub code: &'static str,
    pub league: &'static str,
}

pub const COMPETITIONS: [Competition; 3] = [
    Competition { code: "PL", league: "E0" },
    Competition { code: "PD", league: "SP1" },
    Competition { code: "CL", league: "CL" },
];

/// Reported as the latest date when the table is empty.
pub fn epoch_floor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Fetched,
    AccessDenied,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompetitionReport {
    pub code: String,
    pub league: String,
    pub status: FetchStatus,
    pub fetched: usize,
    pub unfinished: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub added: usize,
    pub error: Option<String>,
}

impl CompetitionReport {
    fn new(competition: &Competition, status: FetchStatus) -> Self {
        Self {
            code: competition.code.to_string(),
            league: competition.league.to_string(),
            status,
            fetched: 0,
            unfinished: 0,
            malformed: 0,
            duplicates: 0,
            added: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub season: u16,
    pub previous_total: usize,
    pub latest_date_before: NaiveDate,
    pub competitions: Vec<CompetitionReport>,
    pub added: usize,
    pub total: usize,
    pub persisted: bool,
    pub latest_added: Vec<MatchRecord>,
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub summary: UpdateSummary,
    /// The new table, present only when rows were added and saved.
    pub history: Option<MatchHistory>,
}

/// Pulls finished matches for every configured competition and appends the
/// ones the table does not have yet.
pub struct DatasetUpdater {
    source: Arc<dyn MatchSource>,
    store: HistoryStore,
    season: u16,
    competitions: Vec<Competition>,
}

impl DatasetUpdater {
    pub fn new(source: Arc<dyn MatchSource>, store: HistoryStore) -> Self {
        Self {
            source,
            store,
            season: DEFAULT_SEASON,
            competitions: COMPETITIONS.to_vec(),
        }
    }

    pub fn with_season(mut self, season: u16) -> Self {
        self.season = season;
        self
    }

    pub fn with_competitions(mut self, competitions: Vec<Competition>) -> Self {
        self.competitions = competitions;
        self
    }

    /// Runs one update under the table's lock file. When the table exists on
    /// disk it is re-read under the lock and wins over `current`, so rows
    /// written by another process are kept.
    pub async fn run(&self, current: &MatchHistory) -> Result<UpdateOutcome> {
        let started_at = Utc::now();
        let store = self.store.clone();
        let (_lock, on_disk) = tokio::task::spawn_blocking(move || {
            let lock = store.lock()?;
            let table = if store.exists() { Some(store.load()?) } else { None };
            Ok::<_, footy_db::HistoryError>((lock, table))
        })
        .await
        .context("dataset lock task panicked")?
        .with_context(|| format!("failed to lock and read {}", self.store.path().display()))?;
        let current = on_disk.as_ref().unwrap_or(current);

        let latest_date_before = current.latest_date().unwrap_or_else(epoch_floor);
        info!(
            "Updating dataset: {} existing matches, latest {}",
            current.len(),
            latest_date_before
        );

        let mut seen = current.keys();
        let mut additions = Vec::new();
        let mut reports = Vec::with_capacity(self.competitions.len());

        for competition in &self.competitions {
            let report = match self.source.fetch_finished(competition.code, self.season).await {
                Ok(FetchOutcome::Matches(raw)) => {
                    let mut report = CompetitionReport::new(competition, FetchStatus::Fetched);
                    report.fetched = raw.len();
                    for value in &raw {
                        match parse_match(value, competition.league) {
                            Ok(Some(record)) => {
                                if seen.insert(record.key()) {
                                    additions.push(record);
                                    report.added += 1;
                                } else {
                                    report.duplicates += 1;
                                }
                            }
                            Ok(None) => report.unfinished += 1,
                            Err(e) => {
                                warn!("{}: skipping match: {}", competition.code, e);
                                report.malformed += 1;
                            }
                        }
                    }
                    info!(
                        "{}: {} fetched, {} new",
                        competition.code, report.fetched, report.added
                    );
                    report
                }
                Ok(FetchOutcome::AccessDenied) => {
                    warn!("{}: not available on this API tier", competition.code);
                    CompetitionReport::new(competition, FetchStatus::AccessDenied)
                }
                Err(e) => {
                    warn!("{}: fetch failed: {}", competition.code, e);
                    let mut report = CompetitionReport::new(competition, FetchStatus::Failed);
                    report.error = Some(e.to_string());
                    report
                }
            };
            reports.push(report);
        }

        let added = additions.len();
        let latest_added = additions
            .iter()
            .skip(added.saturating_sub(LATEST_ADDED_LIMIT))
            .cloned()
            .collect();

        let history = if additions.is_empty() {
            info!("Dataset already up to date");
            None
        } else {
            let updated = current.with_appended(additions);
            let store = self.store.clone();
            let updated = tokio::task::spawn_blocking(move || store.save(&updated).map(|_| updated))
                .await
                .context("dataset save task panicked")?
                .with_context(|| format!("failed to save {}", self.store.path().display()))?;
            info!("Added {} matches, table now holds {}", added, updated.len());
            Some(updated)
        };

        let summary = UpdateSummary {
            started_at,
            finished_at: Utc::now(),
            season: self.season,
            previous_total: current.len(),
            latest_date_before,
            competitions: reports,
            added,
            total: history.as_ref().map_or(current.len(), MatchHistory::len),
            persisted: history.is_some(),
            latest_added,
        };

        Ok(UpdateOutcome { summary, history })
    }
}
