use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use footy_models::{MatchKey, MatchRecord, Outcome};
use parking_lot::RwLock;
use serde::Serialize;

/// Read-only, date-sorted match table.
#[derive(Debug, Clone, Default)]
pub struct MatchHistory {
    records: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryStats {
    pub total_matches: usize,
    pub leagues: BTreeMap<String, usize>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub outcome_distribution: BTreeMap<Outcome, usize>,
}

impl MatchHistory {
    /// Stable sort: rows sharing a date keep their input order.
    pub fn from_records(mut records: Vec<MatchRecord>) -> Self {
        records.sort_by_key(|record| record.date);
        Self { records }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|record| record.date)
    }

    /// The last `n` rows in table order.
    pub fn latest(&self, n: usize) -> &[MatchRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Distinct home and away team names, sorted.
    pub fn teams(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|record| [record.home_team.as_str(), record.away_team.as_str()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn keys(&self) -> HashSet<MatchKey> {
        self.records.iter().map(MatchRecord::key).collect()
    }

    /// New table with `additions` appended and re-sorted.
    pub fn with_appended(&self, additions: Vec<MatchRecord>) -> Self {
        let mut records = self.records.clone();
        records.extend(additions);
        Self::from_records(records)
    }

    pub fn stats(&self) -> HistoryStats {
        let mut leagues = BTreeMap::new();
        let mut outcome_distribution = BTreeMap::new();
        for record in &self.records {
            *leagues.entry(record.league.clone()).or_insert(0) += 1;
            *outcome_distribution.entry(record.outcome).or_insert(0) += 1;
        }

        HistoryStats {
            total_matches: self.records.len(),
            leagues,
            date_from: self.records.first().map(|record| record.date),
            date_to: self.latest_date(),
            outcome_distribution,
        }
    }
}

/// Shared pointer to the current table. Readers take a snapshot; the updater
/// swaps in a complete replacement.
#[derive(Debug, Clone, Default)]
pub struct HistoryHandle {
    current: Arc<RwLock<Arc<MatchHistory>>>,
}

impl HistoryHandle {
    pub fn new(history: MatchHistory) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(history))),
        }
    }

    pub fn snapshot(&self) -> Arc<MatchHistory> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, history: MatchHistory) {
        *self.current.write() = Arc::new(history);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(d: u32, league: &str, home: &str, away: &str, hg: u16, ag: u16) -> MatchRecord {
        MatchRecord::new(
            league.to_string(),
            NaiveDate::from_ymd_opt(2024, 9, d).unwrap(),
            home.to_string(),
            away.to_string(),
            hg,
            ag,
            "test".to_string(),
        )
    }

    fn sample() -> MatchHistory {
        MatchHistory::from_records(vec![
            record(14, "E0", "Arsenal", "Wolves", 2, 0),
            record(1, "SP1", "Girona", "Barcelona", 1, 4),
            record(14, "E0", "Chelsea", "Arsenal", 1, 1),
            record(7, "E0", "Wolves", "Chelsea", 0, 3),
        ])
    }

    #[test]
    fn test_records_sorted_stably() {
        let history = sample();
        let homes: Vec<&str> = history.records().iter().map(|r| r.home_team.as_str()).collect();
        assert_eq!(homes, vec!["Girona", "Wolves", "Arsenal", "Chelsea"]);
        assert_eq!(history.latest_date(), NaiveDate::from_ymd_opt(2024, 9, 14));
    }

    #[test]
    fn test_teams_sorted_and_distinct() {
        assert_eq!(
            sample().teams(),
            vec!["Arsenal", "Barcelona", "Chelsea", "Girona", "Wolves"]
        );
        assert!(MatchHistory::default().teams().is_empty());
    }

    #[test]
    fn test_latest() {
        let history = sample();
        assert_eq!(history.latest(2).len(), 2);
        assert_eq!(history.latest(2)[1].home_team, "Chelsea");
        assert_eq!(history.latest(100).len(), 4);
        assert!(history.latest(0).is_empty());
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();
        assert_eq!(stats.total_matches, 4);
        assert_eq!(stats.leagues.get("E0"), Some(&3));
        assert_eq!(stats.leagues.get("SP1"), Some(&1));
        assert_eq!(stats.date_from, NaiveDate::from_ymd_opt(2024, 9, 1));
        assert_eq!(stats.date_to, NaiveDate::from_ymd_opt(2024, 9, 14));
        assert_eq!(stats.outcome_distribution.get(&Outcome::AwayWin), Some(&2));
        assert_eq!(stats.outcome_distribution.get(&Outcome::Draw), Some(&1));

        let empty = MatchHistory::default().stats();
        assert_eq!(empty.total_matches, 0);
        assert_eq!(empty.date_from, None);
    }

    #[test]
    fn test_keys_and_append() {
        let history = sample();
        let key = record(14, "PL", "Arsenal", "Wolves", 0, 0).key();
        assert!(history.keys().contains(&key));

        let grown = history.with_appended(vec![record(3, "E0", "Fulham", "Leicester", 2, 1)]);
        assert_eq!(grown.len(), 5);
        assert_eq!(grown.records()[1].home_team, "Fulham");
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_handle_snapshot_isolation() {
        let handle = HistoryHandle::new(sample());
        let before = handle.snapshot();
        handle.replace(MatchHistory::default());

        assert_eq!(before.len(), 4);
        assert!(handle.snapshot().is_empty());
    }
}
