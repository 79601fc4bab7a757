//! Rolling team form over the most recent matches in the history table.

use footy_models::{FormSnapshot, MatchRecord, Outcome};

pub const DEFAULT_FORM_WINDOW: usize = 5;

/// Computes `team`'s form over its last `window` matches, home or away.
///
/// `history` must be sorted by date ascending. A team with no matches gets
/// [`FormSnapshot::league_average`]; callers tell the two apart through
/// `matches_considered`.
pub fn compute_form(team: &str, history: &[MatchRecord], window: usize) -> FormSnapshot {
    let mut recent: Vec<&MatchRecord> = history
        .iter()
        .rev()
        .filter(|record| record.involves(team))
        .take(window)
        .collect();
    recent.reverse();

    if recent.is_empty() {
        return FormSnapshot::league_average();
    }

    let mut wins = 0usize;
    let mut draws = 0usize;
    let mut goals_for = 0.0;
    let mut goals_against = 0.0;
    let mut shots_on_target = 0.0;
    let mut corners = 0.0;

    for record in &recent {
        let is_home = record.home_team == team;
        let (scored, conceded, side, win_outcome) = if is_home {
            (record.home_goals, record.away_goals, &record.home, Outcome::HomeWin)
        } else {
            (record.away_goals, record.home_goals, &record.away, Outcome::AwayWin)
        };

        goals_for += f64::from(scored);
        goals_against += f64::from(conceded);
        // Missing and zero counts both fall back to the prior.
        shots_on_target += stat_or_default(side.shots_on_target, FormSnapshot::DEFAULT_SHOTS_ON_TARGET);
        corners += stat_or_default(side.corners, FormSnapshot::DEFAULT_CORNERS);

        if record.outcome == win_outcome {
            wins += 1;
        } else if record.outcome == Outcome::Draw {
            draws += 1;
        }
    }

    let n = recent.len() as f64;
    FormSnapshot {
        win_rate: wins as f64 / n,
        draw_rate: draws as f64 / n,
        goals_for: goals_for / n,
        goals_against: goals_against / n,
        shots_on_target: shots_on_target / n,
        corners: corners / n,
        matches_considered: recent.len(),
    }
}

fn stat_or_default(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v != 0.0 => v,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use footy_models::SideStats;
    use proptest::prelude::*;

    fn record(day: u32, home: &str, away: &str, hg: u16, ag: u16) -> MatchRecord {
        MatchRecord::new(
            "E0".to_string(),
            NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            home.to_string(),
            away.to_string(),
            hg,
            ag,
            "test".to_string(),
        )
    }

    #[test]
    fn test_unknown_team_gets_league_average() {
        let history = vec![record(1, "A", "B", 1, 0)];
        assert_eq!(compute_form("Z", &history, 5), FormSnapshot::league_average());
        assert_eq!(compute_form("A", &[], 5), FormSnapshot::league_average());
    }

    #[test]
    fn test_win_and_away_loss_scenario() {
        let history = vec![record(1, "A", "B", 2, 0), record(8, "C", "A", 1, 0)];
        let form = compute_form("A", &history, DEFAULT_FORM_WINDOW);

        assert_eq!(form.matches_considered, 2);
        assert!((form.win_rate - 0.5).abs() < 1e-12);
        assert_eq!(form.draw_rate, 0.0);
        assert!((form.goals_for - 1.0).abs() < 1e-12);
        assert!((form.goals_against - 0.5).abs() < 1e-12);
        assert!((form.shots_on_target - 4.5).abs() < 1e-12);
        assert!((form.corners - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_window_takes_most_recent_matches() {
        let mut history: Vec<MatchRecord> = (1..=5).map(|d| record(d, "A", "B", 0, 1)).collect();
        history.extend((6..=10).map(|d| record(d, "B", "A", 0, 3)));

        let form = compute_form("A", &history, 5);
        assert_eq!(form.matches_considered, 5);
        assert_eq!(form.win_rate, 1.0);
        assert_eq!(form.goals_for, 3.0);
        assert_eq!(form.goals_against, 0.0);

        let short = compute_form("A", &history, 3);
        assert_eq!(short.matches_considered, 3);
    }

    #[test]
    fn test_sparse_team_scaled_by_actual_count() {
        let history = vec![record(1, "A", "B", 1, 1), record(2, "C", "D", 3, 0)];
        let form = compute_form("B", &history, 5);
        assert_eq!(form.matches_considered, 1);
        assert_eq!(form.draw_rate, 1.0);
        assert_eq!(form.win_rate, 0.0);
        assert_eq!(form.goals_for, 1.0);
    }

    #[test]
    fn test_side_stats_attributed_per_role() {
        let home_stats = SideStats {
            shots_on_target: Some(7.0),
            corners: Some(9.0),
            ..SideStats::default()
        };
        let away_stats = SideStats {
            shots_on_target: Some(2.0),
            corners: None,
            ..SideStats::default()
        };
        let history = vec![record(1, "A", "B", 1, 0).with_stats(home_stats, away_stats)];

        let a = compute_form("A", &history, 5);
        assert_eq!(a.shots_on_target, 7.0);
        assert_eq!(a.corners, 9.0);

        let b = compute_form("B", &history, 5);
        assert_eq!(b.shots_on_target, 2.0);
        // Missing per-match value falls back to the default.
        assert_eq!(b.corners, 5.0);
    }

    #[test]
    fn test_zero_stat_treated_as_missing() {
        let stats = SideStats {
            shots_on_target: Some(0.0),
            corners: Some(0.0),
            ..SideStats::default()
        };
        let history = vec![record(1, "A", "B", 0, 0).with_stats(stats.clone(), stats)];
        let form = compute_form("A", &history, 5);
        assert_eq!(form.shots_on_target, 4.5);
        assert_eq!(form.corners, 5.0);
    }

    #[test]
    fn test_win_counted_only_for_role_specific_outcome() {
        // Team A wins away: AWAY_WIN counts as a win for A, a loss for B.
        let history = vec![record(1, "B", "A", 0, 2)];
        assert_eq!(compute_form("A", &history, 5).win_rate, 1.0);
        assert_eq!(compute_form("B", &history, 5).win_rate, 0.0);
        assert_eq!(compute_form("B", &history, 5).draw_rate, 0.0);
    }

    proptest! {
        #[test]
        fn rates_stay_within_bounds(
            results in prop::collection::vec((0u16..6, 0u16..6, any::<bool>()), 1..20),
        ) {
            let history: Vec<MatchRecord> = results
                .iter()
                .enumerate()
                .map(|(i, (hg, ag, a_home))| {
                    let day = (i % 28) as u32 + 1;
                    if *a_home {
                        record(day, "A", "X", *hg, *ag)
                    } else {
                        record(day, "X", "A", *hg, *ag)
                    }
                })
                .collect();

            let form = compute_form("A", &history, DEFAULT_FORM_WINDOW);
            prop_assert!(form.matches_considered >= 1);
            prop_assert!(form.matches_considered <= DEFAULT_FORM_WINDOW);
            prop_assert!((0.0..=1.0).contains(&form.win_rate));
            prop_assert!((0.0..=1.0).contains(&form.draw_rate));
            prop_assert!(form.win_rate + form.draw_rate <= 1.0 + 1e-12);
            prop_assert!(form.goals_for >= 0.0);
            prop_assert!(form.goals_against >= 0.0);
        }
    }
}
