//! Plain-text renderings for the command line.

use std::fmt::{self, Display, Formatter};

use footy_models::{FormSnapshot, MatchOdds, Outcome, PredictionResult};
use footy_services::UpdateSummary;

const RULE_WIDTH: usize = 52;

fn rule(f: &mut Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(RULE_WIDTH))
}

fn form_line(f: &mut Formatter<'_>, team: &str, form: &FormSnapshot) -> fmt::Result {
    writeln!(
        f,
        "     {:<22} W:{:.0}%  GF:{:.1}  GA:{:.1}  SOT:{:.1}",
        team,
        form.win_rate * 100.0,
        form.goals_for,
        form.goals_against,
        form.shots_on_target
    )
}

pub struct PredictionReport<'a> {
    result: &'a PredictionResult,
    odds: &'a MatchOdds,
}

pub fn prediction<'a>(result: &'a PredictionResult, odds: &'a MatchOdds) -> PredictionReport<'a> {
    PredictionReport { result, odds }
}

impl Display for PredictionReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let (result, odds) = (self.result, self.odds);
        let p = |outcome| result.probabilities.get(outcome) * 100.0;

        for (team, form) in [
            (&result.home_team, &result.home_form),
            (&result.away_team, &result.away_form),
        ] {
            if !form.has_history() {
                writeln!(f, "  Warning: '{}' not found in dataset - using defaults", team)?;
            }
        }

        rule(f)?;
        writeln!(f, "  {} vs {}", result.home_team, result.away_team)?;
        rule(f)?;
        writeln!(f, "  Home Win:  {:>5.1}%  (odds: {})", p(Outcome::HomeWin), odds.home)?;
        writeln!(f, "  Draw:      {:>5.1}%  (odds: {})", p(Outcome::Draw), odds.draw)?;
        writeln!(f, "  Away Win:  {:>5.1}%  (odds: {})", p(Outcome::AwayWin), odds.away)?;
        writeln!(
            f,
            "\n  Prediction:  {}  [{} confidence: {:.1}%]",
            result.prediction,
            result.confidence_tier.as_str(),
            result.confidence * 100.0
        )?;
        writeln!(f, "\n  Last 5 games:")?;
        form_line(f, &result.home_team, &result.home_form)?;
        form_line(f, &result.away_team, &result.away_form)
    }
}

pub struct FormReport<'a> {
    team: &'a str,
    form: &'a FormSnapshot,
}

pub fn form<'a>(team: &'a str, form: &'a FormSnapshot) -> FormReport<'a> {
    FormReport { team, form }
}

impl Display for FormReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let form = self.form;
        writeln!(f, "  {} (last {} matches)", self.team, form.matches_considered)?;
        writeln!(f, "    win rate       {:.3}", form.win_rate)?;
        writeln!(f, "    draw rate      {:.3}", form.draw_rate)?;
        writeln!(f, "    goals for      {:.2}", form.goals_for)?;
        writeln!(f, "    goals against  {:.2}", form.goals_against)?;
        writeln!(f, "    shots target   {:.2}", form.shots_on_target)?;
        writeln!(f, "    corners        {:.2}", form.corners)
    }
}

pub struct UpdateReport<'a>(&'a UpdateSummary);

pub fn update_summary(summary: &UpdateSummary) -> UpdateReport<'_> {
    UpdateReport(summary)
}

impl Display for UpdateReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        rule(f)?;
        writeln!(f, "  Football Predictor - Data Update")?;
        writeln!(f, "  {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        rule(f)?;
        writeln!(f, "  Existing matches: {}", summary.previous_total)?;
        writeln!(f, "  Latest match in dataset: {}", summary.latest_date_before)?;

        for report in &summary.competitions {
            write!(
                f,
                "  {:<3} {:<13} fetched {:>4}  new {:>4}",
                report.code,
                format!("{:?}", report.status),
                report.fetched,
                report.added
            )?;
            if let Some(error) = &report.error {
                write!(f, "  ({})", error)?;
            }
            writeln!(f)?;
        }

        if summary.added == 0 {
            return writeln!(f, "\n  Dataset already up to date! No new matches found.");
        }

        writeln!(f, "\n  Added {} new matches", summary.added)?;
        writeln!(f, "  Total dataset: {} matches", summary.total)?;
        writeln!(f, "\n  Latest matches added:")?;
        for record in &summary.latest_added {
            writeln!(
                f,
                "    {}  {} {}-{} {}",
                record.date, record.home_team, record.home_goals, record.away_goals, record.away_team
            )?;
        }
        Ok(())
    }
}
