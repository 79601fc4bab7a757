use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use footy_models::{round_to, FormSnapshot, MatchOdds, MatchRecord, Outcome, PredictionResult};
use footy_services::{AppContext, JobStatus, PredictorService, UpdateJob, UpdateJobError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_LATEST_MATCHES: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub predictor: PredictorService,
    pub update_job: Option<UpdateJob>,
}

impl From<AppContext> for AppState {
    fn from(context: AppContext) -> Self {
        Self {
            predictor: context.predictor,
            update_job: context.update_job,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub home_team: String,
    pub away_team: String,
    pub odds_home: f64,
    pub odds_draw: f64,
    pub odds_away: f64,
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub n: Option<usize>,
}

#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub accuracy: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub model: String,
    pub total_matches: usize,
}

#[derive(Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<String>,
    pub count: usize,
}

/// Rates rounded to 3 places, per-match averages to 2.
#[derive(Debug, Serialize)]
pub struct FormSummary {
    pub win_rate: f64,
    pub draw_rate: f64,
    pub goals_for: f64,
    pub goals_against: f64,
    pub shots_target: f64,
    pub corners: f64,
}

impl From<&FormSnapshot> for FormSummary {
    fn from(form: &FormSnapshot) -> Self {
        Self {
            win_rate: round_to(form.win_rate, 3),
            draw_rate: round_to(form.draw_rate, 3),
            goals_for: round_to(form.goals_for, 2),
            goals_against: round_to(form.goals_against, 2),
            shots_target: round_to(form.shots_on_target, 2),
            corners: round_to(form.corners, 2),
        }
    }
}

#[derive(Serialize)]
pub struct TeamFormResponse {
    pub team: String,
    pub last_5: FormSummary,
}

#[derive(Debug, Serialize)]
pub struct TeamForm {
    #[serde(flatten)]
    pub summary: FormSummary,
    pub matches_found: usize,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub home_team: String,
    pub away_team: String,
    pub prediction: Outcome,
    pub confidence: f64,
    pub confidence_label: String,
    pub prob_home_win: f64,
    pub prob_draw: f64,
    pub prob_away_win: f64,
    pub home_form: TeamForm,
    pub away_form: TeamForm,
}

impl From<PredictionResult> for PredictionResponse {
    fn from(result: PredictionResult) -> Self {
        let team_form = |form: &FormSnapshot| TeamForm {
            summary: FormSummary::from(form),
            matches_found: form.matches_considered,
        };

        Self {
            prob_home_win: round_to(result.probabilities.get(Outcome::HomeWin), 3),
            prob_draw: round_to(result.probabilities.get(Outcome::Draw), 3),
            prob_away_win: round_to(result.probabilities.get(Outcome::AwayWin), 3),
            confidence: round_to(result.confidence, 3),
            confidence_label: result.confidence_tier.as_str().to_string(),
            prediction: result.prediction,
            home_form: team_form(&result.home_form),
            away_form: team_form(&result.away_form),
            home_team: result.home_team,
            away_team: result.away_team,
        }
    }
}

#[derive(Serialize)]
pub struct DateRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total_matches: usize,
    pub leagues: BTreeMap<String, usize>,
    pub date_range: DateRange,
    pub model_accuracy: String,
    pub outcome_distribution: BTreeMap<Outcome, usize>,
}

#[derive(Serialize)]
pub struct UpdateStartedResponse {
    pub message: String,
    pub status: String,
    pub run_id: Uuid,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub enabled: bool,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct LatestMatch {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u16,
    pub away_goals: u16,
    pub outcome: Outcome,
    pub league: String,
}

impl From<&MatchRecord> for LatestMatch {
    fn from(record: &MatchRecord) -> Self {
        Self {
            date: record.date.to_string(),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            home_goals: record.home_goals,
            away_goals: record.away_goals,
            outcome: record.outcome,
            league: record.league.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct LatestMatchesResponse {
    pub matches: Vec<LatestMatch>,
    pub total_in_dataset: usize,
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/teams", get(list_teams))
        .route("/team/:team_name/form", get(team_form))
        .route("/predict", post(predict))
        .route("/stats", get(stats))
        // Dataset administration
        .route("/admin/update-data", post(trigger_update))
        .route("/admin/update-status", get(update_status))
        .route("/admin/latest-matches", get(latest_matches))
}

fn accuracy_label(state: &AppState) -> String {
    state
        .predictor
        .model_accuracy()
        .unwrap_or("unknown")
        .to_string()
}

async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Football Predictor API".to_string(),
        status: "running".to_string(),
        accuracy: accuracy_label(&state),
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.predictor.model_name().to_string(),
        total_matches: state.predictor.history().len(),
    })
}

async fn list_teams(State(state): State<AppState>) -> Json<TeamsResponse> {
    let teams = state.predictor.teams();
    Json(TeamsResponse {
        count: teams.len(),
        teams,
    })
}

async fn team_form(
    State(state): State<AppState>,
    Path(team_name): Path<String>,
) -> Result<Json<TeamFormResponse>, ApiError> {
    let form = state.predictor.team_form(&team_name)?;
    Ok(Json(TeamFormResponse {
        team: team_name,
        last_5: FormSummary::from(&form),
    }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload?;
    let odds = MatchOdds::new(request.odds_home, request.odds_draw, request.odds_away);

    let predictor = state.predictor.clone();
    let result = tokio::task::spawn_blocking(move || {
        predictor.predict(&request.home_team, &request.away_team, odds)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("prediction task failed: {}", e)))??;

    Ok(Json(PredictionResponse::from(result)))
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.predictor.stats();
    Json(StatsResponse {
        total_matches: stats.total_matches,
        leagues: stats.leagues,
        date_range: DateRange {
            from: stats.date_from.map(|d| d.to_string()),
            to: stats.date_to.map(|d| d.to_string()),
        },
        model_accuracy: accuracy_label(&state),
        outcome_distribution: stats.outcome_distribution,
    })
}

async fn trigger_update(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<UpdateStartedResponse>), ApiError> {
    let job = state.update_job.as_ref().ok_or_else(|| {
        ApiError::Unavailable("dataset updates are disabled: FOOTBALL_API_KEY is not set".to_string())
    })?;

    let ticket = job.trigger().map_err(|e| match e {
        UpdateJobError::AlreadyRunning(_) => ApiError::Conflict(e.to_string()),
    })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UpdateStartedResponse {
            message: "Data update started in background".to_string(),
            status: "running".to_string(),
            run_id: ticket.run_id,
        }),
    ))
}

async fn update_status(State(state): State<AppState>) -> Json<UpdateStatusResponse> {
    let status = state
        .update_job
        .as_ref()
        .map(UpdateJob::status)
        .unwrap_or_default();

    Json(UpdateStatusResponse {
        enabled: state.update_job.is_some(),
        status,
    })
}

async fn latest_matches(
    State(state): State<AppState>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> Result<Json<LatestMatchesResponse>, ApiError> {
    let Query(params) = params?;
    let (rows, total) = state
        .predictor
        .latest_matches(params.n.unwrap_or(DEFAULT_LATEST_MATCHES));

    Ok(Json(LatestMatchesResponse {
        matches: rows.iter().map(LatestMatch::from).collect(),
        total_in_dataset: total,
    }))
}
