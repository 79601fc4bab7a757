// Shared fixtures for the workspace integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use footy_api::{build_router, AppState};
use footy_db::HistoryStore;
use footy_ml::{FeatureEngineer, LogisticRegressionModel, Predictor};
use footy_services::{AppContext, BoxFuture, FetchOutcome, MatchSource, SourceError};
use serde_json::Value;
use tokio::sync::Semaphore;
use tower::ServiceExt;

/// Arsenal: home 2-0 win, then away 0-1 loss with missing shots on target.
pub const HISTORY_CSV: &str = "\
league,date,home_team,away_team,home_goals,away_goals,outcome,home_shots,away_shots,home_shots_target,away_shots_target,home_corners,away_corners,home_yellows,away_yellows,odds_home,odds_draw,odds_away,avg_odds_home,avg_odds_draw,avg_odds_away,source
E0,2024-08-17,Chelsea,Arsenal,1,0,HOME_WIN,12,9,5,,6,3,2,1,2.6,3.4,2.7,2.55,3.35,2.65,football_data_csv
E0,2024-08-10,Arsenal,Brighton,2,0,HOME_WIN,15,7,6,2,7,2,1,3,1.4,4.8,7.5,1.38,4.7,7.3,football_data_csv
SP1,2024-08-24,Girona,Sevilla,1,1,DRAW,10,11,4,4,5,5,2,2,2.1,3.3,3.6,2.05,3.25,3.5,football_data_csv
";

pub fn model_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("models")
}

/// Fresh directory holding a copy of [`HISTORY_CSV`].
pub fn temp_history() -> (HistoryStore, PathBuf) {
    let dir = std::env::temp_dir().join(format!("footy-it-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("combined_matches.csv");
    fs::write(&path, HISTORY_CSV).unwrap();
    (HistoryStore::new(path), dir)
}

pub fn load_predictor() -> (Predictor, Option<String>) {
    let model = LogisticRegressionModel::load(model_dir()).unwrap();
    let accuracy = model.reported_accuracy().map(str::to_string);
    (Predictor::new(Arc::new(model), FeatureEngineer::new()).unwrap(), accuracy)
}

pub fn test_context(source: Option<Arc<dyn MatchSource>>) -> (AppContext, HistoryStore, PathBuf) {
    let (store, dir) = temp_history();
    let (predictor, accuracy) = load_predictor();
    let history = store.load().unwrap();
    let context = AppContext::from_parts(predictor, accuracy, history, store.clone(), source, 2024);
    (context, store, dir)
}

pub fn test_app(source: Option<Arc<dyn MatchSource>>) -> (Router, AppContext, PathBuf) {
    let (context, _store, dir) = test_context(source);
    (build_router(AppState::from(context.clone())), context, dir)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// Upstream stand-in. Each competition answers with a fixed batch; with a
/// gate, every request waits for a semaphore permit first.
pub struct StubSource {
    pub batches: Vec<(&'static str, Vec<Value>)>,
    pub denied: Vec<&'static str>,
    pub gate: Option<Arc<Semaphore>>,
}

impl StubSource {
    pub fn new(batches: Vec<(&'static str, Vec<Value>)>) -> Self {
        Self {
            batches,
            denied: Vec::new(),
            gate: None,
        }
    }
}

impl MatchSource for StubSource {
    fn fetch_finished<'a>(
        &'a self,
        competition: &'a str,
        _season: u16,
    ) -> BoxFuture<'a, Result<FetchOutcome, SourceError>> {
        Box::pin(async move {
            if let Some(gate) = &self.gate {
                let _permit = gate.acquire().await;
            }
            if self.denied.iter().any(|code| *code == competition) {
                return Ok(FetchOutcome::AccessDenied);
            }
            let matches = self
                .batches
                .iter()
                .find(|(code, _)| *code == competition)
                .map(|(_, batch)| batch.clone())
                .unwrap_or_default();
            Ok(FetchOutcome::Matches(matches))
        })
    }
}

pub fn api_match(date: &str, home: &str, away: &str, home_goals: u16, away_goals: u16) -> Value {
    serde_json::json!({
        "utcDate": format!("{}T19:00:00Z", date),
        "status": "FINISHED",
        "homeTeam": {"name": home},
        "awayTeam": {"name": away},
        "score": {"fullTime": {"home": home_goals, "away": away_goals}}
    })
}

/// Polls `/admin/update-status` until no run is in progress.
pub async fn wait_for_update(app: &Router) -> Value {
    for _ in 0..200 {
        let (_, status) = get(app, "/admin/update-status").await;
        if status["running"].is_null() && !status["last_run"].is_null() {
            return status;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("update did not finish");
}
