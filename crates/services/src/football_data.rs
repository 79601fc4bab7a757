//! Client for the football-data.org v4 REST API.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use footy_db::parse_date;
use footy_models::{FootyError, MatchRecord};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.football-data.org/v4";
pub const AUTH_HEADER: &str = "X-Auth-Token";
pub const LIVE_SOURCE: &str = "api_live";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("football-data API key is not configured (set FOOTBALL_API_KEY)")]
    MissingCredential,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{competition}: upstream returned status {status}")]
    Status { competition: String, status: u16 },

    #[error("{competition}: gave up after {attempts} attempts: {last}")]
    Exhausted {
        competition: String,
        attempts: u32,
        last: String,
    },
}

impl From<SourceError> for FootyError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::MissingCredential => FootyError::Config(err.to_string()),
            other => FootyError::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Result of one competition request. A 403 is not an error: the free tier
/// simply does not cover every competition.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Matches(Vec<Value>),
    AccessDenied,
}

/// Anything that can list finished matches for a competition and season.
pub trait MatchSource: Send + Sync {
    fn fetch_finished<'a>(
        &'a self,
        competition: &'a str,
        season: u16,
    ) -> BoxFuture<'a, Result<FetchOutcome, SourceError>>;
}

#[derive(Debug, Clone)]
pub struct FootballDataConfig {
    pub api_key: String,
    pub base_url: String,
    /// Minimum spacing between two requests.
    pub request_delay: Duration,
    pub timeout: Duration,
    /// Total attempts per request, including the first one.
    pub max_retries: u32,
}

impl FootballDataConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_delay: Duration::from_secs(7),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

pub struct FootballDataClient {
    client: reqwest::Client,
    config: FootballDataConfig,
    last_request: Mutex<Option<Instant>>,
}

impl FootballDataClient {
    pub fn new(config: FootballDataConfig) -> Result<Self, SourceError> {
        if config.api_key.trim().is_empty() {
            return Err(SourceError::MissingCredential);
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.request_delay {
                tokio::time::sleep(self.config.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch(&self, competition: &str, season: u16) -> Result<FetchOutcome, SourceError> {
        let url = format!(
            "{}/competitions/{}/matches",
            self.config.base_url.trim_end_matches('/'),
            competition
        );
        let attempts = self.config.max_retries.max(1);
        let mut last_failure = String::new();

        for attempt in 0..attempts {
            self.wait_for_rate_limit().await;

            let sent = self
                .client
                .get(&url)
                .header(AUTH_HEADER, &self.config.api_key)
                .query(&[("season", season.to_string()), ("status", "FINISHED".to_string())])
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body: Value = response.json().await?;
                        let matches = body
                            .get("matches")
                            .and_then(Value::as_array)
                            .cloned()
                            .unwrap_or_default();
                        debug!("{}: {} finished matches", competition, matches.len());
                        return Ok(FetchOutcome::Matches(matches));
                    }
                    if status == reqwest::StatusCode::FORBIDDEN {
                        return Ok(FetchOutcome::AccessDenied);
                    }
                    if !(status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS) {
                        return Err(SourceError::Status {
                            competition: competition.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    last_failure = format!("status {}", status);
                }
                Err(e) => last_failure = e.to_string(),
            }

            warn!(
                "{}: request failed (attempt {}/{}): {}",
                competition,
                attempt + 1,
                attempts,
                last_failure
            );

            if attempt + 1 < attempts {
                tokio::time::sleep(self.config.request_delay * (attempt + 1)).await;
            }
        }

        Err(SourceError::Exhausted {
            competition: competition.to_string(),
            attempts,
            last: last_failure,
        })
    }
}

impl MatchSource for FootballDataClient {
    fn fetch_finished<'a>(
        &'a self,
        competition: &'a str,
        season: u16,
    ) -> BoxFuture<'a, Result<FetchOutcome, SourceError>> {
        Box::pin(self.fetch(competition, season))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    utc_date: String,
    home_team: ApiTeam,
    away_team: ApiTeam,
    #[serde(default)]
    score: ApiScore,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScore {
    #[serde(default)]
    full_time: ApiGoals,
}

#[derive(Debug, Default, Deserialize)]
struct ApiGoals {
    home: Option<i64>,
    away: Option<i64>,
}

/// Turns one raw API match into a table row. `Ok(None)` means the match has
/// no final score yet.
pub fn parse_match(raw: &Value, league: &str) -> footy_models::Result<Option<MatchRecord>> {
    let corrupt = |reason: String| FootyError::DataCorruption(reason);

    let parsed = ApiMatch::deserialize(raw).map_err(|e| corrupt(e.to_string()))?;

    let (home_goals, away_goals) = match (parsed.score.full_time.home, parsed.score.full_time.away) {
        (Some(h), Some(a)) => (goals(h).map_err(corrupt)?, goals(a).map_err(corrupt)?),
        _ => return Ok(None),
    };

    let date = parse_date(&parsed.utc_date).map_err(corrupt)?;
    let home_team = team_name(parsed.home_team, "homeTeam").map_err(corrupt)?;
    let away_team = team_name(parsed.away_team, "awayTeam").map_err(corrupt)?;

    Ok(Some(MatchRecord::new(
        league.to_string(),
        date,
        home_team,
        away_team,
        home_goals,
        away_goals,
        LIVE_SOURCE.to_string(),
    )))
}

fn goals(value: i64) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("bad goal count {}", value))
}

fn team_name(team: ApiTeam, field: &str) -> Result<String, String> {
    match team.name {
        Some(name) if !name.trim().is_empty() => Ok(name),
        _ => Err(format!("{}.name is missing", field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use footy_models::Outcome;
    use serde_json::json;

    fn raw(home: Value, away: Value) -> Value {
        json!({
            "utcDate": "2024-08-17T14:00:00Z",
            "status": "FINISHED",
            "homeTeam": {"id": 57, "name": "Arsenal FC"},
            "awayTeam": {"id": 76, "name": "Wolverhampton Wanderers FC"},
            "score": {"winner": "HOME_TEAM", "fullTime": {"home": home, "away": away}}
        })
    }

    #[test]
    fn test_parse_finished_match() {
        let record = parse_match(&raw(json!(2), json!(0)), "E0").unwrap().unwrap();
        assert_eq!(record.league, "E0");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 8, 17).unwrap());
        assert_eq!(record.home_team, "Arsenal FC");
        assert_eq!(record.away_team, "Wolverhampton Wanderers FC");
        assert_eq!(record.outcome, Outcome::HomeWin);
        assert_eq!(record.source, LIVE_SOURCE);
        assert_eq!(record.home.shots_on_target, None);
        assert_eq!(record.odds.home, None);
    }

    #[test]
    fn test_unfinished_match_dropped() {
        assert!(parse_match(&raw(Value::Null, Value::Null), "E0").unwrap().is_none());

        let mut no_score = raw(json!(1), json!(1));
        no_score.as_object_mut().unwrap().remove("score");
        assert!(parse_match(&no_score, "E0").unwrap().is_none());
    }

    #[test]
    fn test_malformed_match_is_corruption() {
        let bad_goals = raw(json!(-1), json!(0));
        assert!(matches!(
            parse_match(&bad_goals, "E0"),
            Err(FootyError::DataCorruption(_))
        ));

        let mut no_team = raw(json!(1), json!(0));
        no_team["homeTeam"] = json!({"id": 1, "name": null});
        assert!(matches!(
            parse_match(&no_team, "E0"),
            Err(FootyError::DataCorruption(_))
        ));

        let mut bad_date = raw(json!(1), json!(0));
        bad_date["utcDate"] = json!("yesterday");
        assert!(matches!(
            parse_match(&bad_date, "E0"),
            Err(FootyError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_client_requires_credential() {
        assert!(matches!(
            FootballDataClient::new(FootballDataConfig::new("  ")),
            Err(SourceError::MissingCredential)
        ));
        assert!(FootballDataClient::new(FootballDataConfig::new("token")).is_ok());
    }

    mod upstream {
        use crate::football_data::*;
        use axum::{
            extract::{Path, Query, State},
            http::{HeaderMap, StatusCode},
            response::{IntoResponse, Response},
            routing::get,
            Json, Router,
        };
        use parking_lot::Mutex;
        use serde_json::json;
        use std::collections::HashMap;
        use std::sync::Arc;

        const DELAY: Duration = Duration::from_millis(60);

        struct Seen {
            competition: String,
            token: Option<String>,
            query: HashMap<String, String>,
            at: Instant,
        }

        /// Local stand-in for football-data.org. `CL` is forbidden, `BAD` is
        /// rejected, `DOWN` always fails and `BUSY` is rate limited once.
        #[derive(Default)]
        struct Upstream {
            requests: Mutex<Vec<Seen>>,
        }

        impl Upstream {
            fn calls(&self, competition: &str) -> usize {
                self.requests
                    .lock()
                    .iter()
                    .filter(|seen| seen.competition == competition)
                    .count()
            }
        }

        async fn competition_matches(
            State(upstream): State<Arc<Upstream>>,
            Path(code): Path<String>,
            Query(query): Query<HashMap<String, String>>,
            headers: HeaderMap,
        ) -> Response {
            let token = headers
                .get(AUTH_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            upstream.requests.lock().push(Seen {
                competition: code.clone(),
                token,
                query,
                at: Instant::now(),
            });

            match code.as_str() {
                "CL" => StatusCode::FORBIDDEN.into_response(),
                "BAD" => StatusCode::BAD_REQUEST.into_response(),
                "DOWN" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
                "BUSY" if upstream.calls("BUSY") == 1 => StatusCode::TOO_MANY_REQUESTS.into_response(),
                _ => Json(json!({
                    "matches": [{
                        "utcDate": "2024-08-17T14:00:00Z",
                        "status": "FINISHED",
                        "homeTeam": {"name": "Arsenal FC"},
                        "awayTeam": {"name": "Wolverhampton Wanderers FC"},
                        "score": {"fullTime": {"home": 2, "away": 0}}
                    }]
                }))
                .into_response(),
            }
        }

        async fn start() -> (FootballDataClient, Arc<Upstream>) {
            let upstream = Arc::new(Upstream::default());
            let app = Router::new()
                .route("/v4/competitions/:code/matches", get(competition_matches))
                .with_state(upstream.clone());

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let config = FootballDataConfig {
                base_url: format!("http://{}/v4/", addr),
                request_delay: DELAY,
                timeout: Duration::from_secs(5),
                max_retries: 3,
                ..FootballDataConfig::new("test-token")
            };
            (FootballDataClient::new(config).unwrap(), upstream)
        }

        #[tokio::test]
        async fn test_fetch_sends_token_and_finished_filter() {
            let (client, upstream) = start().await;

            match client.fetch_finished("PL", 2024).await.unwrap() {
                FetchOutcome::Matches(matches) => {
                    assert_eq!(matches.len(), 1);
                    assert!(parse_match(&matches[0], "E0").unwrap().is_some());
                }
                FetchOutcome::AccessDenied => panic!("PL should be served"),
            }

            let requests = upstream.requests.lock();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].token.as_deref(), Some("test-token"));
            assert_eq!(requests[0].query.get("season").map(String::as_str), Some("2024"));
            assert_eq!(requests[0].query.get("status").map(String::as_str), Some("FINISHED"));
        }

        #[tokio::test]
        async fn test_forbidden_competition_is_access_denied() {
            let (client, upstream) = start().await;

            let outcome = client.fetch_finished("CL", 2024).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::AccessDenied));
            assert_eq!(upstream.calls("CL"), 1);
        }

        #[tokio::test]
        async fn test_client_error_is_not_retried() {
            let (client, upstream) = start().await;

            match client.fetch_finished("BAD", 2024).await {
                Err(SourceError::Status { competition, status }) => {
                    assert_eq!(competition, "BAD");
                    assert_eq!(status, 400);
                }
                other => panic!("expected a status error, got {:?}", other),
            }
            assert_eq!(upstream.calls("BAD"), 1);
        }

        #[tokio::test]
        async fn test_server_errors_retried_until_exhausted() {
            let (client, upstream) = start().await;

            match client.fetch_finished("DOWN", 2024).await {
                Err(SourceError::Exhausted { attempts, last, .. }) => {
                    assert_eq!(attempts, 3);
                    assert!(last.contains("503"));
                }
                other => panic!("expected exhaustion, got {:?}", other),
            }
            assert_eq!(upstream.calls("DOWN"), 3);
        }

        #[tokio::test]
        async fn test_rate_limited_request_recovers() {
            let (client, upstream) = start().await;

            let outcome = client.fetch_finished("BUSY", 2024).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Matches(ref m) if m.len() == 1));
            assert_eq!(upstream.calls("BUSY"), 2);
        }

        #[tokio::test]
        async fn test_requests_keep_minimum_spacing() {
            let (client, upstream) = start().await;

            for code in ["PL", "CL", "PD"] {
                client.fetch_finished(code, 2024).await.unwrap();
            }

            let requests = upstream.requests.lock();
            assert_eq!(requests.len(), 3);
            for pair in requests.windows(2) {
                let gap = pair[1].at.duration_since(pair[0].at);
                assert!(gap >= DELAY * 3 / 4, "requests only {:?} apart", gap);
            }
        }
    }
}
