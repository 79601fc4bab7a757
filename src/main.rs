mod config;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use footy_api::{build_router, AppState};
use footy_db::MatchHistory;
use footy_models::MatchOdds;
use footy_services::AppContext;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "footy-predictor", version, about = "Football match outcome predictor")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Fetch finished matches from football-data.org and append new ones
    UpdateData,
    /// Predict a single fixture from decimal odds
    Predict {
        home_team: String,
        away_team: String,
        odds_home: f64,
        odds_draw: f64,
        odds_away: f64,
    },
    /// Show a team's recent form
    Form { team: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "footy_predictor=debug,footy_services=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::new().context("failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::UpdateData => update_data(&config).await,
        Command::Predict {
            home_team,
            away_team,
            odds_home,
            odds_draw,
            odds_away,
        } => {
            let context = AppContext::initialize(&config.context_settings())?;
            let odds = MatchOdds::new(odds_home, odds_draw, odds_away);
            let result = context.predictor.predict(&home_team, &away_team, odds)?;
            println!("{}", report::prediction(&result, &odds));
            Ok(())
        }
        Command::Form { team } => {
            let context = AppContext::initialize(&config.context_settings())?;
            let form = context.predictor.team_form(&team)?;
            println!("{}", report::form(&team, &form));
            Ok(())
        }
    }
}

async fn serve(config: &AppConfig) -> Result<()> {
    info!("Starting Football Predictor API");
    info!("Dataset: {}", config.data.history_path);
    info!("Models: {}", config.data.model_dir);

    let context = AppContext::initialize(&config.context_settings())?;
    let app = build_router(AppState::from(context));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    Ok(())
}

/// Runs one update synchronously. Needs the API credential; the table may
/// not exist yet.
async fn update_data(config: &AppConfig) -> Result<()> {
    let settings = config.context_settings();
    let updater = settings.dataset_updater()?;

    // The updater reads the table itself once it holds the lock.
    let outcome = updater.run(&MatchHistory::default()).await?;

    println!("{}", report::update_summary(&outcome.summary));
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
