use config::{Config, ConfigError, Environment, File};
use footy_services::{ContextSettings, FootballDataConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub football_data: FootballDataSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub history_path: String,
    pub model_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootballDataSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub season: u16,
    pub request_delay_secs: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("data.history_path", "data/combined_matches.csv")?
            .set_default("data.model_dir", "models")?
            .set_default("football_data.base_url", footy_services::DEFAULT_BASE_URL)?
            .set_default("football_data.season", i64::from(footy_services::DEFAULT_SEASON))?
            .set_default("football_data.request_delay_secs", 7)?
            .set_default("football_data.timeout_secs", 30)?
            .set_default("football_data.max_retries", 3)?
            // Add in settings from configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables, e.g. FOOTY__SERVER__PORT
            .add_source(Environment::with_prefix("FOOTY").separator("__"))
            // The credential keeps its conventional name
            .set_override_option("football_data.api_key", env::var("FOOTBALL_API_KEY").ok())?
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Client settings, or `None` when no credential is configured.
    pub fn football_data_client(&self) -> Option<FootballDataConfig> {
        let settings = &self.football_data;
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())?;

        Some(FootballDataConfig {
            api_key: api_key.to_string(),
            base_url: settings.base_url.clone(),
            request_delay: Duration::from_secs(settings.request_delay_secs),
            timeout: Duration::from_secs(settings.timeout_secs),
            max_retries: settings.max_retries,
        })
    }

    pub fn context_settings(&self) -> ContextSettings {
        let mut settings = ContextSettings::new(&self.data.history_path, &self.data.model_dir);
        settings.season = self.football_data.season;
        settings.football_data = self.football_data_client();
        settings
    }
}
