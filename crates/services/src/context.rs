use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use footy_db::{HistoryHandle, HistoryStore, MatchHistory};
use footy_ml::{FeatureEngineer, LogisticRegressionModel, Predictor};
use tracing::{info, warn};

use crate::football_data::{FootballDataClient, FootballDataConfig, MatchSource, SourceError};
use crate::predictor::PredictorService;
use crate::update_job::UpdateJob;
use crate::updater::{DatasetUpdater, DEFAULT_SEASON};

#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub history_path: PathBuf,
    pub model_dir: PathBuf,
    pub season: u16,
    /// `None` when no API key is configured; updates are then unavailable.
    pub football_data: Option<FootballDataConfig>,
}

impl ContextSettings {
    pub fn new(history_path: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Self {
        Self {
            history_path: history_path.into(),
            model_dir: model_dir.into(),
            season: DEFAULT_SEASON,
            football_data: None,
        }
    }

    /// Updater against the live API. Fails without a credential.
    pub fn dataset_updater(&self) -> Result<DatasetUpdater> {
        let config = self
            .football_data
            .clone()
            .ok_or(SourceError::MissingCredential)?;
        let client = FootballDataClient::new(config).context("failed to build football-data client")?;
        Ok(DatasetUpdater::new(Arc::new(client), HistoryStore::new(&self.history_path))
            .with_season(self.season))
    }
}

/// Everything the server needs, built once at start-up.
#[derive(Clone)]
pub struct AppContext {
    pub predictor: PredictorService,
    pub history: HistoryHandle,
    pub update_job: Option<UpdateJob>,
}

impl AppContext {
    /// Model artifacts first (with the feature schema check), then the table.
    /// Any failure aborts start-up.
    pub fn initialize(settings: &ContextSettings) -> Result<Self> {
        let model = LogisticRegressionModel::load(&settings.model_dir).with_context(|| {
            format!("failed to load model artifacts from {}", settings.model_dir.display())
        })?;
        let accuracy = model.reported_accuracy().map(str::to_string);
        let predictor = Predictor::new(Arc::new(model), FeatureEngineer::new())
            .context("model does not match the feature assembler")?;

        let store = HistoryStore::new(&settings.history_path);
        let history = store
            .load()
            .with_context(|| format!("failed to load match history from {}", store.path().display()))?;

        let source: Option<Arc<dyn MatchSource>> = match &settings.football_data {
            Some(config) => {
                let client = FootballDataClient::new(config.clone())
                    .context("failed to build football-data client")?;
                let client: Arc<dyn MatchSource> = Arc::new(client);
                Some(client)
            }
            None => {
                warn!("FOOTBALL_API_KEY is not set; dataset updates are disabled");
                None
            }
        };

        let context = Self::from_parts(predictor, accuracy, history, store, source, settings.season);
        info!(
            "Application context ready: model '{}', {} matches",
            context.predictor.model_name(),
            context.history.snapshot().len()
        );
        Ok(context)
    }

    pub fn from_parts(
        predictor: Predictor,
        model_accuracy: Option<String>,
        history: MatchHistory,
        store: HistoryStore,
        source: Option<Arc<dyn MatchSource>>,
        season: u16,
    ) -> Self {
        let history = HistoryHandle::new(history);
        let predictor = PredictorService::new(Arc::new(predictor), history.clone())
            .with_model_accuracy(model_accuracy);
        let update_job = source.map(|source| {
            let updater = DatasetUpdater::new(source, store).with_season(season);
            UpdateJob::new(Arc::new(updater), history.clone())
        });

        Self {
            predictor,
            history,
            update_job,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifacts_abort() {
        let dir = std::env::temp_dir().join(format!("footy-ctx-{}", uuid::Uuid::new_v4()));
        let settings = ContextSettings::new(dir.join("matches.csv"), dir.join("models"));
        let err = AppContext::initialize(&settings).err().unwrap();
        assert!(format!("{:#}", err).contains("model artifacts"));
    }

    #[test]
    fn test_updater_requires_credential() {
        let settings = ContextSettings::new("data/matches.csv", "models");
        let err = settings.dataset_updater().err().unwrap();
        assert!(err.to_string().contains("FOOTBALL_API_KEY"));

        let mut settings = settings;
        settings.football_data = Some(FootballDataConfig::new("token"));
        assert!(settings.dataset_updater().is_ok());
    }
}
