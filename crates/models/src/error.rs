use thiserror::Error;

#[derive(Error, Debug)]
pub enum FootyError {
    #[error("Invalid {outcome} odds: {value}, decimal odds must be positive and finite")]
    InvalidOdds { outcome: &'static str, value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Team '{team}' not found")]
    TeamNotFound { team: String },

    #[error("Feature schema mismatch: assembler produces {expected:?}, model expects {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Model artifact error: {0}")]
    ModelArtifact(String),

    #[error("Model prediction failed: {reason}")]
    PredictionFailed { reason: String },

    #[error("Upstream data source unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Corrupt match record: {0}")]
    DataCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FootyError>;
