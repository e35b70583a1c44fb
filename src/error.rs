use thiserror::Error;

use crate::ai::GenerationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Weather API error: {0}")]
    WeatherApi(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Draft not found: {0}")]
    DraftNotFound(i64),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Errors that stop a generation run outright. Everything else is
    /// absorbed by the pipeline and only shows up in the logs.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::MissingCredential(_) | AppError::Config(_) => true,
            AppError::Generation(e) => e.is_fatal(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProviderFailure;

    #[test]
    fn missing_credential_is_fatal() {
        assert!(AppError::MissingCredential("gemini_api_key").is_fatal());
    }

    #[test]
    fn weather_failure_is_recoverable() {
        assert!(!AppError::WeatherApi("HTTP 503".to_string()).is_fatal());
    }

    #[test]
    fn exhausted_generation_is_fatal() {
        let err = AppError::from(GenerationError::Exhausted(vec![ProviderFailure {
            provider: "gemini".to_string(),
            error: GenerationError::Timeout,
        }]));
        assert!(err.is_fatal());
    }
}
