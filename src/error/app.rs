use thiserror::Error;

use super::{ConfigError, JobError, ResultsError, StatsError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("HTTP client error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Job error: {0}")]
    Job(#[from] JobError),
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("Results error: {0}")]
    Results(#[from] ResultsError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn job<E>(error: E) -> Self
    where
        E: Into<JobError>,
    {
        error.into().into()
    }

    pub fn stats<E>(error: E) -> Self
    where
        E: Into<StatsError>,
    {
        error.into().into()
    }

    pub fn results<E>(error: E) -> Self
    where
        E: Into<ResultsError>,
    {
        error.into().into()
    }

    /// Whether retrying the failed operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Job(err) => err.is_transient(),
            AppError::Reqwest { source } => source.is_connect() || source.is_timeout(),
            AppError::Io { .. }
            | AppError::Clap { .. }
            | AppError::Json { .. }
            | AppError::Validation(_)
            | AppError::Config(_)
            | AppError::Stats(_)
            | AppError::Results(_) => false,
        }
    }
}
