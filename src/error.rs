//! Error types for wattcast.

use thiserror::Error;

/// Result type alias for wattcast operations.
pub type Result<T> = std::result::Result<T, WattcastError>;

/// Errors that can occur in wattcast.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WattcastError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid configuration file.
    #[error("invalid config file: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Dataset error.
    #[error("dataset error: {0}")]
    Data(String),

    /// Training error.
    #[error("training error: {0}")]
    Training(String),

    /// Checkpoint error.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Visualization error.
    #[error("visualization error: {0}")]
    Viz(String),

    /// Logging setup error.
    #[error("logging error: {0}")]
    Logging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Candle error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),

    /// Progress bar template error.
    #[error("template error: {0}")]
    Template(String),
}

impl From<indicatif::style::TemplateError> for WattcastError {
    fn from(err: indicatif::style::TemplateError) -> Self {
        WattcastError::Template(err.to_string())
    }
}
