//! Error types for glance

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GlanceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, GlanceError>;
