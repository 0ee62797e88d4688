//! Error types for the studio client

use thiserror::Error;

/// Errors surfaced by the client library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a configuration message error
    pub fn config(message: impl Into<String>) -> Self {
        AppError::Config(config::ConfigError::Message(message.into()))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, AppError>;
