//! Unified error type for thermowatch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream decode error at byte {offset}: {message}")]
    Decode { offset: usize, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
