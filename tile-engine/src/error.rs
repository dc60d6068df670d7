use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum TileError {
    #[error("Schema fetch failed for connection {connection_id}: {message}")]
    SchemaFetchFailed {
        connection_id: String,
        message: String,
    },

    #[error("Failed to list connections: {message}")]
    ConnectionListFailed { message: String },

    #[error("Tile not found: {tile_id}")]
    TileNotFound { tile_id: String },

    #[error("Tile persistence failed: {message}")]
    PersistenceFailed { message: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::IoError {
            message: err.to_string(),
        }
    }
}

impl TileError {
    /// True for failures the editor can recover from by retrying the same
    /// action: network and backend errors, not local validation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TileError::SchemaFetchFailed { .. }
                | TileError::ConnectionListFailed { .. }
                | TileError::PersistenceFailed { .. }
                | TileError::HttpError(_)
        )
    }
}
