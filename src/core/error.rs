use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LrsError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Authorization error: {0}")]
    AuthorizationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Store error: {0}")]
    StoreError(String),
}

impl LrsError {
    /// True for failures raised before anything touched the store.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LrsError::ValidationError(_) | LrsError::AuthorizationError(_)
        )
    }
}
