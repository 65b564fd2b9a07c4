//! Error types for credicheck

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrediError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A Site exists without its Tally (or the reverse). Never repaired.
    #[error("Inconsistent state: {0}")]
    Inconsistent(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<diesel::r2d2::PoolError> for CrediError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        CrediError::Pool(e.to_string())
    }
}
