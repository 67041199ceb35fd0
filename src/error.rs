// Error types for the orbital engine and its data source

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status: {0}")]
    Status(u16),

    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("Unknown body: {0}")]
    UnknownBody(String),

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
