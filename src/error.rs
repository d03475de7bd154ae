//! Error types for the alt-scan crate

use thiserror::Error;

/// Result type for alt-scan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for alt-scan operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// URL source error (CSV, JSON, RSS inputs)
    #[error("Source error: {0}")]
    Source(String),

    /// Alt text generation error
    #[error("Generation error: {0}")]
    Generation(String),

    /// Missing credentials or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
