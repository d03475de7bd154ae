//! Error types for URL sources

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for reading URL inputs
#[derive(Debug, Error)]
pub enum SourceError {
    /// Input file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV input could not be parsed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON input could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV input lacks the URL column
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// Feed could not be fetched
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Feed XML could not be parsed
    #[error("Feed parsing error: {0}")]
    Feed(String),
}

impl From<CrateError> for SourceError {
    fn from(err: CrateError) -> Self {
        match err {
            CrateError::Io(e) => SourceError::Io(e),
            CrateError::Csv(e) => SourceError::Csv(e),
            CrateError::Json(e) => SourceError::Json(e),
            other => SourceError::Fetch(other.to_string()),
        }
    }
}

impl From<SourceError> for CrateError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Io(e) => CrateError::Io(e),
            SourceError::Csv(e) => CrateError::Csv(e),
            SourceError::Json(e) => CrateError::Json(e),
            other => CrateError::Source(other.to_string()),
        }
    }
}
