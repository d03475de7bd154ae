//! Error types for alt text generation

use std::time::Duration;

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for generation backends and the CSV batch
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A credential required by the selected backend is not set
    #[error("Missing environment variable {0}")]
    MissingCredential(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosted model rejected or failed the prompt
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// The backend answered with something unusable
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not finish in time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Text recognition failed
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// Filesystem or process error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input or output CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<GenerationError> for CrateError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::MissingCredential(name) => {
                CrateError::Config(format!("{} environment variable must be set", name))
            }
            GenerationError::Http(e) => CrateError::Http(e),
            GenerationError::Io(e) => CrateError::Io(e),
            GenerationError::Csv(e) => CrateError::Csv(e),
            other => CrateError::Generation(other.to_string()),
        }
    }
}
