//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected status {status} for {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Sitemap XML could not be parsed
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrateError> for CrawlError {
    fn from(err: CrateError) -> Self {
        match err {
            CrateError::Http(e) => CrawlError::Http(e),
            CrateError::Url(e) => CrawlError::UrlParse(e),
            other => CrawlError::Other(other.to_string()),
        }
    }
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            CrawlError::UrlParse(e) => CrateError::Url(e),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
