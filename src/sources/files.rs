//! URL lists stored in local files

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::error::SourceError;

/// Column holding page URLs in CSV inputs
pub const URL_COLUMN: &str = "URL";

/// Accepted JSON layouts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonUrlList {
    /// `["https://...", ...]`
    List(Vec<serde_json::Value>),

    /// `{"urls": ["https://...", ...]}`
    Object { urls: Vec<serde_json::Value> },
}

/// Read the `URL` column of a CSV file, skipping empty cells
pub fn read_csv_urls(path: &Path) -> Result<Vec<String>, SourceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == URL_COLUMN)
        .ok_or_else(|| SourceError::MissingColumn(URL_COLUMN.to_string()))?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(column).map(str::trim) {
            Some(url) if !url.is_empty() => urls.push(url.to_string()),
            _ => debug!("Skipping row without URL"),
        }
    }
    Ok(urls)
}

/// Parse a JSON URL list
///
/// Accepts a bare array or an object with a `urls` array. Non-string entries
/// are ignored.
pub fn parse_json_urls(body: &str) -> Result<Vec<String>, SourceError> {
    let values = match serde_json::from_str::<JsonUrlList>(body)? {
        JsonUrlList::List(values) | JsonUrlList::Object { urls: values } => values,
    };

    let total = values.len();
    let urls: Vec<String> = values
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(url) => Some(url),
            _ => None,
        })
        .collect();

    if urls.len() < total {
        warn!("Ignored {} non-string entries in JSON input", total - urls.len());
    }
    Ok(urls)
}

/// Read a JSON URL list from a file
pub fn read_json_urls(path: &Path) -> Result<Vec<String>, SourceError> {
    let body = std::fs::read_to_string(path)?;
    parse_json_urls(&body)
}
