//! # Crawler Configuration Module
//!
//! Configuration for the fallback link crawler and the sitemap resolver.
//! Both use a builder pattern; the defaults hold the bounds the scanner has
//! always shipped with.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: page budget, politeness delay and auto-throttle bounds
//! - `SitemapConfig`: recursion budget, URL cap and excluded file extensions

use std::time::Duration;

/// Extensions of links the crawler never follows
pub const DEFAULT_SKIPPED_LINK_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".jpg", ".jpeg",
    ".png", ".gif", ".svg", ".tiff", ".mp4", ".mp3", ".avi", ".mov",
];

/// Extensions of sitemap entries that are not HTML pages
pub const DEFAULT_SITEMAP_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".zip", ".rar", ".xlsx", ".ppt", ".pptx", ".xls", ".txt", ".rss",
    ".xml", ".json", ".csv", ".mp3", ".mp4", ".avi",
];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum number of HTML pages to accept
    pub max_pages: usize,

    /// Initial delay in seconds applied after every fetch attempt
    pub throttle_secs: u64,

    /// Consecutive failures tolerated before the delay starts growing
    pub error_threshold: u32,

    /// Upper bound in seconds for the auto-throttled delay
    pub max_throttle_secs: u64,

    /// Link path suffixes that are never enqueued
    pub skipped_link_extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 100,
            throttle_secs: 0,
            error_threshold: 5,
            max_throttle_secs: 10,
            skipped_link_extensions: DEFAULT_SKIPPED_LINK_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum number of pages to accept
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the initial delay between requests in seconds
    pub fn throttle_secs(mut self, throttle_secs: u64) -> Self {
        self.config.throttle_secs = throttle_secs;
        self
    }

    /// Set how many consecutive failures are tolerated before throttling
    pub fn error_threshold(mut self, error_threshold: u32) -> Self {
        self.config.error_threshold = error_threshold;
        self
    }

    /// Set the upper bound for the auto-throttled delay
    pub fn max_throttle_secs(mut self, max_throttle_secs: u64) -> Self {
        self.config.max_throttle_secs = max_throttle_secs;
        self
    }

    /// Set the link extensions that are never followed
    pub fn skipped_link_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.skipped_link_extensions = extensions;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the initial throttle as a Duration
    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    /// Whether a link path ends in one of the skipped extensions
    pub fn is_skipped_link(&self, path: &str) -> bool {
        ends_with_any(path, &self.skipped_link_extensions)
    }
}

/// Configuration for sitemap resolution
#[derive(Debug, Clone)]
pub struct SitemapConfig {
    /// Nesting levels of sitemap indexes that are followed
    pub depth_budget: u32,

    /// Resolution stops once more URLs than this have been collected
    pub max_urls: usize,

    /// Entry path suffixes that are dropped from URL sets
    pub excluded_extensions: Vec<String>,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            depth_budget: 3,
            max_urls: 50_000,
            excluded_extensions: DEFAULT_SITEMAP_EXCLUDED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl SitemapConfig {
    /// Set the URL cap
    pub fn with_max_urls(mut self, max_urls: usize) -> Self {
        self.max_urls = max_urls;
        self
    }

    /// Whether a sitemap entry should be dropped because of its extension
    pub fn is_excluded(&self, url: &str) -> bool {
        let path = url::Url::parse(url)
            .map(|parsed| parsed.path().to_string())
            .unwrap_or_else(|_| url.to_string());
        ends_with_any(&path, &self.excluded_extensions)
    }
}

fn ends_with_any(path: &str, extensions: &[String]) -> bool {
    let path = path.to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext.as_str()))
}
