//! # alt-scan - image alt text auditing for websites
//!
//! This crate samples pages from a website, collects every visible image
//! with its accessibility metadata, reviews the alt text against WCAG 1.1.1
//! heuristics and writes a CSV report. A second stage fills in suggested alt
//! text for a report using a local model, a hosted LLM or OCR.
//!
//! ## Features
//!
//! - Page discovery from CSV, JSON, RSS/Atom feeds, sitemaps or a bare domain
//!   - Recursive sitemap indexes with a depth budget
//!   - Same-origin breadth-first crawl when no usable sitemap exists
//! - Auto-throttling fetch loop that pauses while the network is down
//! - Hidden image filtering (`hidden`, `aria-hidden`, inline styles)
//! - Per-image aggregation across pages with a fixed rule table review
//! - Alt text generation with retries and request rate limiting
//!
//! ## Example
//!
//! ```rust,no_run
//! use alt_scan::scan::{ScanConfig, Scanner};
//! use alt_scan::sources::UrlSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::builder()
//!         .sample_size(20)
//!         .output_dir("reports")
//!         .build();
//!
//!     let scanner = Scanner::new(config)?;
//!     let summary = scanner
//!         .run(&UrlSource::Domain("https://example.com".to_string()), None)
//!         .await?;
//!
//!     println!("Reviewed {} images", summary.records.len());
//!     Ok(())
//! }
//! ```

mod error;

pub mod aggregate;
pub mod analysis;
pub mod crawler;
pub mod extractor;
pub mod generation;
pub mod http;
pub mod progress;
pub mod report;
pub mod scan;
pub mod sources;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::generation::{BackendKind, GenerationBackend, TextGenerator};
    pub use crate::progress::{ProgressEvent, ProgressSender};
    pub use crate::scan::{ScanConfig, ScanSummary, Scanner};
    pub use crate::sources::UrlSource;
}
