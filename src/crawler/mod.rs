//! Page discovery
//!
//! Two ways of turning a site into a list of page URLs: resolving its
//! sitemaps (including nested sitemap indexes) and, as a fallback, a
//! breadth-first crawl restricted to the seed origin. Both share the
//! auto-throttle and connectivity gate defined here.

mod config;
mod connectivity;
mod error;
mod frontier;
mod sitemap;
mod target;
mod throttle;

pub use config::{
    CrawlerConfig, CrawlerConfigBuilder, DEFAULT_SITEMAP_EXCLUDED_EXTENSIONS,
    DEFAULT_SKIPPED_LINK_EXTENSIONS, SitemapConfig,
};
pub use connectivity::ConnectivityGate;
pub use error::CrawlError;
pub use frontier::{Crawler, PageVisitState, extract_links};
pub use sitemap::{SitemapDocument, SitemapEntry, SitemapResolver, parse_sitemap};
pub use target::CrawlTarget;
pub use throttle::AutoThrottle;
