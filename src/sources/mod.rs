//! URL source resolution
//!
//! Turns one scan input (a CSV or JSON file, an RSS feed, a sitemap or a
//! bare domain) into the candidate page URLs to sample from. Failures are
//! logged and produce an empty list; the caller decides whether that is
//! fatal.

mod error;
mod feed;
mod files;

pub use error::SourceError;
pub use feed::parse_feed_links;
pub use files::{URL_COLUMN, parse_json_urls, read_csv_urls, read_json_urls};

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info, instrument, warn};

use crate::crawler::{CrawlTarget, Crawler, SitemapResolver};
use crate::http::HttpClient;
use crate::progress::ProgressSender;

/// Where page URLs come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    /// CSV file with a `URL` column
    Csv(PathBuf),

    /// JSON file with a URL list
    Json(PathBuf),

    /// RSS or Atom feed URL
    Rss(String),

    /// Sitemap or sitemap index URL
    Sitemap(String),

    /// Site root to discover
    Domain(String),
}

impl UrlSource {
    /// Short scan type label used in report names
    pub fn scan_type(&self) -> &'static str {
        match self {
            UrlSource::Csv(_) => "csv",
            UrlSource::Json(_) => "json",
            UrlSource::Rss(_) => "rss",
            UrlSource::Sitemap(_) => "sitemap",
            UrlSource::Domain(_) => "domain",
        }
    }

    /// The raw input as given on the command line
    pub fn input(&self) -> String {
        match self {
            UrlSource::Csv(path) | UrlSource::Json(path) => path.display().to_string(),
            UrlSource::Rss(url) | UrlSource::Sitemap(url) | UrlSource::Domain(url) => url.clone(),
        }
    }

    /// Site the scanned pages belong to, when known
    ///
    /// Page references in the report are made relative to this.
    pub fn base_domain(&self) -> Option<&str> {
        match self {
            UrlSource::Domain(url) => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for UrlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scan_type(), self.input())
    }
}

/// Resolves a [`UrlSource`] into page URLs
#[derive(Debug, Clone)]
pub struct SourceResolver {
    client: HttpClient,
    sitemaps: SitemapResolver,
    crawler: Crawler,
    crawl_only: bool,
    min_sitemap_urls: usize,
}

impl SourceResolver {
    /// Create a resolver
    pub fn new(client: HttpClient, sitemaps: SitemapResolver, crawler: Crawler) -> Self {
        Self {
            client,
            sitemaps,
            crawler,
            crawl_only: false,
            min_sitemap_urls: 1,
        }
    }

    /// Skip sitemap discovery for domains
    pub fn with_crawl_only(mut self, crawl_only: bool) -> Self {
        self.crawl_only = crawl_only;
        self
    }

    /// Fewest sitemap URLs accepted before falling back to crawling
    pub fn with_min_sitemap_urls(mut self, min_sitemap_urls: usize) -> Self {
        self.min_sitemap_urls = min_sitemap_urls;
        self
    }

    /// Resolve a source into candidate page URLs
    #[instrument(skip(self, source, progress), fields(source = %source))]
    pub async fn resolve(&self, source: &UrlSource, progress: Option<&ProgressSender>) -> Vec<String> {
        let urls = match source {
            UrlSource::Csv(path) => log_failure(source, read_csv_urls(path)),
            UrlSource::Json(path) => log_failure(source, read_json_urls(path)),
            UrlSource::Rss(url) => log_failure(source, self.feed_links(url).await),
            UrlSource::Sitemap(url) => self.sitemaps.resolve(url).await.into_iter().collect(),
            UrlSource::Domain(domain) => self.discover_domain(domain, progress).await,
        };

        info!("Extracted {} URLs from {}", urls.len(), source.scan_type());
        urls
    }

    async fn feed_links(&self, url: &str) -> Result<Vec<String>, SourceError> {
        let page = self.client.get(url).await?;
        if !page.status.is_success() {
            return Err(SourceError::Fetch(format!(
                "HTTP status {} for {}",
                page.status.as_u16(),
                url
            )));
        }
        parse_feed_links(&page.body)
    }

    async fn discover_domain(&self, domain: &str, progress: Option<&ProgressSender>) -> Vec<String> {
        if self.crawl_only {
            info!("Starting direct crawl for {} without checking sitemap", domain);
            return self.crawl(domain, progress).await;
        }

        let target = match CrawlTarget::parse(domain) {
            Ok(target) => target,
            Err(e) => {
                error!("Invalid domain {}: {}", domain, e);
                return Vec::new();
            }
        };
        let urls: Vec<String> = match target.sitemap_url() {
            Some(sitemap_url) => {
                info!("Trying to parse sitemap: {}", sitemap_url);
                self.sitemaps
                    .resolve(sitemap_url.as_str())
                    .await
                    .into_iter()
                    .collect()
            }
            None => Vec::new(),
        };
        info!("Found {} URLs in sitemap", urls.len());

        if urls.len() < self.min_sitemap_urls {
            warn!(
                "Sitemap not found or too small. Falling back to crawling {}",
                domain
            );
            return self.crawl(domain, progress).await;
        }
        urls
    }

    async fn crawl(&self, domain: &str, progress: Option<&ProgressSender>) -> Vec<String> {
        match self.crawler.crawl_site(domain, progress).await {
            Ok(urls) => urls,
            Err(e) => {
                error!("Could not crawl {}: {}", domain, e);
                Vec::new()
            }
        }
    }
}

fn log_failure(source: &UrlSource, result: Result<Vec<String>, SourceError>) -> Vec<String> {
    result.unwrap_or_else(|e| {
        error!("Error reading {}: {}", source, e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ConnectivityGate, CrawlerConfig, SitemapConfig};
    use mockito::Server;

    fn resolver() -> SourceResolver {
        let client = HttpClient::new().unwrap();
        SourceResolver::new(
            client.clone(),
            SitemapResolver::new(client.clone(), SitemapConfig::default()),
            Crawler::new(
                client,
                CrawlerConfig::builder().max_pages(10).build(),
                ConnectivityGate::disabled(),
            ),
        )
    }

    #[test]
    fn test_scan_type_and_input() {
        let source = UrlSource::Json(PathBuf::from("data/pages.json"));
        assert_eq!(source.scan_type(), "json");
        assert_eq!(source.input(), "data/pages.json");
        assert_eq!(source.base_domain(), None);

        let domain = UrlSource::Domain("https://example.com".to_string());
        assert_eq!(domain.base_domain(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_missing_file_resolves_to_nothing() {
        let urls = resolver()
            .resolve(&UrlSource::Csv(PathBuf::from("/nonexistent/urls.csv")), None)
            .await;
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn test_rss_source() {
        let mut server = Server::new_async().await;
        let _feed = server
            .mock("GET", "/feed.xml")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body("<rss><channel><item><link>https://example.com/a</link></item></channel></rss>")
            .create_async()
            .await;

        let urls = resolver()
            .resolve(&UrlSource::Rss(format!("{}/feed.xml", server.url())), None)
            .await;
        assert_eq!(urls, vec!["https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_domain_uses_sitemap_when_present() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_header("content-type", "application/xml")
            .with_body(format!(
                r#"<?xml version="1.0"?><urlset><url><loc>{base}/a</loc></url></urlset>"#
            ))
            .create_async()
            .await;
        let home = server.mock("GET", "/").expect(0).create_async().await;

        let urls = resolver().resolve(&UrlSource::Domain(base.clone()), None).await;

        assert_eq!(urls, vec![format!("{}/a", base)]);
        home.assert_async().await;
    }

    #[tokio::test]
    async fn test_domain_with_path_uses_root_sitemap() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let root_sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(200)
            .with_body(format!(
                r#"<?xml version="1.0"?><urlset><url><loc>{base}/blog/post</loc></url></urlset>"#
            ))
            .expect(1)
            .create_async()
            .await;
        let nested_sitemap = server
            .mock("GET", "/blog/sitemap.xml")
            .expect(0)
            .create_async()
            .await;

        let urls = resolver()
            .resolve(&UrlSource::Domain(format!("{}/blog/", base)), None)
            .await;

        assert_eq!(urls, vec![format!("{}/blog/post", base)]);
        root_sitemap.assert_async().await;
        nested_sitemap.assert_async().await;
    }

    #[tokio::test]
    async fn test_domain_falls_back_to_crawl() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let _sitemap = server
            .mock("GET", "/sitemap.xml")
            .with_status(404)
            .create_async()
            .await;
        let _home = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(r#"<a href="/about">About</a>"#)
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p>About us</p>")
            .create_async()
            .await;

        let urls = resolver()
            .resolve(&UrlSource::Domain(format!("{}/", base)), None)
            .await;

        assert_eq!(urls, vec![format!("{}/", base), format!("{}/about", base)]);
    }

    #[tokio::test]
    async fn test_crawl_only_skips_sitemap() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let sitemap = server
            .mock("GET", "/sitemap.xml")
            .expect(0)
            .create_async()
            .await;
        let _home = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p>Home</p>")
            .create_async()
            .await;

        let urls = resolver()
            .with_crawl_only(true)
            .resolve(&UrlSource::Domain(format!("{}/", base)), None)
            .await;

        assert_eq!(urls.len(), 1);
        sitemap.assert_async().await;
    }
}
