//! HTTP client shared by the sitemap resolver, crawler and image extractor
//!
//! Every request goes out with a browser-like header set because a number of
//! government and CMS-hosted sites reject clients that do not identify
//! themselves. Each request kind has its own timeout: page and sitemap
//! fetches are bounded by `page_timeout`, HEAD probes by `probe_timeout`.

use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client as ReqwestClient, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// User agent presented to crawled sites
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

/// Accept header presented to crawled sites
pub const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Default timeout for page and sitemap fetches in seconds
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 10;

/// Default timeout for HEAD probes in seconds
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Options for building an [`HttpClient`]
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// User agent sent with every request
    pub user_agent: String,

    /// Timeout for GET requests
    pub page_timeout: Duration,

    /// Timeout for HEAD probes
    pub probe_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

/// A fetched document with the parts of the response the pipeline cares about
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status of the response
    pub status: StatusCode,

    /// Lower-cased `Content-Type` header, if any
    pub content_type: Option<String>,

    /// Response body decoded as text
    pub body: String,
}

impl FetchedPage {
    /// Whether the response declared an HTML body
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_html_content_type)
    }
}

/// HTTP client for crawling target sites
#[derive(Clone, Debug)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Timeout for GET requests
    page_timeout: Duration,

    /// Timeout for HEAD probes
    probe_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with default options
    pub fn new() -> Result<Self> {
        Self::with_options(HttpOptions::default())
    }

    /// Create a new HTTP client with custom options
    pub fn with_options(options: HttpOptions) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));

        let client = ReqwestClient::builder()
            .user_agent(options.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            page_timeout: options.page_timeout,
            probe_timeout: options.probe_timeout,
        })
    }

    /// Fetch a document with a GET request
    ///
    /// Non-success statuses are returned as data; only transport failures
    /// (connection errors, timeouts, undecodable bodies) are errors.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, url: &str) -> Result<FetchedPage> {
        self.get_with_referer(url, None).await
    }

    /// Fetch a sitemap, sending the sitemap URL itself as the referer
    #[instrument(skip(self), level = "debug")]
    pub async fn get_sitemap(&self, url: &str) -> Result<FetchedPage> {
        self.get_with_referer(url, Some(url)).await
    }

    async fn get_with_referer(&self, url: &str, referer: Option<&str>) -> Result<FetchedPage> {
        let mut request = self.client.get(url).timeout(self.page_timeout);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        debug!("Sending GET request to {}", url);
        let response = request.send().await.map_err(Error::Http)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = content_type_of(response.headers());
        let body = response.text().await.map_err(Error::Http)?;

        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }

    /// Determine the content type of a URL without downloading it
    ///
    /// Issues a HEAD request following redirects. When the server omits the
    /// `Content-Type` header a GET is issued to read it instead.
    #[instrument(skip(self), level = "debug")]
    pub async fn probe_content_type(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await?;

        if let Some(content_type) = content_type_of(response.headers()) {
            return Ok(Some(content_type));
        }

        debug!("No Content-Type on HEAD for {}, falling back to GET", url);
        let response = self
            .client
            .get(url)
            .timeout(self.page_timeout)
            .send()
            .await?;
        Ok(content_type_of(response.headers()))
    }

    /// Whether a URL serves an HTML document
    ///
    /// Probe failures count as "not HTML".
    pub async fn is_html_url(&self, url: &str) -> bool {
        match self.probe_content_type(url).await {
            Ok(Some(content_type)) if is_html_content_type(&content_type) => true,
            Ok(content_type) => {
                debug!(
                    "Skipping non-HTML content: {} ({})",
                    url,
                    content_type.unwrap_or_default()
                );
                false
            }
            Err(e) => {
                warn!("Error checking content type for {}: {}", url, e);
                false
            }
        }
    }

    /// Read the size of a resource in bytes from its `Content-Length`
    ///
    /// Size is best-effort: any failure yields 0.
    #[instrument(skip(self), level = "debug")]
    pub async fn probe_size(&self, url: &str) -> u64 {
        let response = match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!("Failed to fetch metadata for {}: {}", url, e);
                return 0;
            }
        };

        if !response.status().is_success() {
            return 0;
        }

        // The header is read directly: `Response::content_length` reports the
        // (empty) body of a HEAD response rather than the advertised size.
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0)
    }

}

/// Whether a `Content-Type` value denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/html")
}

fn content_type_of(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_is_html_content_type() {
        assert!(is_html_content_type("text/html"));
        assert!(is_html_content_type("Text/HTML; charset=utf-8"));
        assert!(!is_html_content_type("application/xhtml+xml"));
        assert!(!is_html_content_type("image/png"));
        assert!(!is_html_content_type(""));
    }

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>hello</body></html>")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let page = client.get(&format!("{}/page", server.url())).await.unwrap();

        assert_eq!(page.status, StatusCode::OK);
        assert!(page.is_html());
        assert!(page.body.contains("hello"));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_sitemap_sends_referer() {
        let mut server = Server::new_async().await;
        let url = format!("{}/sitemap.xml", server.url());
        let mock = server
            .mock("GET", "/sitemap.xml")
            .match_header("referer", url.as_str())
            .with_status(200)
            .with_body("<urlset></urlset>")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let page = client.get_sitemap(&url).await.unwrap();
        assert_eq!(page.status, StatusCode::OK);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_is_html_url_uses_head() {
        let mut server = Server::new_async().await;
        let html = server
            .mock("HEAD", "/article")
            .with_status(200)
            .with_header("content-type", "text/html")
            .create_async()
            .await;
        let pdf = server
            .mock("HEAD", "/report.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        assert!(client.is_html_url(&format!("{}/article", server.url())).await);
        assert!(!client.is_html_url(&format!("{}/report.pdf", server.url())).await);

        html.assert_async().await;
        pdf.assert_async().await;
    }

    #[tokio::test]
    async fn test_is_html_url_falls_back_to_get_without_content_type() {
        let mut server = Server::new_async().await;
        let head = server
            .mock("HEAD", "/untyped")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/untyped")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html></html>")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        assert!(client.is_html_url(&format!("{}/untyped", server.url())).await);

        head.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_size_failure_is_zero() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("HEAD", "/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        assert_eq!(
            client.probe_size(&format!("{}/missing.png", server.url())).await,
            0
        );
        assert_eq!(client.probe_size("http://127.0.0.1:1/unreachable.png").await, 0);
    }
}
