//! Page image extraction
//!
//! Fetches one page at a time, pulls its `<img>` elements with their
//! accessibility attributes and probes each accepted image for its size.

mod html;
mod visibility;

pub use html::{SUPPORTED_IMAGE_EXTENSIONS, has_supported_extension, parse_images};
pub use visibility::{is_hidden_element, is_hidden_image, style_hides};

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::crawler::ConnectivityGate;
use crate::http::HttpClient;

/// One observation of an image element on one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSighting {
    /// Absolute image URL
    pub image_url: String,

    /// Page the image was found on
    pub page_url: String,

    /// `alt` attribute, `None` when absent
    pub alt_text: Option<String>,

    /// `title` attribute
    pub title: Option<String>,

    /// `longdesc` attribute
    pub longdesc: Option<String>,

    /// `aria-label` attribute
    pub aria_label: Option<String>,

    /// Text of the elements referenced by `aria-describedby`
    pub aria_describedby_text: Option<String>,

    /// Advertised size of the image resource in bytes, 0 if unknown
    pub size_bytes: u64,
}

/// Result of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page is not HTML; it neither counts as processed nor as an error
    Skipped,

    /// The page could not be fetched
    Failed(String),

    /// The page was processed
    Extracted(Vec<ImageSighting>),
}

impl PageOutcome {
    /// Whether the page counts towards the processed sample
    pub fn is_processed(&self) -> bool {
        !matches!(self, PageOutcome::Skipped)
    }
}

/// Fetches pages and turns them into image sightings
#[derive(Debug, Clone)]
pub struct PageImageExtractor {
    client: HttpClient,
    gate: ConnectivityGate,
}

impl PageImageExtractor {
    /// Create an extractor
    pub fn new(client: HttpClient, gate: ConnectivityGate) -> Self {
        Self { client, gate }
    }

    /// Extract the images of one page
    ///
    /// The page is pre-checked with a HEAD request and skipped unless it
    /// serves HTML. Each accepted image is then probed for its size.
    #[instrument(skip(self))]
    pub async fn extract_images(&self, page_url: &str) -> PageOutcome {
        self.gate.wait_until_online().await;

        if !self.client.is_html_url(page_url).await {
            return PageOutcome::Skipped;
        }

        let page = match self.client.get(page_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Error processing {}: {}", page_url, e);
                return PageOutcome::Failed(e.to_string());
            }
        };

        if page.status != StatusCode::OK {
            warn!("Non-200 status code for {}: {}", page_url, page.status);
            return PageOutcome::Failed(format!("HTTP status {}", page.status.as_u16()));
        }
        if !page.is_html() {
            debug!("Skipping non-HTML response for {}", page_url);
            return PageOutcome::Skipped;
        }

        let base = match Url::parse(&page.url) {
            Ok(base) => base,
            Err(e) => return PageOutcome::Failed(e.to_string()),
        };

        let mut sightings = parse_images(&base, &page.body);
        debug!("Found {} images on {}", sightings.len(), page_url);

        for sighting in &mut sightings {
            sighting.page_url = page_url.to_string();
            sighting.size_bytes = self.client.probe_size(&sighting.image_url).await;
        }

        PageOutcome::Extracted(sightings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn extractor() -> PageImageExtractor {
        PageImageExtractor::new(HttpClient::new().unwrap(), ConnectivityGate::disabled())
    }

    #[tokio::test]
    async fn test_non_html_page_is_skipped_without_get() {
        let mut server = Server::new_async().await;
        let _head = server
            .mock("HEAD", "/report.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .create_async()
            .await;
        let get = server
            .mock("GET", "/report.pdf")
            .expect(0)
            .create_async()
            .await;

        let outcome = extractor()
            .extract_images(&format!("{}/report.pdf", server.url()))
            .await;

        assert_eq!(outcome, PageOutcome::Skipped);
        assert!(!outcome.is_processed());
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_200_page_fails() {
        let mut server = Server::new_async().await;
        let _head = server
            .mock("HEAD", "/gone")
            .with_status(200)
            .with_header("content-type", "text/html")
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/gone")
            .with_status(500)
            .with_header("content-type", "text/html")
            .create_async()
            .await;

        let outcome = extractor()
            .extract_images(&format!("{}/gone", server.url()))
            .await;

        assert!(matches!(outcome, PageOutcome::Failed(_)));
        assert!(outcome.is_processed());
    }

    #[tokio::test]
    async fn test_extracts_images_with_sizes() {
        let mut server = Server::new_async().await;
        let base = server.url();
        let html = r#"<html><body>
            <img src="/img/hero.jpg" alt="Volunteers planting trees">
            <img src="/img/missing.png" alt="">
        </body></html>"#;

        let _head = server
            .mock("HEAD", "/page")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(html)
            .create_async()
            .await;
        let _hero = server
            .mock("HEAD", "/img/hero.jpg")
            .with_status(200)
            .with_header("content-length", "2048")
            .with_body(vec![0u8; 2048])
            .create_async()
            .await;
        let _missing = server
            .mock("HEAD", "/img/missing.png")
            .with_status(404)
            .create_async()
            .await;

        let page_url = format!("{}/page", base);
        let PageOutcome::Extracted(images) = extractor().extract_images(&page_url).await else {
            panic!("page should be extracted");
        };

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].image_url, format!("{}/img/hero.jpg", base));
        assert_eq!(images[0].page_url, page_url);
        assert_eq!(images[0].size_bytes, 2048);
        assert_eq!(images[1].size_bytes, 0);
        assert_eq!(images[1].alt_text.as_deref(), Some(""));
    }
}
