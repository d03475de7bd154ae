//! Breadth-first same-origin link crawler
//!
//! Used when a site has no usable sitemap. Pages are visited in FIFO order
//! starting from the seed; only HTML responses are accepted and only links
//! sharing the seed's scheme and host are queued.

use std::collections::{HashSet, VecDeque};

use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::connectivity::ConnectivityGate;
use crate::crawler::error::CrawlError;
use crate::crawler::target::CrawlTarget;
use crate::crawler::throttle::AutoThrottle;
use crate::http::HttpClient;
use crate::progress::{ProgressEvent, ProgressSender, report};

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Mutable state of one crawl session
#[derive(Debug)]
pub struct PageVisitState {
    /// URLs dequeued so far, successful or not
    pub visited: HashSet<String>,

    /// URLs waiting to be visited, in discovery order
    pub frontier: VecDeque<String>,

    /// HTML pages accepted so far
    pub accepted: Vec<String>,

    /// Consecutive error tracking and politeness delay
    pub throttle: AutoThrottle,

    queued: HashSet<String>,
}

impl PageVisitState {
    /// Start a session seeded with one URL
    pub fn new(seed: &str, throttle: AutoThrottle) -> Self {
        let mut state = Self {
            visited: HashSet::new(),
            frontier: VecDeque::new(),
            accepted: Vec::new(),
            throttle,
            queued: HashSet::new(),
        };
        state.enqueue(seed.to_string());
        state
    }

    /// Queue a URL unless it was already visited or queued
    pub fn enqueue(&mut self, url: String) {
        if !self.visited.contains(&url) && self.queued.insert(url.clone()) {
            self.frontier.push_back(url);
        }
    }

    /// Take the next unvisited URL, marking it visited
    pub fn next_unvisited(&mut self) -> Option<String> {
        while let Some(url) = self.frontier.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }
}

/// Outcome of fetching one page
enum Visit {
    /// An HTML page and the links found on it
    Html(Vec<Url>),

    /// Anything that is not HTML
    NotHtml(Option<String>),
}

/// Link-following crawler
#[derive(Debug, Clone)]
pub struct Crawler {
    client: HttpClient,
    config: CrawlerConfig,
    gate: ConnectivityGate,
}

impl Crawler {
    /// Create a crawler
    pub fn new(client: HttpClient, config: CrawlerConfig, gate: ConnectivityGate) -> Self {
        Self {
            client,
            config,
            gate,
        }
    }

    /// Crawl with the configured page budget and throttle
    pub async fn crawl_site(
        &self,
        seed_url: &str,
        progress: Option<&ProgressSender>,
    ) -> Result<Vec<String>, CrawlError> {
        self.crawl(
            seed_url,
            self.config.max_pages,
            self.config.throttle_secs,
            progress,
        )
        .await
    }

    /// Crawl a site breadth-first from `seed_url`
    ///
    /// Returns the accepted HTML pages in the order they were fetched. Only an
    /// unparsable seed is an error; every per-page failure is absorbed.
    #[instrument(skip(self, progress))]
    pub async fn crawl(
        &self,
        seed_url: &str,
        max_pages: usize,
        throttle_secs: u64,
        progress: Option<&ProgressSender>,
    ) -> Result<Vec<String>, CrawlError> {
        let target = CrawlTarget::parse(seed_url)?;
        let seed = target.seed();
        let throttle = AutoThrottle::new(
            throttle_secs,
            self.config.error_threshold,
            self.config.max_throttle_secs,
        );
        let mut state = PageVisitState::new(seed.as_str(), throttle);

        info!(
            "Starting crawl for {} with a target of {} unique HTML pages",
            seed, max_pages
        );
        report(
            progress,
            ProgressEvent::Started {
                stage: "Crawling URLs",
                total: max_pages as u64,
            },
        )
        .await;

        while state.accepted.len() < max_pages {
            let Some(url) = state.next_unvisited() else {
                break;
            };

            self.gate.wait_until_online().await;

            match self.visit(&url).await {
                Ok(Visit::Html(links)) => {
                    state.throttle.record_success();
                    for link in links {
                        if self.should_enqueue(&link, &target) {
                            state.enqueue(link.to_string());
                        }
                    }
                    report(progress, ProgressEvent::PageCrawled(url.clone())).await;
                    state.accepted.push(url);
                }
                Ok(Visit::NotHtml(content_type)) => {
                    debug!(
                        "Skipping non-HTML content at {} ({})",
                        url,
                        content_type.unwrap_or_default()
                    );
                }
                Err(e) => {
                    warn!("Failed to crawl {}: {}", url, e);
                    state.throttle.record_failure();
                }
            }

            state.throttle.pause().await;
        }

        report(
            progress,
            ProgressEvent::Finished {
                stage: "Crawling URLs",
            },
        )
        .await;
        info!("Completed crawling {} HTML pages", state.accepted.len());
        Ok(state.accepted)
    }

    fn should_enqueue(&self, link: &Url, target: &CrawlTarget) -> bool {
        target.contains(link) && !self.config.is_skipped_link(link.path())
    }

    async fn visit(&self, url: &str) -> Result<Visit, CrawlError> {
        let page = self.client.get(url).await?;

        if !page.status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: page.status.as_u16(),
            });
        }
        if !page.is_html() {
            return Ok(Visit::NotHtml(page.content_type));
        }

        let base = Url::parse(&page.url)?;
        Ok(Visit::Html(extract_links(&base, &page.body)))
    }
}

/// Resolve every hyperlink on a page against the page URL
///
/// Fragments are dropped so in-page anchors do not produce new pages.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|mut link| {
            link.set_fragment(None);
            link
        })
        .collect()
}
