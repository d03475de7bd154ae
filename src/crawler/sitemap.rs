//! Sitemap discovery
//!
//! Resolves a sitemap URL into the set of page URLs it lists, following
//! sitemap indexes. Resolution is bounded three ways: a recursion budget, a
//! cap on collected URLs, and an explicit set of sitemap URLs already
//! fetched so that self-referencing or cyclic indexes are read only once.
//!
//! Every failure (transport error, non-200 status, non-XML body, malformed
//! XML) makes the offending node contribute nothing; resolution never fails
//! as a whole.

use std::collections::{BTreeSet, HashSet, VecDeque};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::SitemapConfig;
use crate::crawler::error::CrawlError;
use crate::http::HttpClient;

/// One page URL discovered in a sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Absolute page URL
    pub url: String,

    /// Nesting level of the sitemap that listed it (0 for the root)
    pub depth: u32,
}

/// A parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index listing nested sitemap locations
    Index(Vec<String>),

    /// A URL set listing page locations
    UrlSet(Vec<String>),

    /// The body does not look like a sitemap
    Unrecognized,
}

/// Parse a sitemap body
///
/// The body is sniffed first: anything without a `<sitemapindex`, `<urlset`
/// or leading `<?xml` marker is [`SitemapDocument::Unrecognized`]. Element
/// names are matched by local name so namespaced and prefixed sitemaps both
/// work.
pub fn parse_sitemap(body: &str) -> Result<SitemapDocument, CrawlError> {
    let is_index = body.contains("<sitemapindex");
    let is_urlset = body.contains("<urlset");
    if !is_index && !is_urlset && !body.trim_start().starts_with("<?xml") {
        return Ok(SitemapDocument::Unrecognized);
    }

    let parent = if is_index { "sitemap" } else { "url" };
    let locs = collect_locs(body, parent)?;

    if is_index {
        Ok(SitemapDocument::Index(locs))
    } else if is_urlset {
        Ok(SitemapDocument::UrlSet(locs))
    } else {
        Ok(SitemapDocument::Unrecognized)
    }
}

/// Collect the text of every `<loc>` whose parent element is `parent`
fn collect_locs(body: &str, parent: &str) -> Result<Vec<String>, CrawlError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                path.push(name);
            }
            Ok(Event::End(_)) => {
                if in_loc(&path, parent) {
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                    current.clear();
                }
                path.pop();
            }
            Ok(Event::Text(text)) => {
                if in_loc(&path, parent) {
                    let text = text
                        .unescape()
                        .map_err(|e| CrawlError::XmlParse(e.to_string()))?;
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if in_loc(&path, parent) {
                    current.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CrawlError::XmlParse(e.to_string())),
            _ => {}
        }
    }

    Ok(locs)
}

fn in_loc(path: &[String], parent: &str) -> bool {
    matches!(path, [.., p, last] if p == parent && last == "loc")
}

/// Resolves sitemaps into page URLs
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    client: HttpClient,
    config: SitemapConfig,
}

impl SitemapResolver {
    /// Create a resolver
    pub fn new(client: HttpClient, config: SitemapConfig) -> Self {
        Self { client, config }
    }

    /// Resolve a sitemap with a fresh visited set and the configured budget
    pub async fn resolve(&self, url: &str) -> BTreeSet<String> {
        let mut seen = HashSet::new();
        self.resolve_sitemap(url, &mut seen, self.config.depth_budget)
            .await
    }

    /// Resolve a sitemap into page URLs
    ///
    /// `seen_sitemaps` is extended with every sitemap URL fetched, so a
    /// caller resolving several roots can share it.
    pub async fn resolve_sitemap(
        &self,
        url: &str,
        seen_sitemaps: &mut HashSet<String>,
        depth_budget: u32,
    ) -> BTreeSet<String> {
        self.resolve_entries(url, seen_sitemaps, depth_budget)
            .await
            .into_iter()
            .map(|entry| entry.url)
            .collect()
    }

    /// Resolve a sitemap, keeping the nesting level of each entry
    #[instrument(skip(self, seen_sitemaps))]
    pub async fn resolve_entries(
        &self,
        url: &str,
        seen_sitemaps: &mut HashSet<String>,
        depth_budget: u32,
    ) -> Vec<SitemapEntry> {
        let mut entries = Vec::new();
        let mut collected: HashSet<String> = HashSet::new();
        // Breadth-first, so a sitemap is first reached with its largest budget
        let mut pending = VecDeque::from([(absolutize(url, url), depth_budget)]);

        while let Some((sitemap_url, budget)) = pending.pop_front() {
            if budget == 0 {
                warn!("Reached max sitemap depth, not fetching {}", sitemap_url);
                continue;
            }
            if collected.len() >= self.config.max_urls {
                warn!(
                    "Collected {} URLs, stopping sitemap parsing",
                    collected.len()
                );
                break;
            }
            if !seen_sitemaps.insert(sitemap_url.clone()) {
                debug!("Sitemap {} already visited", sitemap_url);
                continue;
            }

            let depth = depth_budget - budget;
            match self.fetch_node(&sitemap_url).await {
                SitemapDocument::Index(children) => {
                    info!(
                        "Found sitemap index at {} with {} nested sitemaps",
                        sitemap_url,
                        children.len()
                    );
                    for child in children {
                        let child = absolutize(&sitemap_url, &child);
                        if !seen_sitemaps.contains(&child) {
                            pending.push_back((child, budget - 1));
                        }
                    }
                }
                SitemapDocument::UrlSet(locs) => {
                    debug!("Processing sitemap {} with {} entries", sitemap_url, locs.len());
                    for loc in locs {
                        if collected.len() >= self.config.max_urls {
                            break;
                        }
                        let loc = absolutize(&sitemap_url, &loc);
                        if self.config.is_excluded(&loc) {
                            continue;
                        }
                        if collected.insert(loc.clone()) {
                            entries.push(SitemapEntry { url: loc, depth });
                        }
                    }
                }
                SitemapDocument::Unrecognized => {
                    warn!("Sitemap at {} is not valid XML", sitemap_url);
                }
            }
        }

        info!("Found {} URLs in sitemap {}", entries.len(), url);
        entries
    }

    /// Fetch and parse one sitemap node; failures yield an empty document
    async fn fetch_node(&self, url: &str) -> SitemapDocument {
        debug!("Fetching sitemap: {}", url);
        let page = match self.client.get_sitemap(url).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Error fetching sitemap {}: {}", url, e);
                return SitemapDocument::Unrecognized;
            }
        };

        if page.status == StatusCode::FORBIDDEN {
            warn!("Access to {} is forbidden (403)", url);
            return SitemapDocument::UrlSet(Vec::new());
        }
        if page.status != StatusCode::OK {
            warn!("Could not access {}, status code: {}", url, page.status);
            return SitemapDocument::UrlSet(Vec::new());
        }

        match parse_sitemap(&page.body) {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to parse XML content from {}: {}", url, e);
                SitemapDocument::UrlSet(Vec::new())
            }
        }
    }
}

fn absolutize(base: &str, loc: &str) -> String {
    match Url::parse(loc) {
        Ok(url) => url.to_string(),
        Err(_) => Url::parse(base)
            .and_then(|base| base.join(loc))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| loc.to_string()),
    }
}
