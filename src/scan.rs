//! # Scan pipeline
//!
//! Wires the stages together: resolve the input into candidate pages,
//! shuffle them, extract images until the sample is filled, aggregate,
//! review and write the report.
//!
//! Fetches are issued one at a time. The extraction loop shares the
//! crawler's auto-throttle behavior: a delay after every page attempted that
//! grows when pages keep failing.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use rand::seq::SliceRandom;
use rand::thread_rng;
use tracing::{info, instrument, warn};

use crate::aggregate::{Aggregator, ImageRecord};
use crate::analysis::{SuggestionConfig, annotate};
use crate::crawler::{
    AutoThrottle, ConnectivityGate, Crawler, CrawlerConfig, SitemapConfig, SitemapResolver,
};
use crate::error::{Error, Result};
use crate::extractor::{PageImageExtractor, PageOutcome};
use crate::http::{HttpClient, HttpOptions};
use crate::progress::{ProgressEvent, ProgressSender, report};
use crate::report::{report_path, write_report};
use crate::sources::{SourceResolver, UrlSource};

/// Settings for one scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Pages to process
    pub sample_size: usize,

    /// Initial delay between fetches in seconds
    pub throttle_secs: u64,

    /// Skip sitemap discovery for domain inputs
    pub crawl_only: bool,

    /// Fewest sitemap URLs accepted before crawling instead
    pub min_sitemap_urls: usize,

    /// Rule thresholds
    pub suggestions: SuggestionConfig,

    /// Sitemap resolution bounds
    pub sitemap: SitemapConfig,

    /// HTTP client settings
    pub http: HttpOptions,

    /// Directory receiving the report
    pub output_dir: PathBuf,

    /// Pause while offline
    pub connectivity_check: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            sample_size: 100,
            throttle_secs: 1,
            crawl_only: false,
            min_sitemap_urls: 1,
            suggestions: SuggestionConfig::default(),
            sitemap: SitemapConfig::default(),
            http: HttpOptions::default(),
            output_dir: PathBuf::from("."),
            connectivity_check: true,
        }
    }
}

impl ScanConfig {
    /// Start building a config
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    fn crawler_config(&self) -> CrawlerConfig {
        CrawlerConfig::builder()
            .max_pages(self.sample_size)
            .throttle_secs(self.throttle_secs)
            .build()
    }

    fn gate(&self) -> ConnectivityGate {
        if self.connectivity_check {
            ConnectivityGate::default()
        } else {
            ConnectivityGate::disabled()
        }
    }
}

/// Builder for [`ScanConfig`]
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// Set the number of pages to process
    pub fn sample_size(mut self, sample_size: usize) -> Self {
        self.config.sample_size = sample_size;
        self
    }

    /// Set the initial delay between fetches in seconds
    pub fn throttle_secs(mut self, throttle_secs: u64) -> Self {
        self.config.throttle_secs = throttle_secs;
        self
    }

    /// Skip sitemap discovery for domain inputs
    pub fn crawl_only(mut self, crawl_only: bool) -> Self {
        self.config.crawl_only = crawl_only;
        self
    }

    /// Set the fewest sitemap URLs accepted before crawling instead
    pub fn min_sitemap_urls(mut self, min_sitemap_urls: usize) -> Self {
        self.config.min_sitemap_urls = min_sitemap_urls;
        self
    }

    /// Set the words-per-sentence threshold
    pub fn readability_threshold(mut self, threshold: f64) -> Self {
        self.config.suggestions = self.config.suggestions.with_readability_threshold(threshold);
        self
    }

    /// Set the report directory
    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    /// Enable or disable the connectivity gate
    pub fn connectivity_check(mut self, enabled: bool) -> Self {
        self.config.connectivity_check = enabled;
        self
    }

    /// Finish building
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

/// What a scan produced
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Candidate pages found for the input
    pub urls_found: usize,

    /// Pages that counted towards the sample
    pub pages_processed: usize,

    /// Reviewed images
    pub records: Vec<ImageRecord>,

    /// Report location, if one was written
    pub report: Option<PathBuf>,
}

/// Runs scans
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    resolver: SourceResolver,
    extractor: PageImageExtractor,
}

impl Scanner {
    /// Create a scanner
    pub fn new(config: ScanConfig) -> Result<Self> {
        let client = HttpClient::with_options(config.http.clone())?;
        let gate = config.gate();

        let resolver = SourceResolver::new(
            client.clone(),
            SitemapResolver::new(client.clone(), config.sitemap.clone()),
            Crawler::new(client.clone(), config.crawler_config(), gate.clone()),
        )
        .with_crawl_only(config.crawl_only)
        .with_min_sitemap_urls(config.min_sitemap_urls);

        let extractor = PageImageExtractor::new(client, gate);

        Ok(Self {
            config,
            resolver,
            extractor,
        })
    }

    /// Scan a source and write the report dated today
    pub async fn run(&self, source: &UrlSource, progress: Option<&ProgressSender>) -> Result<ScanSummary> {
        self.run_dated(source, Local::now().date_naive(), progress).await
    }

    /// Scan a source and write the report with an explicit date
    #[instrument(skip(self, source, progress), fields(source = %source))]
    pub async fn run_dated(
        &self,
        source: &UrlSource,
        date: NaiveDate,
        progress: Option<&ProgressSender>,
    ) -> Result<ScanSummary> {
        self.config.gate().wait_until_online().await;

        let mut candidates = self.resolver.resolve(source, progress).await;
        if candidates.is_empty() {
            return Err(Error::Source("No URLs found".to_string()));
        }
        let urls_found = candidates.len();
        candidates.shuffle(&mut thread_rng());

        info!(
            "Processing up to {} sampled URLs from {} total found URLs",
            self.config.sample_size, urls_found
        );
        let (mut records, pages_processed) = self
            .sample_images(&candidates, source.base_domain(), progress)
            .await;

        annotate(records.iter_mut(), &self.config.suggestions);
        info!("Processed {} valid images", records.len());

        let report = if records.is_empty() {
            warn!("No image data available for analysis");
            None
        } else {
            let path = report_path(
                &self.config.output_dir,
                &source.input(),
                source.scan_type(),
                self.config.sample_size,
                date,
            );
            write_report(&path, &records, date)?;
            Some(path)
        };

        Ok(ScanSummary {
            urls_found,
            pages_processed,
            records,
            report,
        })
    }

    /// Extract images from candidates until `sample_size` pages were processed
    ///
    /// Non-HTML pages are skipped without using up the sample, but the
    /// throttle delay still follows every page attempted.
    async fn sample_images(
        &self,
        candidates: &[String],
        base: Option<&str>,
        progress: Option<&ProgressSender>,
    ) -> (Vec<ImageRecord>, usize) {
        let sample_size = self.config.sample_size;
        let crawler = self.config.crawler_config();
        let mut throttle = AutoThrottle::new(
            crawler.throttle_secs,
            crawler.error_threshold,
            crawler.max_throttle_secs,
        );
        let mut aggregator = Aggregator::new(base);
        let mut processed = 0;

        report(
            progress,
            ProgressEvent::Started {
                stage: "Crawling URLs for images",
                total: sample_size.min(candidates.len()) as u64,
            },
        )
        .await;

        for url in candidates {
            if processed >= sample_size {
                break;
            }

            let counted = match self.extractor.extract_images(url).await {
                PageOutcome::Skipped => false,
                PageOutcome::Failed(reason) => {
                    warn!("Failed to process {}: {}", url, reason);
                    throttle.record_failure();
                    true
                }
                PageOutcome::Extracted(sightings) => {
                    throttle.record_success();
                    aggregator.extend(&sightings);
                    true
                }
            };
            if counted {
                processed += 1;
                report(progress, ProgressEvent::PageProcessed(url.clone())).await;
            }
            throttle.pause().await;
        }

        report(
            progress,
            ProgressEvent::Finished {
                stage: "Crawling URLs for images",
            },
        )
        .await;

        if processed < sample_size {
            warn!(
                "Only {} valid pages found, fewer than the requested sample of {}",
                processed, sample_size
            );
        }

        (aggregator.finish().into_values().collect(), processed)
    }
}
