//! Image aggregation across pages
//!
//! Sightings of the same absolute image URL are folded into one
//! [`ImageRecord`]. How metadata from a new sighting replaces the old is
//! decided by a [`MergePolicy`]; the default keeps the latest values.

use std::collections::{BTreeMap, BTreeSet};

use url::Url;

use crate::extractor::ImageSighting;

/// Everything known about one image after a run
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Absolute image URL
    pub image_url: String,

    /// Number of sightings
    pub count: u32,

    /// Last observed `alt`
    pub alt_text: Option<String>,

    /// Last observed `title`
    pub title: Option<String>,

    /// Last observed `longdesc`
    pub longdesc: Option<String>,

    /// Last observed `aria-label`
    pub aria_label: Option<String>,

    /// Last observed `aria-describedby` text
    pub aria_describedby_text: Option<String>,

    /// Pages that referenced the image, relative to the scanned site
    pub source_urls: BTreeSet<String>,

    /// Size of the image in kilobytes, 0 if unknown
    pub size_kb: f64,

    /// Accessibility suggestions, filled in after aggregation
    pub suggestions: Vec<String>,
}

impl ImageRecord {
    /// An empty record with no sightings
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            count: 0,
            alt_text: None,
            title: None,
            longdesc: None,
            aria_label: None,
            aria_describedby_text: None,
            source_urls: BTreeSet::new(),
            size_kb: 0.0,
            suggestions: Vec::new(),
        }
    }
}

/// Decides how a sighting's metadata is folded into an existing record
pub trait MergePolicy {
    /// Apply the sighting's metadata to the record
    ///
    /// Counting and source tracking are handled by the aggregator.
    fn merge(&self, record: &mut ImageRecord, sighting: &ImageSighting);
}

/// Every sighting overwrites the previous metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct LastWriteWins;

impl MergePolicy for LastWriteWins {
    fn merge(&self, record: &mut ImageRecord, sighting: &ImageSighting) {
        record.alt_text = sighting.alt_text.clone();
        record.title = sighting.title.clone();
        record.longdesc = sighting.longdesc.clone();
        record.aria_label = sighting.aria_label.clone();
        record.aria_describedby_text = sighting.aria_describedby_text.clone();
        record.size_kb = sighting.size_bytes as f64 / 1024.0;
    }
}

/// Folds sightings into image records keyed by image URL
#[derive(Debug)]
pub struct Aggregator<P = LastWriteWins> {
    base: Option<Url>,
    policy: P,
    records: BTreeMap<String, ImageRecord>,
}

impl Aggregator<LastWriteWins> {
    /// Aggregator with last-write-wins merging
    ///
    /// `base` is the scanned site; pages on its origin are recorded by path.
    pub fn new(base: Option<&str>) -> Self {
        Self::with_policy(base, LastWriteWins)
    }
}

impl<P: MergePolicy> Aggregator<P> {
    /// Aggregator with a custom merge policy
    pub fn with_policy(base: Option<&str>, policy: P) -> Self {
        Self {
            base: base.and_then(|b| Url::parse(b).ok()),
            policy,
            records: BTreeMap::new(),
        }
    }

    /// Fold one sighting in
    pub fn record(&mut self, sighting: &ImageSighting) {
        let source = relative_source(&sighting.page_url, self.base.as_ref());
        let record = self
            .records
            .entry(sighting.image_url.clone())
            .or_insert_with(|| ImageRecord::new(sighting.image_url.clone()));

        record.count += 1;
        self.policy.merge(record, sighting);
        record.source_urls.insert(source);
    }

    /// Fold every sighting in
    pub fn extend<'a>(&mut self, sightings: impl IntoIterator<Item = &'a ImageSighting>) {
        for sighting in sightings {
            self.record(sighting);
        }
    }

    /// Number of distinct images seen
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finished records keyed by image URL, without records never sighted
    pub fn finish(self) -> BTreeMap<String, ImageRecord> {
        self.records
            .into_iter()
            .filter(|(_, record)| record.count > 0)
            .collect()
    }
}

/// Aggregate sightings with last-write-wins merging
pub fn aggregate<'a>(
    sightings: impl IntoIterator<Item = &'a ImageSighting>,
    base: Option<&str>,
) -> BTreeMap<String, ImageRecord> {
    let mut aggregator = Aggregator::new(base);
    aggregator.extend(sightings);
    aggregator.finish()
}

/// Page reference as stored in `source_urls`
///
/// Pages on the base origin keep only their path and query. Anything else
/// keeps its full URL. Fragments are always dropped.
pub fn relative_source(page_url: &str, base: Option<&Url>) -> String {
    let Ok(mut page) = Url::parse(page_url) else {
        return page_url.to_string();
    };
    page.set_fragment(None);

    match base {
        Some(base) if base.origin() == page.origin() => match page.query() {
            Some(query) => format!("{}?{}", page.path(), query),
            None => page.path().to_string(),
        },
        _ => page.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sighting(image: &str, page: &str, alt: Option<&str>, size_bytes: u64) -> ImageSighting {
        ImageSighting {
            image_url: image.to_string(),
            page_url: page.to_string(),
            alt_text: alt.map(str::to_string),
            title: None,
            longdesc: None,
            aria_label: None,
            aria_describedby_text: None,
            size_bytes,
        }
    }

    #[test]
    fn test_relative_source() {
        let base = Url::parse("https://example.com").unwrap();
        assert_eq!(
            relative_source("https://example.com/a/b?page=2#top", Some(&base)),
            "/a/b?page=2"
        );
        assert_eq!(
            relative_source("https://other.com/x#frag", Some(&base)),
            "https://other.com/x"
        );
        assert_eq!(
            relative_source("https://example.com/a", None),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_repeat_visits_count_but_do_not_duplicate_sources() {
        let logo = "https://example.com/logo.png";
        let sightings = vec![
            sighting(logo, "https://example.com/", Some("Logo"), 1024),
            sighting(logo, "https://example.com/about", Some("Logo"), 1024),
            sighting(logo, "https://example.com/", Some("Company logo"), 2048),
        ];

        let records = aggregate(&sightings, Some("https://example.com"));
        let record = &records[logo];

        assert_eq!(record.count, 3);
        assert_eq!(
            record.source_urls.iter().collect::<Vec<_>>(),
            vec!["/", "/about"]
        );
        assert_eq!(record.alt_text.as_deref(), Some("Company logo"));
        assert_eq!(record.size_kb, 2.0);
    }

    #[test]
    fn test_distinct_images_get_distinct_records() {
        let sightings = vec![
            sighting("https://example.com/a.png", "https://example.com/", None, 0),
            sighting("https://example.com/b.png", "https://example.com/", Some(""), 0),
        ];

        let records = aggregate(&sightings, None);
        assert_eq!(records.len(), 2);
        assert!(records.values().all(|r| r.count == 1));
    }

    #[test]
    fn test_custom_merge_policy() {
        struct KeepFirstAlt;
        impl MergePolicy for KeepFirstAlt {
            fn merge(&self, record: &mut ImageRecord, sighting: &ImageSighting) {
                if record.alt_text.is_none() {
                    record.alt_text = sighting.alt_text.clone();
                }
            }
        }

        let image = "https://example.com/a.png";
        let mut aggregator = Aggregator::with_policy(None, KeepFirstAlt);
        aggregator.record(&sighting(image, "https://example.com/1", Some("first"), 0));
        aggregator.record(&sighting(image, "https://example.com/2", Some("second"), 0));

        let records = aggregator.finish();
        assert_eq!(records[image].alt_text.as_deref(), Some("first"));
        assert_eq!(records[image].count, 2);
    }

    #[test]
    fn test_empty_aggregator() {
        let aggregator = Aggregator::new(None);
        assert!(aggregator.is_empty());
        assert!(aggregator.finish().is_empty());
    }
}
