//! The site a crawl is scoped to

use url::{Origin, Url};

use crate::crawler::error::CrawlError;

/// Seed URL of a site with its origin and sitemap location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    seed: Url,
    sitemap: Option<Url>,
}

impl CrawlTarget {
    /// Parse a seed, placing the sitemap at the root of its origin
    pub fn parse(seed: &str) -> Result<Self, CrawlError> {
        let seed = Url::parse(seed)?;
        let sitemap = match seed.origin() {
            origin @ Origin::Tuple(..) => {
                Some(Url::parse(&origin.ascii_serialization())?.join("/sitemap.xml")?)
            }
            Origin::Opaque(_) => None,
        };
        Ok(Self { seed, sitemap })
    }

    /// Where crawling starts
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Scheme, host and port shared by every crawled page
    pub fn origin(&self) -> Origin {
        self.seed.origin()
    }

    /// Conventional sitemap location, if the seed has a network origin
    pub fn sitemap_url(&self) -> Option<&Url> {
        self.sitemap.as_ref()
    }

    /// Whether a link belongs to this site
    pub fn contains(&self, link: &Url) -> bool {
        matches!(link.scheme(), "http" | "https") && link.origin() == self.origin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sitemap_at_site_root() {
        for seed in [
            "https://example.com",
            "https://example.com/",
            "https://example.com/blog",
            "https://example.com/blog/?page=2#top",
        ] {
            let target = CrawlTarget::parse(seed).unwrap();
            assert_eq!(
                target.sitemap_url().map(Url::as_str),
                Some("https://example.com/sitemap.xml"),
                "seed {}",
                seed
            );
        }

        let target = CrawlTarget::parse("http://127.0.0.1:8080/docs/").unwrap();
        assert_eq!(
            target.sitemap_url().map(Url::as_str),
            Some("http://127.0.0.1:8080/sitemap.xml")
        );
    }

    #[test]
    fn test_contains_same_origin_only() {
        let target = CrawlTarget::parse("https://example.com/blog").unwrap();

        assert!(target.contains(&Url::parse("https://example.com/about").unwrap()));
        assert!(!target.contains(&Url::parse("http://example.com/about").unwrap()));
        assert!(!target.contains(&Url::parse("https://cdn.example.com/a").unwrap()));
        assert!(!target.contains(&Url::parse("mailto:team@example.com").unwrap()));
    }

    #[test]
    fn test_invalid_seed() {
        assert!(matches!(
            CrawlTarget::parse("example.com"),
            Err(CrawlError::UrlParse(_))
        ));
    }

    #[test]
    fn test_opaque_origin_has_no_sitemap() {
        let target = CrawlTarget::parse("data:text/html,hello").unwrap();
        assert_eq!(target.sitemap_url(), None);
    }
}
