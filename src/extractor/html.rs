//! Image element parsing

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::ImageSighting;
use super::visibility::is_hidden_image;

/// File extensions accepted as images
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "svg", "tiff", "avif", "webp"];

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid img selector"));

static ID_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[id]").expect("valid id selector"));

/// Whether a URL path ends in a supported image extension
pub fn has_supported_extension(image_url: &Url) -> bool {
    let path = image_url.path().to_ascii_lowercase();
    path.rsplit_once('.').is_some_and(|(_, extension)| {
        SUPPORTED_IMAGE_EXTENSIONS.contains(&extension)
    })
}

/// Collect the images of one HTML document
///
/// Elements are filtered in document order: no `src`, hidden, unresolvable
/// `src`, repeated within this page, unsupported extension. Sizes are left at
/// zero for the caller to probe.
pub fn parse_images(page_url: &Url, html: &str) -> Vec<ImageSighting> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut sightings = Vec::new();

    for img in document.select(&IMG_SELECTOR) {
        let element = img.value();

        let Some(src) = element.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            debug!("Skipping <img> without src on {}", page_url);
            continue;
        };

        if is_hidden_image(img) {
            debug!("Skipping hidden image {} on {}", src, page_url);
            continue;
        }

        let Ok(mut image_url) = page_url.join(src) else {
            debug!("Skipping unresolvable image src {} on {}", src, page_url);
            continue;
        };
        image_url.set_fragment(None);

        if !seen.insert(image_url.to_string()) {
            debug!("Duplicate image skipped: {}", image_url);
            continue;
        }

        if !has_supported_extension(&image_url) {
            debug!("Skipped: Not a valid image extension - {}", image_url);
            continue;
        }

        sightings.push(ImageSighting {
            image_url: image_url.to_string(),
            page_url: page_url.to_string(),
            alt_text: element.attr("alt").map(str::to_string),
            title: element.attr("title").map(str::to_string),
            longdesc: element.attr("longdesc").map(str::to_string),
            aria_label: element.attr("aria-label").map(str::to_string),
            aria_describedby_text: element
                .attr("aria-describedby")
                .and_then(|ids| describedby_text(&document, ids)),
            size_bytes: 0,
        });
    }

    sightings
}

/// Resolve an `aria-describedby` id list to the referenced text
fn describedby_text(document: &Html, ids: &str) -> Option<String> {
    let texts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| {
            document
                .select(&ID_SELECTOR)
                .find(|element| element.value().id() == Some(id))
        })
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
