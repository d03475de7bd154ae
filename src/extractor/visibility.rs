//! Hidden-image detection from markup alone
//!
//! Only inline signals are considered; stylesheets and scripts are never
//! evaluated.

use scraper::ElementRef;
use scraper::node::Element;

/// Whether an image is hidden by itself or by its immediate parent
pub fn is_hidden_image(img: ElementRef<'_>) -> bool {
    if is_hidden_element(img.value()) {
        return true;
    }
    img.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| is_hidden_element(parent.value()))
}

/// Whether an element carries a hiding attribute or inline style
pub fn is_hidden_element(element: &Element) -> bool {
    element.attr("hidden").is_some()
        || element
            .attr("aria-hidden")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
        || element.attr("style").is_some_and(style_hides)
}

/// Whether an inline `style` attribute hides the element
///
/// Recognizes `display: none`, `visibility: hidden` and a zero `opacity`,
/// with any spacing, casing or `!important` suffix.
pub fn style_hides(style: &str) -> bool {
    style
        .split(';')
        .filter_map(|declaration| declaration.split_once(':'))
        .any(|(property, value)| {
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            let value = value.trim_end_matches("!important").trim();
            match property.as_str() {
                "display" => value == "none",
                "visibility" => value == "hidden",
                "opacity" => value.parse::<f64>().is_ok_and(|opacity| opacity <= 0.0),
                _ => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_img(html: &str) -> bool {
        let document = Html::parse_document(html);
        let selector = Selector::parse("img").unwrap();
        let img = document.select(&selector).next().unwrap();
        is_hidden_image(img)
    }

    #[test]
    fn test_style_hides() {
        assert!(style_hides("display:none"));
        assert!(style_hides("color: red; DISPLAY : None !important"));
        assert!(style_hides("visibility: hidden"));
        assert!(style_hides("opacity: 0"));
        assert!(style_hides("opacity:0.0"));
        assert!(!style_hides("opacity: 0.5"));
        assert!(!style_hides("display: block"));
        assert!(!style_hides(""));
    }

    #[test]
    fn test_hidden_attributes_on_image() {
        assert!(first_img(r#"<img src="a.png" hidden>"#));
        assert!(first_img(r#"<img src="a.png" aria-hidden="true">"#));
        assert!(first_img(r#"<img src="a.png" style="display:none">"#));
        assert!(!first_img(r#"<img src="a.png" aria-hidden="false">"#));
        assert!(!first_img(r#"<img src="a.png">"#));
    }

    #[test]
    fn test_hidden_parent_hides_image() {
        assert!(first_img(r#"<div hidden><img src="a.png"></div>"#));
        assert!(first_img(
            r#"<span style="visibility:hidden"><img src="a.png"></span>"#
        ));
    }

    #[test]
    fn test_hidden_grandparent_is_not_considered() {
        assert!(!first_img(
            r#"<div hidden><p><img src="a.png"></p></div>"#
        ));
    }
}
