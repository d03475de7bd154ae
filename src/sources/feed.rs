//! RSS and Atom feed links

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::error::SourceError;

/// Collect entry links from an RSS or Atom feed
///
/// RSS items contribute the text of their `<link>`; Atom entries the `href`
/// of their first `<link>` that is not `rel="self"` or similar.
pub fn parse_feed_links(body: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut links = Vec::new();
    let mut current = String::new();
    let mut entry_has_link = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if is_entry(&name) {
                    entry_has_link = false;
                }
                if name == "link" && in_entry(&path) {
                    push_atom_href(&e, &mut links, &mut entry_has_link)?;
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if local_name(&e) == "link" && in_entry(&path) {
                    push_atom_href(&e, &mut links, &mut entry_has_link)?;
                }
            }
            Ok(Event::Text(text)) => {
                if in_item_link(&path) {
                    let text = text
                        .unescape()
                        .map_err(|e| SourceError::Feed(e.to_string()))?;
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if in_item_link(&path) {
                    current.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if in_item_link(&path) {
                    let link = current.trim();
                    if !link.is_empty() && !entry_has_link {
                        links.push(link.to_string());
                        entry_has_link = true;
                    }
                    current.clear();
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Feed(e.to_string())),
            _ => {}
        }
    }

    Ok(links)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn is_entry(name: &str) -> bool {
    name == "item" || name == "entry"
}

fn in_entry(path: &[String]) -> bool {
    path.last().is_some_and(|name| is_entry(name))
}

fn in_item_link(path: &[String]) -> bool {
    matches!(path, [.., parent, last] if parent == "item" && last == "link")
}

fn push_atom_href(
    e: &BytesStart<'_>,
    links: &mut Vec<String>,
    entry_has_link: &mut bool,
) -> Result<(), SourceError> {
    if *entry_has_link {
        return Ok(());
    }

    let mut href = None;
    let mut rel = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SourceError::Feed(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| SourceError::Feed(e.to_string()))?
            .into_owned();
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }

    let alternate = rel.as_deref().is_none_or(|rel| rel == "alternate");
    if let (Some(href), true) = (href, alternate) {
        let href = href.trim();
        if !href.is_empty() {
            links.push(href.to_string());
            *entry_has_link = true;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rss_item_links() {
        let feed = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
                <title>News</title>
                <link>https://example.com/</link>
                <item><title>One</title><link>https://example.com/one?a=1&amp;b=2</link></item>
                <item><title>No link</title></item>
                <item><link><![CDATA[https://example.com/two]]></link></item>
            </channel></rss>"#;

        assert_eq!(
            parse_feed_links(feed).unwrap(),
            vec!["https://example.com/one?a=1&b=2", "https://example.com/two"]
        );
    }

    #[test]
    fn test_atom_entry_links() {
        let feed = r#"<?xml version="1.0" encoding="utf-8"?>
            <feed xmlns="http://www.w3.org/2005/Atom">
                <link href="https://example.com/feed" rel="self"/>
                <entry>
                    <link rel="edit" href="https://example.com/edit/1"/>
                    <link href="https://example.com/posts/1"/>
                    <link rel="alternate" href="https://example.com/posts/1-dup"/>
                </entry>
                <entry><link rel="alternate" href="https://example.com/posts/2"></link></entry>
            </feed>"#;

        assert_eq!(
            parse_feed_links(feed).unwrap(),
            vec!["https://example.com/posts/1", "https://example.com/posts/2"]
        );
    }

    #[test]
    fn test_malformed_feed() {
        assert!(parse_feed_links("<rss><channel><item></channel></rss>").is_err());
    }
}
