//! Page parsing: HTML metadata, the Link Extractor (C4), and the Resource
//! Extractor (C5), composed into the `ParsedPage` the Page Processor
//! writes to the Store.

pub mod html;
pub mod js_links;
pub mod resources;

use scraper::Html;
use url::Url;

use webcrawler_core::{DynamicElement, ParsedPage};

/// Parse `body` (already decoded to a `&str`) relative to `current_url`
/// and run both extractors over the resulting tree. `dynamic_links` is
/// whatever the fetcher harvested from the live DOM (empty for the static
/// fetcher); each one becomes a `kind = Dynamic` link alongside the ones
/// found in the static markup.
pub fn parse_page(body: &str, current_url: &Url, dynamic_links: &[DynamicElement]) -> ParsedPage {
    let document = Html::parse_document(body);

    let metadata = html::extract_metadata(&document);
    let mut links = html::extract_links(&document, current_url);
    links.extend(html::extract_dynamic_links(dynamic_links, current_url));
    let resources = resources::extract_all_resources(&document, current_url);

    ParsedPage {
        metadata,
        links,
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_page_combines_metadata_links_and_resources() {
        let html = r#"<html><head><title>T</title>
            <link rel="stylesheet" href="/s.css"></head>
            <body><a href="/a">a</a><img src="/i.jpg"></body></html>"#;
        let url = Url::parse("http://example.com/").unwrap();
        let parsed = parse_page(html, &url, &[]);
        assert_eq!(parsed.metadata.title.as_deref(), Some("T"));
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.resources.len(), 2);
    }

    #[test]
    fn parse_page_includes_dynamic_links_from_browser_harvest() {
        let html = r#"<html><body><a href="/a">a</a></body></html>"#;
        let url = Url::parse("http://example.com/").unwrap();
        let dynamic = vec![webcrawler_core::DynamicElement {
            href: Some("/dyn".to_string()),
            onclick: None,
            text: None,
        }];
        let parsed = parse_page(html, &url, &dynamic);
        assert_eq!(parsed.links.len(), 2);
        assert!(parsed
            .links
            .iter()
            .any(|l| l.kind == webcrawler_core::LinkKind::Dynamic));
    }
}
