//! Page metadata extraction and Link Extractor (C4). Adapted from the
//! teacher's `crates/parser/src/html.rs`: keeps the
//! `scraper::Selector::parse(..).ok()` idiom and the text/attribute
//! collection helpers, replaces the darknet link-kind classification
//! (onion/i2p/zeronet/hyphanet host flags, FProxy gateway rewriting) with
//! an HTML-feature-to-kind table, and drops the login/register/captcha/
//! forum/search-form detectors entirely (no counterpart here).

use scraper::{ElementRef, Html, Selector};
use url::Url;

use webcrawler_core::{DynamicElement, Link, LinkKind, PageMetadata};

use crate::js_links::extract_javascript_urls;

const MAX_TEXT_CHARS: usize = 500;
const MAX_ONCLICK_CHARS: usize = 1000;

pub fn selector(s: &str) -> Option<Selector> {
    Selector::parse(s).ok()
}

/// Page-level metadata: title, meta tags, canonical link, Open Graph and
/// Twitter card fields, and the document's declared language.
pub fn extract_metadata(document: &Html) -> PageMetadata {
    let title = selector("title")
        .and_then(|s| document.select(&s).next())
        .map(|el| el.text().collect::<String>().trim().to_string());

    let meta_description = meta_content(document, "description");
    let meta_keywords = meta_content(document, "keywords");
    let robots_meta = meta_content(document, "robots");

    let canonical_url = selector("link[rel=canonical]")
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("href").map(|s| s.to_string()));

    let og_title = og_content(document, "og:title");
    let og_description = og_content(document, "og:description");
    let og_image = og_content(document, "og:image");
    let og_type = og_content(document, "og:type");
    let twitter_card = meta_property_content(document, "twitter:card");

    let language = selector("html")
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("lang").map(|s| s.to_string()));

    PageMetadata {
        title,
        meta_description,
        meta_keywords,
        canonical_url,
        robots_meta,
        og_title,
        og_description,
        og_image,
        og_type,
        twitter_card,
        language,
    }
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let sel = format!("meta[name='{name}' i]");
    selector(&sel)
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content").map(|s| s.to_string()))
}

fn meta_property_content(document: &Html, name: &str) -> Option<String> {
    let sel = format!("meta[name='{name}' i]");
    selector(&sel)
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content").map(|s| s.to_string()))
}

fn og_content(document: &Html, property: &str) -> Option<String> {
    let sel = format!("meta[property='{property}']");
    selector(&sel)
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("content").map(|s| s.to_string()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn element_text(el: &ElementRef) -> Option<String> {
    let t = el.text().collect::<String>().trim().to_string();
    if t.is_empty() {
        None
    } else {
        Some(truncate(&t, MAX_TEXT_CHARS))
    }
}

fn is_follow(rel: Option<&str>) -> bool {
    match rel {
        Some(r) => !r.split_whitespace().any(|tok| tok.eq_ignore_ascii_case("nofollow")),
        None => true,
    }
}

fn classify(target: &Url, base_host: &str) -> (bool, bool) {
    let host = target.host_str().unwrap_or("");
    let is_internal = host.is_empty() || host.eq_ignore_ascii_case(base_host);
    (is_internal, !is_internal)
}

/// Link Extractor (C4): anchors, `<link>`, forms, iframes, `onclick`
/// handlers, and the regex-based JavaScript URL family over `<script>`
/// bodies and `onclick` handlers.
pub fn extract_links(document: &Html, current_url: &Url) -> Vec<Link> {
    let base_host = current_url.host_str().unwrap_or("").to_string();
    let mut links = Vec::new();

    if let Some(sel) = selector("a[href]") {
        for el in document.select(&sel) {
            let href = el.value().attr("href").unwrap_or_default();
            let Some(resolved) = webcrawler_normalize::resolve(href, current_url) else {
                continue;
            };
            let (is_internal, is_external) = classify(&resolved, &base_host);
            let rel = el.value().attr("rel").map(|s| s.to_string());
            let data_attributes = el
                .value()
                .attrs()
                .filter(|(k, _)| k.starts_with("data-"))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            links.push(Link {
                target_url: resolved.to_string(),
                link_text: element_text(&el),
                link_title: el.value().attr("title").map(|s| s.to_string()),
                kind: LinkKind::Anchor,
                rel: rel.clone(),
                is_internal,
                is_external,
                is_follow: is_follow(rel.as_deref()),
                detected_method: "anchor",
                href_attribute: Some(href.to_string()),
                aria_label: el.value().attr("aria-label").map(|s| s.to_string()),
                data_attributes,
                surrounding_text: None,
                onclick_handler: None,
                is_javascript: false,
                is_dynamic: false,
            });
        }
    }

    if let Some(sel) = selector("link[href]") {
        for el in document.select(&sel) {
            let href = el.value().attr("href").unwrap_or_default();
            let Some(resolved) = webcrawler_normalize::resolve(href, current_url) else {
                continue;
            };
            let (is_internal, is_external) = classify(&resolved, &base_host);
            let rel = el.value().attr("rel").map(|s| s.to_string());
            links.push(Link {
                target_url: resolved.to_string(),
                link_text: None,
                link_title: None,
                kind: LinkKind::LinkTag,
                rel: rel.clone(),
                is_internal,
                is_external,
                is_follow: is_follow(rel.as_deref()),
                detected_method: "link_tag",
                href_attribute: Some(href.to_string()),
                aria_label: None,
                data_attributes: Default::default(),
                surrounding_text: None,
                onclick_handler: None,
                is_javascript: false,
                is_dynamic: false,
            });
        }
    }

    if let Some(sel) = selector("form[action]") {
        for el in document.select(&sel) {
            let action = el.value().attr("action").unwrap_or_default();
            let Some(resolved) = webcrawler_normalize::resolve(action, current_url) else {
                continue;
            };
            let (is_internal, is_external) = classify(&resolved, &base_host);
            links.push(Link {
                target_url: resolved.to_string(),
                link_text: None,
                link_title: None,
                kind: LinkKind::Form,
                rel: None,
                is_internal,
                is_external,
                is_follow: true,
                detected_method: "form",
                href_attribute: Some(action.to_string()),
                aria_label: None,
                data_attributes: Default::default(),
                surrounding_text: None,
                onclick_handler: None,
                is_javascript: false,
                is_dynamic: false,
            });
        }
    }

    if let Some(sel) = selector("iframe[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            let Some(resolved) = webcrawler_normalize::resolve(src, current_url) else {
                continue;
            };
            let (is_internal, is_external) = classify(&resolved, &base_host);
            links.push(Link {
                target_url: resolved.to_string(),
                link_text: None,
                link_title: None,
                kind: LinkKind::Iframe,
                rel: None,
                is_internal,
                is_external,
                is_follow: true,
                detected_method: "iframe",
                href_attribute: Some(src.to_string()),
                aria_label: None,
                data_attributes: Default::default(),
                surrounding_text: None,
                onclick_handler: None,
                is_javascript: false,
                is_dynamic: false,
            });
        }
    }

    if let Some(sel) = selector("[onclick]") {
        for el in document.select(&sel) {
            let onclick = el.value().attr("onclick").unwrap_or_default();
            for url in extract_javascript_urls(onclick, current_url) {
                let (is_internal, is_external) = classify(&url, &base_host);
                links.push(Link {
                    target_url: url.to_string(),
                    link_text: element_text(&el),
                    link_title: None,
                    kind: LinkKind::Onclick,
                    rel: None,
                    is_internal,
                    is_external,
                    is_follow: true,
                    detected_method: "onclick",
                    href_attribute: None,
                    aria_label: el.value().attr("aria-label").map(|s| s.to_string()),
                    data_attributes: Default::default(),
                    surrounding_text: None,
                    onclick_handler: Some(truncate(onclick, MAX_ONCLICK_CHARS)),
                    is_javascript: true,
                    is_dynamic: false,
                });
            }
        }
    }

    if let Some(sel) = selector("script") {
        for el in document.select(&sel) {
            let body = el.text().collect::<String>();
            if body.trim().is_empty() {
                continue;
            }
            let context = truncate(&body, MAX_TEXT_CHARS);
            for url in extract_javascript_urls(&body, current_url) {
                let (is_internal, is_external) = classify(&url, &base_host);
                links.push(Link {
                    target_url: url.to_string(),
                    link_text: None,
                    link_title: None,
                    kind: LinkKind::Javascript,
                    rel: None,
                    is_internal,
                    is_external,
                    is_follow: true,
                    detected_method: "javascript",
                    href_attribute: None,
                    aria_label: None,
                    data_attributes: Default::default(),
                    surrounding_text: Some(context.clone()),
                    onclick_handler: None,
                    is_javascript: true,
                    is_dynamic: false,
                });
            }
        }
    }

    links
}

/// Turns elements harvested by the browser fetcher's dynamic-link query
/// into `Link` records with `kind = Dynamic`: the element's `href` (if
/// any) resolved directly, plus any URL the JavaScript-URL family can
/// pull out of its `onclick` handler. Elements with neither yield no
/// links.
pub fn extract_dynamic_links(elements: &[DynamicElement], current_url: &Url) -> Vec<Link> {
    let base_host = current_url.host_str().unwrap_or("").to_string();
    let mut links = Vec::new();

    for el in elements {
        if let Some(href) = &el.href {
            if let Some(resolved) = webcrawler_normalize::resolve(href, current_url) {
                let (is_internal, is_external) = classify(&resolved, &base_host);
                links.push(Link {
                    target_url: resolved.to_string(),
                    link_text: el.text.as_deref().map(|t| truncate(t, MAX_TEXT_CHARS)),
                    link_title: None,
                    kind: LinkKind::Dynamic,
                    rel: None,
                    is_internal,
                    is_external,
                    is_follow: true,
                    detected_method: "dynamic",
                    href_attribute: Some(href.clone()),
                    aria_label: None,
                    data_attributes: Default::default(),
                    surrounding_text: None,
                    onclick_handler: el.onclick.as_deref().map(|o| truncate(o, MAX_ONCLICK_CHARS)),
                    is_javascript: false,
                    is_dynamic: true,
                });
            }
        }

        if let Some(onclick) = &el.onclick {
            for url in extract_javascript_urls(onclick, current_url) {
                let (is_internal, is_external) = classify(&url, &base_host);
                links.push(Link {
                    target_url: url.to_string(),
                    link_text: el.text.as_deref().map(|t| truncate(t, MAX_TEXT_CHARS)),
                    link_title: None,
                    kind: LinkKind::Dynamic,
                    rel: None,
                    is_internal,
                    is_external,
                    is_follow: true,
                    detected_method: "dynamic",
                    href_attribute: None,
                    aria_label: None,
                    data_attributes: Default::default(),
                    surrounding_text: None,
                    onclick_handler: Some(truncate(onclick, MAX_ONCLICK_CHARS)),
                    is_javascript: true,
                    is_dynamic: true,
                });
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    #[test]
    fn extracts_metadata_fields() {
        let html = r#"<html lang="en"><head>
            <title>Hi</title>
            <meta name="description" content="desc">
            <meta name="keywords" content="a,b">
            <link rel="canonical" href="http://example.com/canon">
            <meta property="og:title" content="OG Title">
            <meta name="twitter:card" content="summary">
        </head><body></body></html>"#;
        let doc = Html::parse_document(html);
        let meta = extract_metadata(&doc);
        assert_eq!(meta.title.as_deref(), Some("Hi"));
        assert_eq!(meta.meta_description.as_deref(), Some("desc"));
        assert_eq!(meta.canonical_url.as_deref(), Some("http://example.com/canon"));
        assert_eq!(meta.og_title.as_deref(), Some("OG Title"));
        assert_eq!(meta.twitter_card.as_deref(), Some("summary"));
        assert_eq!(meta.language.as_deref(), Some("en"));
    }

    #[test]
    fn anchor_nofollow_sets_is_follow_false() {
        let html = r#"<a href="/x" rel="nofollow external">x</a>"#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &base());
        assert_eq!(links.len(), 1);
        assert!(!links[0].is_follow);
        assert_eq!(links[0].kind, LinkKind::Anchor);
    }

    #[test]
    fn external_host_classified_external() {
        let html = r#"<a href="http://other.com/x">x</a>"#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &base());
        assert!(links[0].is_external);
        assert!(!links[0].is_internal);
    }

    #[test]
    fn form_and_iframe_extracted() {
        let html = r#"<form action="/submit"></form><iframe src="/embed"></iframe>"#;
        let doc = Html::parse_document(html);
        let links = extract_links(&doc, &base());
        assert!(links.iter().any(|l| l.kind == LinkKind::Form));
        assert!(links.iter().any(|l| l.kind == LinkKind::Iframe));
    }

    #[test]
    fn dynamic_element_href_resolves_to_dynamic_link() {
        let elements = vec![DynamicElement {
            href: Some("/go".to_string()),
            onclick: None,
            text: Some("Go".to_string()),
        }];
        let links = extract_dynamic_links(&elements, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, LinkKind::Dynamic);
        assert!(links[0].is_dynamic);
        assert_eq!(links[0].target_url, "http://example.com/go");
        assert_eq!(links[0].link_text.as_deref(), Some("Go"));
    }

    #[test]
    fn dynamic_element_onclick_extracts_javascript_url() {
        let elements = vec![DynamicElement {
            href: None,
            onclick: Some("location.href='/click'".to_string()),
            text: None,
        }];
        let links = extract_dynamic_links(&elements, &base());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, LinkKind::Dynamic);
        assert!(links[0].is_javascript);
        assert_eq!(links[0].target_url, "http://example.com/click");
    }

    #[test]
    fn dynamic_element_with_neither_href_nor_onclick_yields_nothing() {
        let elements = vec![DynamicElement {
            href: None,
            onclick: None,
            text: Some("plain".to_string()),
        }];
        assert!(extract_dynamic_links(&elements, &base()).is_empty());
    }
}
