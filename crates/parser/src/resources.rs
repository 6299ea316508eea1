//! Resource Extractor (C5). One pass per kind, grounded on
//! `examples/original_source/test_crawl.py`'s `TestResourceExtractor`
//! fixture (a single HTML document exercising every kind, carried into
//! this module's test as the same 14-resource literal fixture).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use url::Url;

use webcrawler_core::{Resource, ResourceKind};
use webcrawler_normalize::resolve;

use crate::html::selector;

const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".zip", ".rar",
];

static CSS_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"url\(\s*['"]?([^'"\)]+)['"]?\s*\)"#).unwrap());

fn push_resource(
    out: &mut Vec<Resource>,
    current_url: &Url,
    href: &str,
    kind: ResourceKind,
    source_tag: &'static str,
    source_attribute: &'static str,
    alt_text: Option<String>,
    media_keywords: String,
) {
    if let Some(resolved) = resolve(href, current_url) {
        out.push(Resource {
            url: resolved.to_string(),
            kind,
            source_tag,
            source_attribute,
            alt_text,
            media_keywords,
        });
    }
}

pub fn extract_images(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();

    if let Some(sel) = selector("img[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            let alt = el.value().attr("alt").map(|s| s.to_string());
            push_resource(&mut out, current_url, src, ResourceKind::Image, "img", "src", alt, "image".to_string());
        }
    }

    if let Some(sel) = selector("picture source[srcset]") {
        for el in document.select(&sel) {
            let srcset = el.value().attr("srcset").unwrap_or_default();
            push_resource(
                &mut out,
                current_url,
                srcset,
                ResourceKind::Image,
                "source",
                "srcset",
                None,
                "image".to_string(),
            );
        }
    }

    if let Some(sel) = selector("[style]") {
        for el in document.select(&sel) {
            let style = el.value().attr("style").unwrap_or_default();
            for caps in CSS_URL_RE.captures_iter(style) {
                if let Some(m) = caps.get(1) {
                    push_resource(
                        &mut out,
                        current_url,
                        m.as_str(),
                        ResourceKind::Image,
                        "style",
                        "background-image",
                        None,
                        "image".to_string(),
                    );
                }
            }
        }
    }

    out
}

pub fn extract_videos(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("video[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::Video, "video", "src", None, "video".to_string());
        }
    }
    if let Some(sel) = selector("video source[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::Video, "source", "src", None, "video".to_string());
        }
    }
    out
}

pub fn extract_audios(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("audio[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::Audio, "audio", "src", None, "audio".to_string());
        }
    }
    if let Some(sel) = selector("audio source[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::Audio, "source", "src", None, "audio".to_string());
        }
    }
    out
}

pub fn extract_documents(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("a[href]") {
        for el in document.select(&sel) {
            let href = el.value().attr("href").unwrap_or_default();
            let lower = href.to_ascii_lowercase();
            if DOCUMENT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                push_resource(&mut out, current_url, href, ResourceKind::Document, "a", "href", None, "document".to_string());
            }
        }
    }
    out
}

pub fn extract_scripts(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("script[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::Script, "script", "src", None, "script".to_string());
        }
    }
    out
}

pub fn extract_stylesheets(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("link[rel=stylesheet][href]") {
        for el in document.select(&sel) {
            let href = el.value().attr("href").unwrap_or_default();
            push_resource(&mut out, current_url, href, ResourceKind::Stylesheet, "link", "href", None, "stylesheet".to_string());
        }
    }
    out
}

pub fn extract_favicons(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("link[href]") {
        for el in document.select(&sel) {
            let Some(rel) = el.value().attr("rel") else { continue };
            if rel.split_whitespace().any(|tok| tok.eq_ignore_ascii_case("icon")) {
                let href = el.value().attr("href").unwrap_or_default();
                push_resource(&mut out, current_url, href, ResourceKind::Favicon, "link", "href", None, "favicon".to_string());
            }
        }
    }
    out
}

pub fn extract_embedded_content(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    if let Some(sel) = selector("iframe[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::EmbeddedIframe, "iframe", "src", None, "embedded".to_string());
        }
    }
    if let Some(sel) = selector("embed[src]") {
        for el in document.select(&sel) {
            let src = el.value().attr("src").unwrap_or_default();
            push_resource(&mut out, current_url, src, ResourceKind::EmbeddedEmbed, "embed", "src", None, "embedded".to_string());
        }
    }
    if let Some(sel) = selector("object[data]") {
        for el in document.select(&sel) {
            let data = el.value().attr("data").unwrap_or_default();
            push_resource(&mut out, current_url, data, ResourceKind::EmbeddedObject, "object", "data", None, "embedded".to_string());
        }
    }
    out
}

/// One pass per kind, concatenated in a fixed enumeration order.
pub fn extract_all_resources(document: &Html, current_url: &Url) -> Vec<Resource> {
    let mut out = Vec::new();
    out.extend(extract_images(document, current_url));
    out.extend(extract_videos(document, current_url));
    out.extend(extract_audios(document, current_url));
    out.extend(extract_documents(document, current_url));
    out.extend(extract_scripts(document, current_url));
    out.extend(extract_stylesheets(document, current_url));
    out.extend(extract_favicons(document, current_url));
    out.extend(extract_embedded_content(document, current_url));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Carried verbatim (in shape, not markup) from test_crawl.py's
    // TestResourceExtractor fixture: 4 images, 1 video, 1 audio,
    // 2 documents, 1 script, 1 stylesheet, 1 favicon, 3 embedded = 14.
    const FIXTURE: &str = r#"<html><head>
        <link rel="stylesheet" href="/style.css">
        <link rel="icon" href="/favicon.ico">
        <script src="/app.js"></script>
    </head>
    <body>
        <img src="/photo.jpg" alt="Photo">
        <div style="background-image: url('/bg.jpg')"></div>
        <picture><source srcset="/pic.webp"><img src="/pic-fallback.jpg"></picture>
        <video src="/movie.mp4"></video>
        <audio><source src="/sound.mp3"></audio>
        <a href="/doc1.pdf">Doc1</a>
        <a href="/doc2.docx">Doc2</a>
        <iframe src="/frame.html"></iframe>
        <embed src="/embed.swf">
        <object data="/object.swf"></object>
    </body></html>"#;

    fn base() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    #[test]
    fn counts_match_fixture_per_kind() {
        let doc = Html::parse_document(FIXTURE);
        assert_eq!(extract_images(&doc, &base()).len(), 4);
        assert_eq!(extract_videos(&doc, &base()).len(), 1);
        assert_eq!(extract_audios(&doc, &base()).len(), 1);
        assert_eq!(extract_documents(&doc, &base()).len(), 2);
        assert_eq!(extract_scripts(&doc, &base()).len(), 1);
        assert_eq!(extract_stylesheets(&doc, &base()).len(), 1);
        assert_eq!(extract_favicons(&doc, &base()).len(), 1);
        assert_eq!(extract_embedded_content(&doc, &base()).len(), 3);
    }

    #[test]
    fn all_resources_totals_fourteen() {
        let doc = Html::parse_document(FIXTURE);
        assert_eq!(extract_all_resources(&doc, &base()).len(), 14);
    }
}
