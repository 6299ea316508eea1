//! URL Normalizer (C1).
//!
//! Two functions: [`resolve`] (cheap, preserves case/query order/fragment)
//! and [`canonicalize`] (the dedup-key source). Grounded on the teacher's
//! `crates/frontier/src/lib.rs::normalize_url` for the lowercase/strip-
//! fragment idiom, and on `examples/original_source/crawl.py`'s
//! `LinkDetector.normalize_url_advanced` for the exact Canonicalize steps.

pub mod trap;

use std::collections::BTreeMap;

use url::Url;

pub use trap::TrapDetector;

/// Tracking query keys dropped by Canonicalize.
pub const TRACKING_KEYS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "msclkid",
];

/// Join a possibly relative URL against `base`. Rejects empty strings and
/// any input beginning with `#`, `javascript:`, `mailto:`, `tel:`
/// (case-insensitive, leading whitespace ignored).
pub fn resolve(href: &str, base: &Url) -> Option<Url> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:") {
        return None;
    }
    base.join(trimmed).ok()
}

/// Resolve, then normalize scheme/host case, default port, path, fragment,
/// and query. Returns the canonical string form used as the dedup key's
/// hash input.
pub fn canonicalize(href: &str, base: &Url) -> Option<String> {
    let mut url = resolve(href, base)?;

    if let Some(host) = url.host_str() {
        let lower = host.to_ascii_lowercase();
        if lower != host {
            let _ = url.set_host(Some(&lower));
        }
    }

    let default_port = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default_port {
        let _ = url.set_port(None);
    }

    if url.path().is_empty() {
        url.set_path("/");
    }

    url.set_fragment(None);

    let mut by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (k, v) in url.query_pairs() {
        let key = k.into_owned();
        if TRACKING_KEYS.contains(&key.as_str()) {
            continue;
        }
        by_key.entry(key).or_default().push(v.into_owned());
    }

    if by_key.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &by_key {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        url.set_query(Some(&serializer.finish()));
    }

    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/").unwrap()
    }

    #[test]
    fn canonicalize_lowercases_and_strips_fragment_and_tracking() {
        let base = Url::parse("https://WWW.Example.COM/").unwrap();
        let out = canonicalize(
            "HTTPS://WWW.Example.COM:443/path?c=3&b=2&utm_campaign=test#header",
            &base,
        )
        .unwrap();
        assert_eq!(out, "https://www.example.com/path?b=2&c=3");
    }

    #[test]
    fn canonicalize_drops_utm_source_and_fills_empty_path() {
        let out = canonicalize("http://example.com?utm_source=google&id=123", &base()).unwrap();
        assert_eq!(out, "http://example.com/?id=123");
    }

    #[test]
    fn canonicalize_strips_default_http_port() {
        let out = canonicalize("http://example.com:80/path", &base()).unwrap();
        assert_eq!(out, "http://example.com/path");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let once = canonicalize("HTTP://Example.com:80/a?b=1&a=2#f", &base()).unwrap();
        let base2 = Url::parse(&once).unwrap();
        let twice = canonicalize(&once, &base2).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn resolve_rejects_non_crawlable_schemes() {
        assert!(resolve("javascript:void(0)", &base()).is_none());
        assert!(resolve("mailto:a@b.com", &base()).is_none());
        assert!(resolve("tel:+1234567890", &base()).is_none());
        assert!(resolve("#section", &base()).is_none());
        assert!(resolve("", &base()).is_none());
    }

    #[test]
    fn resolve_preserves_case_and_query_order() {
        let resolved = resolve("/Path?B=2&A=1", &base()).unwrap();
        assert_eq!(resolved.as_str(), "http://example.com/Path?B=2&A=1");
    }
}
