//! JavaScript URL extraction: a heuristic, ordered regex family run
//! against `onclick` handlers and `<script>` bodies.
//! `once_cell::Lazy<Regex>` idiom grounded on the teacher's
//! `crates/parser/src/entities.rs`.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use webcrawler_normalize::resolve;

static PATTERNS: Lazy<[Regex; 6]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)["']([^"']*\.(?:html?|php|aspx?|jsp|cfm)[^"']*)["']"#).unwrap(),
        Regex::new(r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)window\.location\s*=\s*["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)window\.open\(["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)(?:fetch|axios\.get)\(["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)["']([^"']*/[^"']*)["']"#).unwrap(),
    ]
});

/// Apply the ordered regex family to `text`, Resolve each match against
/// `current_url`, and deduplicate within the call.
pub fn extract_javascript_urls(text: &str, current_url: &Url) -> Vec<Url> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for pattern in PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let Some(resolved) = resolve(m.as_str(), current_url) else {
                continue;
            };
            if seen.insert(resolved.to_string()) {
                out.push(resolved);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/page").unwrap()
    }

    #[test]
    fn extracts_location_href_assignment() {
        let js = r#"location.href = '/next.html';"#;
        let urls = extract_javascript_urls(js, &base());
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].as_str(), "http://example.com/next.html");
    }

    #[test]
    fn extracts_window_open() {
        let js = r#"window.open('http://example.com/popup.php');"#;
        let urls = extract_javascript_urls(js, &base());
        assert!(urls.iter().any(|u| u.path() == "/popup.php"));
    }

    #[test]
    fn deduplicates_matches_across_patterns() {
        let js = r#"window.location = '/a.html'; fetch('/a.html');"#;
        let urls = extract_javascript_urls(js, &base());
        assert_eq!(urls.len(), 1);
    }
}
