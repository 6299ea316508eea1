//! Trap Detector (C2). Stateful per-process: the repeating-segment and
//! path-depth checks are stateless functions of the URL alone, but the
//! query-variation check remembers, per path, the set of query-key
//! signatures seen so far — guarded by a single small mutex, since the
//! structure stays tiny for any realistic crawl.
//!
//! Shape grounded on `examples/original_source/crawl.py`'s
//! `UrlTrapDetector`. Default constants (10 / 3 / 5) match that module's
//! stated defaults rather than the larger ones an evolved, unretrieved
//! version of the same detector uses in `test_crawl.py`'s comments.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use url::Url;

pub struct TrapDetector {
    max_path_depth: usize,
    max_repeating_segments: usize,
    max_query_variations: usize,
    signatures: Mutex<HashMap<String, HashSet<BTreeSet<String>>>>,
}

impl TrapDetector {
    pub fn new(max_path_depth: usize, max_repeating_segments: usize, max_query_variations: usize) -> Self {
        Self {
            max_path_depth,
            max_repeating_segments,
            max_query_variations,
            signatures: Mutex::new(HashMap::new()),
        }
    }

    /// Defaults: max_path_depth=10, max_repeating_segments=3,
    /// max_query_variations=5.
    pub fn with_defaults() -> Self {
        Self::new(10, 3, 5)
    }

    /// `true` iff `url` matches one of the three trap shapes. On a
    /// non-trap verdict driven by a new query signature, the signature is
    /// remembered as a side effect so the next occurrence of that
    /// signature counts toward the variation limit.
    pub fn is_trap(&self, url: &Url) -> bool {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|it| it.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if segments.len() > self.max_path_depth {
            return true;
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for seg in &segments {
            *counts.entry(seg).or_insert(0) += 1;
        }
        if counts.values().any(|&c| c > self.max_repeating_segments) {
            return true;
        }

        let path_key = url.path().to_string();
        let signature: BTreeSet<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();

        let mut map = self.signatures.lock().expect("trap detector mutex poisoned");
        let seen = map.entry(path_key).or_default();
        if seen.contains(&signature) {
            return false;
        }
        if seen.len() >= self.max_query_variations {
            return true;
        }
        seen.insert(signature);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn deep_path_is_a_trap() {
        let detector = TrapDetector::with_defaults();
        let deep = url("http://example.com/a/b/c/d/e/f/g/h/i/j/k");
        assert_eq!(deep.path_segments().unwrap().count(), 11);
        assert!(detector.is_trap(&deep));
    }

    #[test]
    fn shallow_path_is_not_a_trap() {
        let detector = TrapDetector::with_defaults();
        assert!(!detector.is_trap(&url("http://example.com/a/b/c")));
    }

    #[test]
    fn repeating_segment_over_limit_is_a_trap() {
        let detector = TrapDetector::with_defaults();
        // 'a' repeats 4 times, default max_repeating_segments=3
        let repeated = url("http://example.com/a/x/a/y/a/z/a");
        assert!(detector.is_trap(&repeated));
    }

    #[test]
    fn fourth_distinct_query_signature_is_a_trap_with_max_3() {
        let detector = TrapDetector::new(10, 3, 3);
        let base = "http://example.com/page";
        assert!(!detector.is_trap(&url(&format!("{base}?a=1"))));
        assert!(!detector.is_trap(&url(&format!("{base}?b=2"))));
        assert!(!detector.is_trap(&url(&format!("{base}?c=3"))));
        assert!(detector.is_trap(&url(&format!("{base}?d=4"))));
    }

    #[test]
    fn duplicate_query_signature_is_not_a_trap() {
        let detector = TrapDetector::new(10, 3, 3);
        let base = "http://example.com/page";
        assert!(!detector.is_trap(&url(&format!("{base}?a=1"))));
        assert!(!detector.is_trap(&url(&format!("{base}?b=2"))));
        assert!(!detector.is_trap(&url(&format!("{base}?c=3"))));
        // duplicate of the first signature {a}; not a trap even after the limit
        assert!(!detector.is_trap(&url(&format!("{base}?a=5"))));
    }
}
