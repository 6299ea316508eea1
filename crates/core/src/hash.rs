use sha2::{Digest, Sha256};

/// SHA-256 of the UTF-8 bytes of `s`, hex-encoded. Used for `url_hash` and
/// `normalized_url_hash` alike.
pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_hash() {
        assert_eq!(sha256_hex("http://example.com/"), sha256_hex("http://example.com/"));
    }

    #[test]
    fn different_input_different_hash() {
        assert_ne!(sha256_hex("http://example.com/a"), sha256_hex("http://example.com/b"));
    }
}
