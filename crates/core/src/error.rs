use thiserror::Error;

/// Error taxonomy, ordered most-local to most-surfaced.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("disallowed by robots.txt")]
    Robots,

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
