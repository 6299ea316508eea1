use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub fetch: FetchSettings,
    pub robots: RobotsSettings,
    pub trap: TrapSettings,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,
    /// How long the frontier may sit empty before the idle monitor asks
    /// an operator for shutdown confirmation, as a safety net layered on
    /// top of the Worker Pool's own unconditional drain detection.
    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,
}

fn default_max_depth() -> u32 {
    3
}
fn default_workers() -> usize {
    4
}
fn default_delay_seconds() -> f64 {
    1.0
}
fn default_max_body_size_mb() -> usize {
    10
}
fn default_idle_timeout_seconds() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchSettings {
    #[serde(default)]
    pub use_browser: bool,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RobotsSettings {
    #[serde(default)]
    pub disregard: bool,
}

/// Trap Detector defaults. These match `examples/original_source/crawl.py`'s
/// stated constants rather than the larger ones an evolved, unretrieved
/// version of the same detector uses in `test_crawl.py`'s comments.
#[derive(Debug, Deserialize, Clone)]
pub struct TrapSettings {
    #[serde(default = "default_max_path_depth")]
    pub max_path_depth: usize,
    #[serde(default = "default_max_repeating_segments")]
    pub max_repeating_segments: usize,
    #[serde(default = "default_max_query_variations")]
    pub max_query_variations: usize,
}

fn default_max_path_depth() -> usize {
    10
}
fn default_max_repeating_segments() -> usize {
    3
}
fn default_max_query_variations() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub postgres_url: String,
}
