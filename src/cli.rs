use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "webcrawler", about = "Web crawler and site mapper")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Mutually exclusive crawl startup modes.
#[derive(Subcommand)]
pub enum Commands {
    /// Start a new scan from a seed URL. Purges any existing rows for the
    /// seed's host after operator confirmation, then seeds the frontier
    /// from the seed URL plus its sitemap(s).
    NewScan {
        /// Seed URL to crawl from
        url: String,

        #[command(flatten)]
        opts: CrawlOpts,
    },
    /// Resume an existing host: resets its pages to uncrawled and drains
    /// them, without touching other hosts.
    Update {
        /// Host to resume (must already have rows in the store)
        host: String,

        #[command(flatten)]
        opts: CrawlOpts,
    },
    /// Drain every uncrawled page in the store, across all hosts.
    Continue {
        #[command(flatten)]
        opts: CrawlOpts,
    },
    /// Show crawl progress and database stats.
    Status,
}

#[derive(clap::Args, Clone)]
pub struct CrawlOpts {
    /// Maximum link depth from the seed (default 3)
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Seconds a worker sleeps after finishing an item (default 1.0)
    #[arg(long)]
    pub delay: Option<f64>,

    /// Number of concurrent workers (default 4)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Fetch pages with a headless browser instead of a plain HTTP client
    #[arg(long)]
    pub use_browser: bool,

    /// Ignore robots.txt policy entirely
    #[arg(long)]
    pub disregard_robots: bool,
}
