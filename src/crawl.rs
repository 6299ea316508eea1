//! Worker Pool / Manager (C10). Three startup modes feed one shared main
//! loop. Grounded on the teacher's `src/crawl.rs` for the overall shape
//! (per-worker `tokio::spawn`, `tokio::signal::ctrl_c` shutdown), rebuilt
//! around direct concurrent `Storage` access instead of the teacher's
//! single mpsc-fed storage task: the store is configured to permit
//! multi-thread access and each operation is its own transaction, so
//! there's nothing for a serializing task to buy here.
//!
//! Termination is unconditional: once the frontier sits empty and no
//! worker is mid-item, every worker observes that and returns on its own.
//! The idle-confirm dialog (`idle_monitor`) is a separate, later safety
//! net that can ask an operator whether to keep the process alive past
//! that point — it is never the only way the workers stop.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use url::Url;

use webcrawler_core::{AppConfig, FetchConfig, Fetcher, FrontierItem, PageUpdate};
use webcrawler_fetcher::{BrowserFetcher, StaticFetcher};
use webcrawler_frontier::Frontier;
use webcrawler_normalize::TrapDetector;
use webcrawler_robots::RobotsPolicyCache;
use webcrawler_storage::Storage;

use crate::confirm::ConfirmAction;
use crate::processor::process_page;

pub enum StartMode {
    NewScan { url: String },
    Update { host: String },
    Continue,
}

#[derive(Clone)]
pub struct CrawlOptions {
    pub max_depth: u32,
    pub delay: Duration,
    pub workers: usize,
    pub use_browser: bool,
    pub disregard_robots: bool,
    pub fetch_timeout: Duration,
    pub max_body_size: usize,
}

impl CrawlOptions {
    pub fn from_config(config: &AppConfig, overrides: &crate::cli::CrawlOpts) -> Self {
        Self {
            max_depth: overrides.max_depth.unwrap_or(config.general.max_depth),
            delay: Duration::from_secs_f64(overrides.delay.unwrap_or(config.general.delay_seconds)),
            workers: overrides.workers.unwrap_or(config.general.workers),
            use_browser: overrides.use_browser || config.fetch.use_browser,
            disregard_robots: overrides.disregard_robots || config.robots.disregard,
            fetch_timeout: Duration::from_secs(config.fetch.timeout_seconds),
            max_body_size: config.general.max_body_size_mb * 1024 * 1024,
        }
    }
}

pub async fn run_crawl(
    config: AppConfig,
    mode: StartMode,
    opts: CrawlOptions,
    confirm: Arc<dyn ConfirmAction>,
) -> Result<()> {
    let storage = Arc::new(Storage::new(&config.database.postgres_url).await?);
    storage.run_migrations().await?;

    let robots_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch.timeout_seconds))
        .build()?;
    let robots = Arc::new(RobotsPolicyCache::new(
        robots_client,
        FetchConfig::default().user_agent,
    ));
    let trap_detector = Arc::new(TrapDetector::new(
        config.trap.max_path_depth,
        config.trap.max_repeating_segments,
        config.trap.max_query_variations,
    ));
    let frontier = Arc::new(Frontier::new());

    let domain_filter = match &mode {
        StartMode::NewScan { url } => {
            start_new_scan(&storage, &robots, url, confirm.as_ref()).await?;
            Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string()))
        }
        StartMode::Update { host } => {
            storage.reset_domain(host).await?;
            Some(host.clone())
        }
        StartMode::Continue => None,
    };

    preload_frontier(&storage, &frontier, domain_filter.as_deref()).await?;

    if frontier.is_empty() {
        info!("nothing to crawl");
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("shutdown requested, draining in-flight work");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }

    let active = Arc::new(AtomicUsize::new(0));
    {
        let frontier = frontier.clone();
        let active = active.clone();
        let shutdown = shutdown.clone();
        let idle_timeout = Duration::from_secs(config.general.idle_timeout_seconds);
        let confirm = confirm.clone();
        tokio::spawn(async move { idle_monitor(frontier, active, idle_timeout, confirm, shutdown).await });
    }

    let mut handles = Vec::with_capacity(opts.workers);
    for worker_id in 0..opts.workers {
        let storage = storage.clone();
        let robots = robots.clone();
        let trap_detector = trap_detector.clone();
        let frontier = frontier.clone();
        let active = active.clone();
        let shutdown = shutdown.clone();
        let opts = opts.clone();
        handles.push(tokio::spawn(async move {
            worker_loop(worker_id, storage, robots, trap_detector, frontier, active, opts, shutdown).await
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }
    shutdown.store(true, Ordering::SeqCst);

    info!("crawl finished");
    Ok(())
}

async fn start_new_scan(
    storage: &Storage,
    robots: &RobotsPolicyCache,
    seed: &str,
    confirm: &dyn ConfirmAction,
) -> Result<()> {
    let seed_url = Url::parse(seed).map_err(|e| anyhow!("invalid seed URL: {e}"))?;
    let host = seed_url
        .host_str()
        .ok_or_else(|| anyhow!("seed URL has no host"))?
        .to_string();

    let existing = storage.count_pages(Some(&host)).await?;
    if existing > 0 {
        let proceed = confirm
            .confirm(&format!(
                "{host} already has {existing} page(s) in the store. Purge and start a new scan?"
            ))
            .await;
        if !proceed {
            return Err(anyhow!("new scan cancelled by operator"));
        }
        storage.delete_domain(&host).await?;
    }

    let canonical_seed = webcrawler_normalize::canonicalize(seed, &seed_url).unwrap_or_else(|| seed_url.to_string());
    storage.add_page(seed, &canonical_seed, None, 0).await?;

    let advertised = robots.sitemaps(seed_url.scheme(), &host).await;
    let sitemap_urls = if advertised.is_empty() {
        vec![format!("{}://{}/sitemap.xml", seed_url.scheme(), host)]
    } else {
        advertised
    };

    for sitemap_url in sitemap_urls {
        let locs = robots.fetch_sitemap_urls(&sitemap_url).await;
        for loc in locs {
            let Ok(loc_url) = Url::parse(&loc) else { continue };
            if loc_url.host_str() != Some(host.as_str()) {
                continue;
            }
            if let Some(canonical) = webcrawler_normalize::canonicalize(&loc, &seed_url) {
                let _ = storage.add_page(&loc, &canonical, Some("sitemap"), 0).await;
            }
        }
    }

    Ok(())
}

async fn preload_frontier(storage: &Storage, frontier: &Frontier, domain: Option<&str>) -> Result<()> {
    while let Some(item) = storage.next_uncrawled(domain).await? {
        if !frontier.enqueue(item) {
            break;
        }
    }
    Ok(())
}

/// Secondary safety net, not the primary termination path: once the
/// frontier has sat empty (no queued work, no worker mid-item) for
/// `idle_timeout`, asks an operator whether to shut down early. Workers
/// already terminate unconditionally once the frontier drains, so by the
/// time this fires on a normal run it usually finds `shutdown` already
/// set and returns without prompting.
async fn idle_monitor(
    frontier: Arc<Frontier>,
    active: Arc<AtomicUsize>,
    idle_timeout: Duration,
    confirm: Arc<dyn ConfirmAction>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        if !(frontier.is_empty() && active.load(Ordering::SeqCst) == 0) {
            continue;
        }
        tokio::time::sleep(idle_timeout).await;
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        if frontier.is_empty() && active.load(Ordering::SeqCst) == 0 {
            if confirm.confirm("Crawler has been idle. Shut down?").await {
                shutdown.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    storage: Arc<Storage>,
    robots: Arc<RobotsPolicyCache>,
    trap_detector: Arc<TrapDetector>,
    frontier: Arc<Frontier>,
    active: Arc<AtomicUsize>,
    opts: CrawlOptions,
    shutdown: Arc<AtomicBool>,
) {
    let fetch_config = FetchConfig {
        timeout: opts.fetch_timeout,
        max_body_size: opts.max_body_size,
        follow_redirects: true,
        ..FetchConfig::default()
    };

    let fetcher: Box<dyn Fetcher> = if opts.use_browser {
        match BrowserFetcher::new() {
            Ok(f) => Box::new(f),
            Err(e) => {
                warn!(worker_id, error = %e, "failed to launch browser fetcher");
                return;
            }
        }
    } else {
        match StaticFetcher::new(&fetch_config) {
            Ok(f) => Box::new(f),
            Err(e) => {
                warn!(worker_id, error = %e, "failed to build static fetcher");
                return;
            }
        }
    };

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }

        let Some(item) = frontier.dequeue() else {
            if frontier.is_empty() && active.load(Ordering::SeqCst) == 0 {
                // No work queued and no sibling worker is mid-item (and
                // thus none can still produce new admissions) — the
                // frontier is fully drained, so this worker is done
                // regardless of shutdown/confirm state.
                return;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            continue;
        };

        active.fetch_add(1, Ordering::SeqCst);
        let page_id = item.page_id;
        if let Err(e) = process_item(
            &item,
            &storage,
            &robots,
            &trap_detector,
            &frontier,
            fetcher.as_ref(),
            &fetch_config,
            &opts,
        )
        .await
        {
            warn!(worker_id, page_id, error = %e, "failed to process item");
        }
        frontier.complete(page_id);
        active.fetch_sub(1, Ordering::SeqCst);

        tokio::time::sleep(opts.delay).await;
    }
}

async fn process_item(
    item: &FrontierItem,
    storage: &Storage,
    robots: &RobotsPolicyCache,
    trap_detector: &TrapDetector,
    frontier: &Frontier,
    fetcher: &dyn Fetcher,
    fetch_config: &FetchConfig,
    opts: &CrawlOptions,
) -> Result<()> {
    let url = Url::parse(&item.url).map_err(|e| anyhow!("invalid frontier URL {}: {e}", item.url))?;

    if !opts.disregard_robots && !robots.can_fetch(&url).await {
        storage
            .update_page_crawl(item.page_id, &PageUpdate::error(Some(403), "Disallowed by robots.txt"))
            .await?;
        return Ok(());
    }

    if item.depth > opts.max_depth {
        storage
            .update_page_crawl(item.page_id, &PageUpdate::error(Some(0), "Max depth reached"))
            .await?;
        return Ok(());
    }

    let fetch_result = match fetcher.fetch(&url, fetch_config).await {
        Ok(r) => r,
        Err(e) => {
            storage.update_page_crawl(item.page_id, &PageUpdate::error(None, e.to_string())).await?;
            return Ok(());
        }
    };

    let (update, admissions) =
        process_page(item, &url, &fetch_result, storage, trap_detector, opts.max_depth).await?;
    storage.update_page_crawl(item.page_id, &update).await?;

    for admission in admissions {
        let id = storage
            .add_page(
                &admission.raw_url,
                &admission.canonical_url,
                admission.parent_url.as_deref(),
                admission.depth,
            )
            .await?;
        frontier.enqueue(FrontierItem {
            page_id: id,
            url: admission.raw_url,
            depth: admission.depth,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webcrawler_core::config::{DatabaseConfig, FetchSettings, GeneralConfig, RobotsSettings, TrapSettings};

    fn test_config() -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                max_depth: 3,
                workers: 4,
                delay_seconds: 1.0,
                max_body_size_mb: 10,
                idle_timeout_seconds: 300,
            },
            fetch: FetchSettings {
                use_browser: false,
                timeout_seconds: 30,
            },
            robots: RobotsSettings { disregard: false },
            trap: TrapSettings {
                max_path_depth: 10,
                max_repeating_segments: 3,
                max_query_variations: 5,
            },
            database: DatabaseConfig {
                postgres_url: "postgres://localhost/test".to_string(),
            },
        }
    }

    #[test]
    fn crawl_options_prefers_cli_overrides_over_config() {
        let config = test_config();
        let overrides = crate::cli::CrawlOpts {
            max_depth: Some(7),
            delay: None,
            workers: None,
            use_browser: true,
            disregard_robots: false,
        };
        let opts = CrawlOptions::from_config(&config, &overrides);
        assert_eq!(opts.max_depth, 7);
        assert!(opts.use_browser);
        assert_eq!(opts.workers, config.general.workers);
    }

    #[test]
    fn crawl_options_falls_back_to_config_defaults() {
        let config = test_config();
        let overrides = crate::cli::CrawlOpts {
            max_depth: None,
            delay: None,
            workers: None,
            use_browser: false,
            disregard_robots: false,
        };
        let opts = CrawlOptions::from_config(&config, &overrides);
        assert_eq!(opts.max_depth, config.general.max_depth);
        assert_eq!(opts.delay, Duration::from_secs_f64(config.general.delay_seconds));
        assert_eq!(opts.workers, config.general.workers);
        assert!(!opts.use_browser);
    }
}
