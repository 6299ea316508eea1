mod cli;
mod confirm;
mod crawl;
mod processor;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc avoids the glibc allocator's reluctance to release memory back
// to the OS under the sustained churn of many short-lived worker tasks.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use webcrawler_core::AppConfig;

use crate::cli::{Cli, Commands};
use crate::confirm::StdinConfirm;
use crate::crawl::{run_crawl, CrawlOptions, StartMode};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(32)
        .thread_stack_size(8 * 1024 * 1024)
        .max_blocking_threads(512)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;

    match cli.command {
        Commands::NewScan { url, opts } => {
            let crawl_opts = CrawlOptions::from_config(&config, &opts);
            run_crawl(config, StartMode::NewScan { url }, crawl_opts, Arc::new(StdinConfirm)).await?;
        }
        Commands::Update { host, opts } => {
            let crawl_opts = CrawlOptions::from_config(&config, &opts);
            run_crawl(config, StartMode::Update { host }, crawl_opts, Arc::new(StdinConfirm)).await?;
        }
        Commands::Continue { opts } => {
            let crawl_opts = CrawlOptions::from_config(&config, &opts);
            run_crawl(config, StartMode::Continue, crawl_opts, Arc::new(StdinConfirm)).await?;
        }
        Commands::Status => {
            print_status(&config).await?;
        }
    }

    Ok(())
}

async fn print_status(config: &AppConfig) -> Result<()> {
    let storage = webcrawler_storage::Storage::new(&config.database.postgres_url).await?;
    let domains = storage.distinct_domains().await?;
    println!("{} host(s) in store", domains.len());
    for domain in domains {
        let total = storage.count_pages(Some(&domain)).await?;
        let crawled = storage.count_crawled(Some(&domain)).await?;
        println!("  {domain}: {crawled}/{total} crawled");
    }
    Ok(())
}
