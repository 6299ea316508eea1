//! Browser Fetcher (C6, the headless-browser fetch variant). Grounded on
//! the teacher's `crates/registration/src/browser.rs::HeadlessBrowser`
//! (launch options, `navigate_and_wait`'s body-presence-then-settle wait
//! loop), extended with a 100-element dynamic-link harvesting query.
//!
//! `headless_chrome::Tab` calls are blocking, mirroring the teacher's
//! `navigate_and_wait`: navigation/content calls run inline and only the
//! settle/poll waits go through `tokio::time::sleep`.
//!
//! Status reporting: `Tab` only surfaces navigation success/failure, not
//! the navigated document's HTTP status line, so a successful navigation
//! is always reported as `200` here. This is a known, accepted gap for
//! this fetcher variant rather than a fallback path — see `DESIGN.md`.

use std::ffi::OsString;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptionsBuilder};
use url::Url;

use webcrawler_core::{CrawlError, DynamicElement, FetchConfig, FetchResult, Fetcher};

/// `@onclick or @href or class contains 'link' or class contains 'btn'`,
/// capped at 100 elements.
const DYNAMIC_LINK_XPATH: &str =
    "//*[@onclick or @href or contains(concat(' ', normalize-space(@class), ' '), ' link ') or contains(concat(' ', normalize-space(@class), ' '), ' btn ')]";
const MAX_DYNAMIC_ELEMENTS: usize = 100;
const SETTLE_WAIT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct BrowserFetcher {
    browser: Browser,
}

impl BrowserFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let mut extra_args: Vec<OsString> = Vec::new();
        extra_args.push(OsString::from("--no-sandbox"));
        extra_args.push(OsString::from("--disable-dev-shm-usage"));
        extra_args.push(OsString::from("--disable-gpu"));

        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(true)
            .window_size(Some((1920, 1080)))
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder.build()?;
        let browser = Browser::new(launch_options)?;
        Ok(Self { browser })
    }
}

#[async_trait]
impl Fetcher for BrowserFetcher {
    fn name(&self) -> &str {
        "browser"
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResult, CrawlError> {
        let started = Instant::now();
        let timeout = config.timeout;
        let url = url.clone();

        let tab = self
            .browser
            .new_tab()
            .map_err(|e| CrawlError::Fetch(e.to_string()))?;

        tab.navigate_to(url.as_str())
            .map_err(|e| CrawlError::Fetch(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| CrawlError::Fetch(e.to_string()))?;

        let wait_start = Instant::now();
        loop {
            if wait_start.elapsed() > timeout {
                return Err(CrawlError::Timeout(timeout.as_secs()));
            }
            let body_present = tab
                .find_element("body")
                .map(|_| true)
                .unwrap_or(false);
            if body_present {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // Fixed settle window after body presence, to let late DOM
        // mutations (scripted content, lazy-loaded elements) finish.
        tokio::time::sleep(SETTLE_WAIT).await;

        let body = tab
            .get_content()
            .map_err(|e| CrawlError::Fetch(e.to_string()))?;
        if body.len() > config.max_body_size {
            return Err(CrawlError::BodyTooLarge {
                size: body.len(),
                max: config.max_body_size,
            });
        }

        let final_url = tab
            .get_url()
            .parse::<Url>()
            .unwrap_or_else(|_| url.clone());

        let dynamic_links = harvest_dynamic_elements(&tab);

        Ok(FetchResult {
            final_url,
            // A successful navigation has no observable status line
            // through this Tab API, so it is always reported as 200.
            status: 200,
            response_time_ms: started.elapsed().as_millis() as u64,
            content_type: Some("text/html".to_string()),
            encoding: Some("utf-8".to_string()),
            content_length: Some(body.len() as i64),
            redirect_chain: Vec::new(),
            body: body.into_bytes(),
            dynamic_links,
        })
    }
}

fn harvest_dynamic_elements(tab: &std::sync::Arc<headless_chrome::Tab>) -> Vec<DynamicElement> {
    let Ok(elements) = tab.find_elements_by_xpath(DYNAMIC_LINK_XPATH) else {
        return Vec::new();
    };

    elements
        .into_iter()
        .take(MAX_DYNAMIC_ELEMENTS)
        .map(|el| DynamicElement {
            href: el.get_attribute_value("href").ok().flatten(),
            onclick: el.get_attribute_value("onclick").ok().flatten(),
            text: el.get_inner_text().ok().filter(|t| !t.trim().is_empty()),
        })
        .collect()
}
