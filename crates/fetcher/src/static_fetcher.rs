//! Static Fetcher (C6, the ordinary-HTTP-client fetch variant). Grounded
//! on the teacher's `crates/networks/src/tor.rs`
//! `NetworkDriver::fetch` shape (timing via `Instant`, header/content-type
//! extraction, `FetchResponse` construction), rebuilt on plain `reqwest`
//! since Tor-proxy routing has no counterpart here (see DESIGN.md).
//!
//! Redirects are followed manually (policy `none()` + a location-header
//! loop) so the exact chain of intermediate URLs can be reported, which
//! `reqwest`'s built-in follower does not expose.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use url::Url;

use webcrawler_core::{CrawlError, FetchConfig, FetchResult, Fetcher};

const MAX_REDIRECTS: usize = 10;

pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResult, CrawlError> {
        let started = Instant::now();
        let mut current = url.clone();
        let mut redirect_chain = Vec::new();

        let response = loop {
            let resp = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|e| map_reqwest_err(e, config))?;

            if config.follow_redirects && resp.status().is_redirection() && redirect_chain.len() < MAX_REDIRECTS {
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                match location.and_then(|loc| current.join(&loc).ok()) {
                    Some(next) => {
                        redirect_chain.push(current.to_string());
                        current = next;
                        continue;
                    }
                    None => break resp,
                }
            }
            break resp;
        };

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let encoding = content_type.as_deref().and_then(extract_charset);
        let final_url = response.url().clone();

        let body_bytes = response.bytes().await.map_err(|e| map_reqwest_err(e, config))?;
        let content_length = Some(body_bytes.len() as i64);
        let body = if body_bytes.len() > config.max_body_size {
            return Err(CrawlError::BodyTooLarge {
                size: body_bytes.len(),
                max: config.max_body_size,
            });
        } else {
            body_bytes.to_vec()
        };

        Ok(FetchResult {
            final_url,
            status,
            response_time_ms: started.elapsed().as_millis() as u64,
            content_type,
            encoding,
            content_length,
            redirect_chain,
            body,
            dynamic_links: Vec::new(),
        })
    }
}

fn map_reqwest_err(e: reqwest::Error, config: &FetchConfig) -> CrawlError {
    if e.is_timeout() {
        CrawlError::Timeout(config.timeout.as_secs())
    } else {
        CrawlError::Fetch(e.to_string())
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(|part| part.trim())
        .find_map(|part| part.strip_prefix("charset="))
        .map(|s| s.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_charset_from_content_type() {
        assert_eq!(
            extract_charset("text/html; charset=utf-8"),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
