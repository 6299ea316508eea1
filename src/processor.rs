//! Page Processor (C7): turns one `FetchResult` into a `PageUpdate` plus
//! the internal-link admissions the Worker Pool should enqueue. External
//! links and resources are written straight to the Store here; only
//! internal links go through the admission/enqueue dance.

use anyhow::Result;
use url::Url;

use webcrawler_core::{FetchResult, FrontierItem, PageAdmission, PageUpdate};
use webcrawler_normalize::{canonicalize, TrapDetector};
use webcrawler_storage::Storage;

pub async fn process_page(
    item: &FrontierItem,
    current_url: &Url,
    fetch: &FetchResult,
    storage: &Storage,
    trap_detector: &TrapDetector,
    max_depth: u32,
) -> Result<(PageUpdate, Vec<PageAdmission>)> {
    let mut update = PageUpdate {
        status_code: Some(fetch.status),
        response_time_ms: Some(fetch.response_time_ms),
        content_type: fetch.content_type.clone(),
        content_length: fetch.content_length,
        encoding: fetch.encoding.clone(),
        final_url: Some(fetch.final_url.to_string()),
        redirect_chain: fetch.redirect_chain.clone(),
        metadata: Default::default(),
        error_message: None,
    };

    let mut admissions = Vec::new();

    if fetch.status != 200 || fetch.body.is_empty() {
        return Ok((update, admissions));
    }

    let body = String::from_utf8_lossy(&fetch.body).into_owned();
    let parsed = webcrawler_parser::parse_page(&body, current_url, &fetch.dynamic_links);
    update.metadata = parsed.metadata;

    for link in &parsed.links {
        storage.add_link(item.page_id, link).await?;

        let Some(canonical) = canonicalize(&link.target_url, current_url) else {
            continue;
        };
        let Ok(canonical_url) = Url::parse(&canonical) else {
            continue;
        };
        if trap_detector.is_trap(&canonical_url) {
            continue;
        }

        if link.is_internal {
            let new_depth = item.depth + 1;
            if new_depth <= max_depth {
                admissions.push(PageAdmission {
                    raw_url: link.target_url.clone(),
                    canonical_url: canonical,
                    parent_url: Some(current_url.to_string()),
                    depth: new_depth,
                    is_internal: true,
                });
            }
        } else {
            // External links become depth-0 Page rows directly, never
            // queued for crawling.
            storage
                .add_page(&link.target_url, &canonical, Some(current_url.as_str()), 0)
                .await?;
        }
    }

    for resource in &parsed.resources {
        storage.add_resource(item.page_id, resource).await?;
    }

    Ok((update, admissions))
}
