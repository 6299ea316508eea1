use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CrawlError;

/// One HTTP (or browser) retrieval, performed by C6.
///
/// Not `Clone` on purpose: a `Fetcher` owns its client/driver and must not
/// be shared across concurrent fetch paths — each worker builds its own.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Human-readable name, used only for logging ("static" / "browser").
    fn name(&self) -> &str;

    async fn fetch(&self, url: &Url, config: &FetchConfig) -> Result<FetchResult, CrawlError>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub max_body_size: usize,
    pub follow_redirects: bool,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            follow_redirects: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (AdvancedCrawler/1.0)".to_string(),
        }
    }
}

/// Result of one fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: Url,
    pub status: u16,
    pub response_time_ms: u64,
    pub content_type: Option<String>,
    pub encoding: Option<String>,
    pub content_length: Option<i64>,
    pub redirect_chain: Vec<String>,
    pub body: Vec<u8>,
    /// Elements harvested by the browser fetcher variant's dynamic-link
    /// query. Empty for the static fetcher.
    pub dynamic_links: Vec<DynamicElement>,
}

/// One element matched by the browser fetcher's
/// `@onclick or @href or class contains 'link' or class contains 'btn'`
/// harvesting query.
#[derive(Debug, Clone)]
pub struct DynamicElement {
    pub href: Option<String>,
    pub onclick: Option<String>,
    pub text: Option<String>,
}

/// Kind tag for a Link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Anchor,
    LinkTag,
    Form,
    Iframe,
    Onclick,
    Javascript,
    Dynamic,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Anchor => "anchor",
            LinkKind::LinkTag => "link_tag",
            LinkKind::Form => "form",
            LinkKind::Iframe => "iframe",
            LinkKind::Onclick => "onclick",
            LinkKind::Javascript => "javascript",
            LinkKind::Dynamic => "dynamic",
        }
    }
}

/// A directed edge from a source Page to a target URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub target_url: String,
    pub link_text: Option<String>,
    pub link_title: Option<String>,
    pub kind: LinkKind,
    pub rel: Option<String>,
    pub is_internal: bool,
    pub is_external: bool,
    pub is_follow: bool,
    pub detected_method: &'static str,
    pub href_attribute: Option<String>,
    pub aria_label: Option<String>,
    pub data_attributes: HashMap<String, String>,
    pub surrounding_text: Option<String>,
    pub onclick_handler: Option<String>,
    pub is_javascript: bool,
    pub is_dynamic: bool,
}

/// Kind tag for a Resource record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    Video,
    Audio,
    Document,
    Script,
    Stylesheet,
    Favicon,
    EmbeddedIframe,
    EmbeddedEmbed,
    EmbeddedObject,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::Video => "video",
            ResourceKind::Audio => "audio",
            ResourceKind::Document => "document",
            ResourceKind::Script => "script",
            ResourceKind::Stylesheet => "stylesheet",
            ResourceKind::Favicon => "favicon",
            ResourceKind::EmbeddedIframe => "embedded_iframe",
            ResourceKind::EmbeddedEmbed => "embedded_embed",
            ResourceKind::EmbeddedObject => "embedded_object",
        }
    }
}

/// A non-navigation asset referenced by a Page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub kind: ResourceKind,
    pub source_tag: &'static str,
    pub source_attribute: &'static str,
    pub alt_text: Option<String>,
    pub media_keywords: String,
}

/// Open Graph + page-level metadata harvested by the Page Processor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub robots_meta: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_type: Option<String>,
    pub twitter_card: Option<String>,
    pub language: Option<String>,
}

/// Output of the HTML parse step: everything the Page Processor (C7) needs
/// before it does internal/external classification and Store writes.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub metadata: PageMetadata,
    pub links: Vec<Link>,
    pub resources: Vec<Resource>,
}

/// Post-fetch fields written by `update_page_crawl`.
#[derive(Debug, Clone)]
pub struct PageUpdate {
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub encoding: Option<String>,
    pub final_url: Option<String>,
    pub redirect_chain: Vec<String>,
    pub metadata: PageMetadata,
    pub error_message: Option<String>,
}

impl PageUpdate {
    pub fn error(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status_code: status,
            response_time_ms: None,
            content_type: None,
            content_length: None,
            encoding: None,
            final_url: None,
            redirect_chain: Vec::new(),
            metadata: PageMetadata::default(),
            error_message: Some(message.into()),
        }
    }
}

/// A page admitted as a new internal (or external, depth 0) URL, emitted by
/// the Page Processor for the Worker Pool to enqueue.
#[derive(Debug, Clone)]
pub struct PageAdmission {
    pub raw_url: String,
    pub canonical_url: String,
    pub parent_url: Option<String>,
    pub depth: u32,
    pub is_internal: bool,
}

/// One item of frontier work.
#[derive(Debug, Clone)]
pub struct FrontierItem {
    pub page_id: i64,
    pub url: String,
    pub depth: u32,
}
