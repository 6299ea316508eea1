//! Store (C8). Durable, transactional, safe for concurrent callers on a
//! single process. Grounded on the teacher's `crates/storage/src/lib.rs`:
//! `PgPoolOptions` setup, embedded-migration-via-`include_str!`+
//! `sqlx::raw_sql`, and the dedup-then-re-lookup `ON CONFLICT` pattern
//! (carried over for `add_page`/`add_link`; links/resources are inserted
//! one at a time rather than batched, since there's no per-page fan-out
//! large enough to need the teacher's `UNNEST`-array idiom here).

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;
use url::Url;

use webcrawler_core::hash::sha256_hex;
use webcrawler_core::{FrontierItem, Link, PageUpdate, Resource};

#[derive(Clone)]
pub struct Storage {
    pool: PgPool,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_pool_size(database_url, 20).await
    }

    pub async fn with_pool_size(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql"))
            .execute(&self.pool)
            .await?;
        info!("migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert if `normalized_url`'s hash is not present; otherwise return
    /// the existing id. Idempotent and tolerant of concurrent insertion
    /// races. `url`, `url_hash` and `normalized_url_hash` are each unique,
    /// but only `normalized_url_hash` is named as the conflict target: a
    /// repeated `raw_url` always hashes to the same `url_hash` and, since
    /// `normalized_url` is a pure function of `raw_url`, the same
    /// `normalized_url_hash` too, so the arbiter below always catches the
    /// conflict before the other two unique indexes are ever reached.
    pub async fn add_page(
        &self,
        raw_url: &str,
        normalized_url: &str,
        parent_url: Option<&str>,
        depth: u32,
    ) -> Result<i64> {
        let url_hash = sha256_hex(raw_url);
        let normalized_url_hash = sha256_hex(normalized_url);
        let parsed = Url::parse(normalized_url).ok();
        let domain = parsed.as_ref().and_then(|u| u.host_str()).unwrap_or("").to_string();
        let scheme = parsed.as_ref().map(|u| u.scheme().to_string());
        let path = parsed.as_ref().map(|u| u.path().to_string());
        let query_string = parsed.as_ref().and_then(|u| u.query()).map(|s| s.to_string());
        let fragment = parsed.as_ref().and_then(|u| u.fragment()).map(|s| s.to_string());

        let inserted: Option<(i64,)> = sqlx::query_as(
            r#"INSERT INTO pages (url, url_hash, normalized_url, normalized_url_hash, domain,
                                   scheme, path, query_string, fragment, parent_url, crawl_depth)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               ON CONFLICT (normalized_url_hash) DO NOTHING
               RETURNING id"#,
        )
        .bind(raw_url)
        .bind(&url_hash)
        .bind(normalized_url)
        .bind(&normalized_url_hash)
        .bind(&domain)
        .bind(&scheme)
        .bind(&path)
        .bind(&query_string)
        .bind(&fragment)
        .bind(parent_url)
        .bind(depth as i32)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id,)) = inserted {
            return Ok(id);
        }

        // Lost the race (or the row already existed) — recover the
        // winner's identity.
        let (id,): (i64,) = sqlx::query_as("SELECT id FROM pages WHERE normalized_url_hash = $1")
            .bind(&normalized_url_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Sets `first_crawled_at` (if null), `last_crawled_at`, increments
    /// `crawl_count`, sets `is_crawled=1`, writes all FetchResult-derived
    /// fields.
    pub async fn update_page_crawl(&self, id: i64, update: &PageUpdate) -> Result<()> {
        let redirect_chain = serde_json::to_value(&update.redirect_chain)?;
        sqlx::query(
            r#"UPDATE pages SET
                   first_crawled_at = COALESCE(first_crawled_at, now()),
                   last_crawled_at = now(),
                   crawl_count = crawl_count + 1,
                   is_crawled = 1,
                   status_code = $2,
                   response_time_ms = $3,
                   content_type = $4,
                   content_length = $5,
                   encoding = $6,
                   redirect_url = $7,
                   redirect_chain = $8,
                   title = $9,
                   meta_description = $10,
                   meta_keywords = $11,
                   canonical_url = $12,
                   robots_meta = $13,
                   og_title = $14,
                   og_description = $15,
                   og_image = $16,
                   og_type = $17,
                   twitter_card = $18,
                   language = $19,
                   error_message = $20
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(update.status_code.map(|s| s as i32))
        .bind(update.response_time_ms.map(|v| v as i64))
        .bind(&update.content_type)
        .bind(update.content_length)
        .bind(&update.encoding)
        .bind(&update.final_url)
        .bind(redirect_chain)
        .bind(&update.metadata.title)
        .bind(&update.metadata.meta_description)
        .bind(&update.metadata.meta_keywords)
        .bind(&update.metadata.canonical_url)
        .bind(&update.metadata.robots_meta)
        .bind(&update.metadata.og_title)
        .bind(&update.metadata.og_description)
        .bind(&update.metadata.og_image)
        .bind(&update.metadata.og_type)
        .bind(&update.metadata.twitter_card)
        .bind(&update.metadata.language)
        .bind(&update.error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Idempotent on `(source_page_id, target_url_hash)`; duplicates
    /// silently ignored.
    pub async fn add_link(&self, source_page_id: i64, link: &Link) -> Result<()> {
        let target_url_hash = sha256_hex(&link.target_url);
        let data_attributes = serde_json::to_value(&link.data_attributes)?;
        sqlx::query(
            r#"INSERT INTO links (source_page_id, target_url, target_url_hash, link_text,
                                   link_title, link_type, link_rel, is_internal, is_follow,
                                   is_external, detected_method, is_javascript, is_dynamic,
                                   onclick_handler, href_attribute, data_attributes, aria_label,
                                   surrounding_text)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
               ON CONFLICT (source_page_id, target_url_hash) DO NOTHING"#,
        )
        .bind(source_page_id)
        .bind(&link.target_url)
        .bind(&target_url_hash)
        .bind(&link.link_text)
        .bind(&link.link_title)
        .bind(link.kind.as_str())
        .bind(&link.rel)
        .bind(link.is_internal)
        .bind(link.is_follow)
        .bind(link.is_external)
        .bind(link.detected_method)
        .bind(link.is_javascript)
        .bind(link.is_dynamic)
        .bind(&link.onclick_handler)
        .bind(&link.href_attribute)
        .bind(data_attributes)
        .bind(&link.aria_label)
        .bind(&link.surrounding_text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append-only.
    pub async fn add_resource(&self, page_id: i64, resource: &Resource) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO resources (page_id, resource_url, resource_type, source_tag,
                                       source_attribute, alt_text, media_keywords)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(page_id)
        .bind(&resource.url)
        .bind(resource.kind.as_str())
        .bind(resource.source_tag)
        .bind(resource.source_attribute)
        .bind(&resource.alt_text)
        .bind(&resource.media_keywords)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Next `is_crawled=0` row ordered by `crawl_depth` ascending then
    /// `discovered_at` ascending, optionally filtered to a host.
    pub async fn next_uncrawled(&self, domain: Option<&str>) -> Result<Option<FrontierItem>> {
        let row = match domain {
            Some(d) => {
                sqlx::query("SELECT id, url, crawl_depth FROM pages WHERE is_crawled = 0 AND domain = $1 ORDER BY crawl_depth ASC, discovered_at ASC LIMIT 1")
                    .bind(d)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT id, url, crawl_depth FROM pages WHERE is_crawled = 0 ORDER BY crawl_depth ASC, discovered_at ASC LIMIT 1")
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(|r| FrontierItem {
            page_id: r.get("id"),
            url: r.get("url"),
            depth: r.get::<i32, _>("crawl_depth") as u32,
        }))
    }

    pub async fn reset_domain(&self, host: &str) -> Result<()> {
        sqlx::query("UPDATE pages SET is_crawled = 0 WHERE domain = $1")
            .bind(host)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Cascade-deletes links and resources via `ON DELETE CASCADE`.
    pub async fn delete_domain(&self, host: &str) -> Result<()> {
        sqlx::query("DELETE FROM pages WHERE domain = $1")
            .bind(host)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn distinct_domains(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT domain FROM pages ORDER BY domain")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    pub async fn count_pages(&self, domain: Option<&str>) -> Result<i64> {
        self.count_where("", domain).await
    }

    pub async fn count_crawled(&self, domain: Option<&str>) -> Result<i64> {
        self.count_where("is_crawled = 1", domain).await
    }

    pub async fn count_uncrawled(&self, domain: Option<&str>) -> Result<i64> {
        self.count_where("is_crawled = 0", domain).await
    }

    async fn count_where(&self, predicate: &str, domain: Option<&str>) -> Result<i64> {
        let (sql, bind_domain) = match (predicate.is_empty(), domain) {
            (true, None) => ("SELECT COUNT(*) FROM pages".to_string(), None),
            (true, Some(d)) => ("SELECT COUNT(*) FROM pages WHERE domain = $1".to_string(), Some(d)),
            (false, None) => (format!("SELECT COUNT(*) FROM pages WHERE {predicate}"), None),
            (false, Some(d)) => (
                format!("SELECT COUNT(*) FROM pages WHERE {predicate} AND domain = $1"),
                Some(d),
            ),
        };
        let row: (i64,) = match bind_domain {
            Some(d) => sqlx::query_as(&sql).bind(d).fetch_one(&self.pool).await?,
            None => sqlx::query_as(&sql).fetch_one(&self.pool).await?,
        };
        Ok(row.0)
    }
}
