//! Client for the Wikimedia Commons query API.
//!
//! Two operations: generator-based media enumeration for a set of page titles
//! (optionally expanded with their `Category:` counterparts) and a single
//! random-title lookup in the main namespace. Upstream failures are logged
//! and collapse to "no data" — the relay surfaces them as an ordinary empty
//! result, never as a distinct error code.

use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use tracing::warn;

use crate::commons::types::{MediaItem, QueryResponse};

/// Fixed per-request cap on generator results. No pagination: a title with
/// more associated images than this silently loses the remainder.
pub const GENERATOR_IMAGE_LIMIT: u32 = 500;

/// Connect timeout for upstream requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total request timeout for upstream requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a single upstream query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// Per-request knobs for a media query.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Request `extmetadata` so items carry an original-capture date
    pub with_capture_dates: bool,
    /// Request `size` so items carry a byte size (extended variant)
    pub with_sizes: bool,
    /// Also query `Category:<title>` for each input title (extended variant)
    pub expand_categories: bool,
}

/// Wikimedia Commons API client.
#[derive(Debug, Clone)]
pub struct CommonsClient {
    client: reqwest::Client,
    base_url: String,
}

impl CommonsClient {
    /// Create a client against the given API endpoint
    /// (e.g. `https://commons.wikimedia.org/w/api.php`).
    pub fn new(base_url: String) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(CommonsClient { client, base_url })
    }

    /// Enumerate media attached to the pages named by `titles`
    /// (pipe-delimited).
    ///
    /// When `opts.expand_categories` is set, `Category:<title>` is queried
    /// for each individual title and the results are concatenated after the
    /// direct matches; the category sub-queries run concurrently. Any failing
    /// sub-query is logged and contributes nothing.
    pub async fn query_media(&self, titles: &str, opts: QueryOptions) -> Vec<MediaItem> {
        let iiprop = build_iiprop(opts);

        let mut items = match self.query_pages(titles, &iiprop).await {
            Ok(items) => items,
            Err(err) => {
                warn!("media query failed for '{titles}': {err}");
                Vec::new()
            }
        };

        if opts.expand_categories {
            let categories = category_titles(titles);
            let queries = categories.iter().map(|cat| self.query_pages(cat, &iiprop));
            for (cat, result) in categories.iter().zip(join_all(queries).await) {
                match result {
                    Ok(more) => items.extend(more),
                    Err(err) => warn!("category query failed for '{cat}': {err}"),
                }
            }
        }

        items
    }

    /// One generator query: `action=query&generator=images&prop=imageinfo`.
    async fn query_pages(&self, titles: &str, iiprop: &str) -> Result<Vec<MediaItem>, QueryError> {
        let limit = GENERATOR_IMAGE_LIMIT.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "query"),
                ("generator", "images"),
                ("prop", "imageinfo"),
                ("gimlimit", limit.as_str()),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", titles),
                ("iiprop", iiprop),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body: QueryResponse = response.json().await?;
        let Some(query) = body.query else {
            return Ok(Vec::new());
        };

        Ok(query
            .pages
            .into_values()
            .flat_map(|page| page.imageinfo)
            .filter_map(MediaItem::from_imageinfo)
            .collect())
    }

    /// Fetch one random page title from the main content namespace.
    ///
    /// Returns `None` on any failure; the cause is logged, not propagated.
    pub async fn random_title(&self) -> Option<String> {
        match self.fetch_random_title().await {
            Ok(title) => Some(title),
            Err(err) => {
                warn!("random title lookup failed: {err}");
                None
            }
        }
    }

    async fn fetch_random_title(&self) -> Result<String, QueryError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "query"),
                ("list", "random"),
                ("rnnamespace", "0"),
                ("rnlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let body: QueryResponse = response.json().await?;
        body.query
            .and_then(|query| query.random.into_iter().next())
            .map(|page| page.title)
            .ok_or_else(|| QueryError::Malformed("random lookup returned no entries".to_string()))
    }
}

/// Build the `iiprop` parameter for the requested metadata.
fn build_iiprop(opts: QueryOptions) -> String {
    let mut props = String::from("url|mediatype");
    if opts.with_sizes {
        props.push_str("|size");
    }
    if opts.with_capture_dates {
        props.push_str("|extmetadata");
    }
    props
}

/// Derive `Category:` titles from a pipe-delimited title list.
fn category_titles(titles: &str) -> Vec<String> {
    titles
        .split('|')
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(|title| format!("Category:{title}"))
        .collect()
}
