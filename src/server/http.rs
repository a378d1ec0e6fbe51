//! HTTP server implementation
//!
//! Implements:
//! - Media relay endpoint (GET /media/:type/raw)
//! - Health check (GET /health)
//!
//! The relay handler runs a single pass per request, no retries: normalize
//! the request, substitute a random title when none was supplied, query
//! upstream, select one item, fetch its bytes, and mirror them to the caller
//! with the upstream content type. Empty selection (including "no titles
//! available") is 404; anything else that fails after normalization is 500.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::commons::{CommonsClient, MediaType, QueryOptions};
use crate::config::RelayConfig;
use crate::media::fetch::{FetchError, FetchResult, MediaFetcher};
use crate::media::select::select_media;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Relay configuration, resolved once at startup
    pub config: Arc<RelayConfig>,
    /// Upstream API client
    pub commons: CommonsClient,
    /// Raw media byte fetcher
    pub fetcher: Arc<MediaFetcher>,
    /// Server start time (Unix timestamp)
    pub start_time: i64,
}

impl AppState {
    /// Build the handler state from a resolved configuration.
    pub fn from_config(config: RelayConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let commons = CommonsClient::new(config.api_base_url.clone())?;
        let fetcher = MediaFetcher::new()?;
        Ok(AppState {
            config: Arc::new(config),
            commons,
            fetcher: Arc::new(fetcher),
            start_time: chrono::Utc::now().timestamp(),
        })
    }
}

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/media/:media_type/raw", get(media_raw_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Failures during one relay pass.
#[derive(Debug, Error)]
enum RelayError {
    #[error("no media matched the request")]
    NotFound,

    #[error("no titles available (none supplied and random lookup failed)")]
    NoTitles,

    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Query parameters accepted by the relay endpoint
#[derive(Debug, Deserialize)]
pub struct RawMediaQuery {
    /// Pipe-delimited page titles; a random title is substituted when absent
    pub titles: Option<String>,
    /// ISO-8601 target timestamp switching selection to nearest-capture mode
    pub timestamp: Option<String>,
}

// ============================================================================
// Health Check
// ============================================================================

/// GET /health - Lightweight liveness probe.
async fn health_handler(State(state): State<AppState>) -> Response {
    let uptime = chrono::Utc::now().timestamp() - state.start_time;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSeconds": uptime,
        })),
    )
        .into_response()
}

// ============================================================================
// Media Relay
// ============================================================================

/// GET /media/:type/raw - Select one media file upstream and relay its bytes.
async fn media_raw_handler(
    State(state): State<AppState>,
    Path(media_type): Path<String>,
    Query(params): Query<RawMediaQuery>,
) -> Response {
    match relay_media(&state, &media_type, &params).await {
        Ok(fetched) => relay_response(fetched),
        Err(err @ (RelayError::NotFound | RelayError::NoTitles)) => {
            debug!("media relay: {err}");
            media_not_found()
        }
        Err(err) => {
            warn!("media relay failed: {err}");
            internal_error()
        }
    }
}

/// One relay pass: normalize, query, select, fetch.
async fn relay_media(
    state: &AppState,
    type_segment: &str,
    params: &RawMediaQuery,
) -> Result<FetchResult, RelayError> {
    let media_type = MediaType::from_route_segment(type_segment);

    let target = match params.timestamp.as_deref() {
        Some(raw) => Some(
            parse_target_timestamp(raw).ok_or_else(|| RelayError::InvalidTimestamp(raw.into()))?,
        ),
        None => None,
    };

    let titles = match params.titles.as_deref() {
        Some(titles) if !titles.trim().is_empty() => titles.to_string(),
        _ => state
            .commons
            .random_title()
            .await
            .ok_or(RelayError::NoTitles)?,
    };

    let extended = state.config.max_media_bytes.is_some();
    let opts = QueryOptions {
        with_capture_dates: target.is_some(),
        with_sizes: extended,
        expand_categories: extended,
    };

    let items = state.commons.query_media(&titles, opts).await;
    let selected = select_media(&items, &media_type, state.config.max_media_bytes, target)
        .ok_or(RelayError::NotFound)?;

    debug!(url = %selected.url, media_type = %selected.media_type, "media selected");
    Ok(state.fetcher.fetch(&selected.url).await?)
}

/// Parse the `timestamp` query parameter: RFC 3339 or a bare date.
fn parse_target_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 200 response mirroring the upstream bytes and content type.
fn relay_response(fetched: FetchResult) -> Response {
    let mut builder = Response::builder().status(StatusCode::OK);

    if let Some(content_type) = &fetched.content_type {
        match HeaderValue::from_str(content_type) {
            Ok(value) => builder = builder.header(header::CONTENT_TYPE, value),
            Err(_) => warn!(content_type = %content_type, "invalid upstream content type, omitting header"),
        }
    }

    builder
        .body(Body::from(fetched.bytes))
        .unwrap_or_else(|_| internal_error())
}

fn media_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Media not found" })),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "An error occurred while processing your request" })),
    )
        .into_response()
}
