//! Raw media byte fetching.
//!
//! Fetches the selected media URL with a bounded timeout and a streaming size
//! cap, and captures the upstream `Content-Type` so the relay can mirror it.
//! The cap here bounds relay memory per request; it is independent of the
//! extended variant's selection-time size filter.

use std::time::Duration;

use thiserror::Error;

/// Maximum URL length (2KB)
pub const MAX_URL_LENGTH: usize = 2048;

/// Default fetch timeout in milliseconds (30s)
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Maximum fetch timeout in milliseconds (5 minutes)
pub const MAX_FETCH_TIMEOUT_MS: u64 = 300_000;

/// Default maximum response size (50MB)
pub const DEFAULT_MAX_RELAY_BYTES: u64 = 50 * 1024 * 1024;

/// Errors that can occur while fetching media bytes
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("URL too long: {size} chars (max {max})")]
    UrlTooLong { size: usize, max: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("Media server returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("Response too large: {size} bytes (max {max})")]
    ResponseTooLarge { size: u64, max: u64 },

    #[error("Stream read error: {0}")]
    StreamRead(String),
}

/// Result of a successful media fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The fetched bytes
    pub bytes: Vec<u8>,

    /// Content-Type from response headers, if present
    pub content_type: Option<String>,

    /// Actual size of the fetched content
    pub size: u64,
}

/// Configuration for media fetching
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum response size in bytes (default: 50MB)
    pub max_size: u64,

    /// Request timeout in milliseconds (default: 30s, max: 5min)
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_RELAY_BYTES,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

impl FetchConfig {
    /// Create a new config with custom max size
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Create a new config with custom timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms.min(MAX_FETCH_TIMEOUT_MS);
        self
    }
}

/// Media byte fetcher.
///
/// Follows redirects (upload servers redirect between mirrors) and accepts
/// plain `http` alongside `https`: the URLs come from the upstream API
/// response, not from the caller, and must be fetched verbatim.
pub struct MediaFetcher {
    config: FetchConfig,
    client: reqwest::Client,
}

impl MediaFetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(FetchConfig::default())
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(config: FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_millis(config.timeout_ms.min(MAX_FETCH_TIMEOUT_MS));
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::HttpRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Fetch a media URL's raw bytes.
    ///
    /// Validates the URL, prechecks `Content-Length` against the configured
    /// cap, then streams the body enforcing the same cap, so an unbounded or
    /// lying upstream cannot exhaust memory.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        if url.len() > MAX_URL_LENGTH {
            return Err(FetchError::UrlTooLong {
                size: url.len(),
                max: MAX_URL_LENGTH,
            });
        }

        let parsed = url::Url::parse(url)
            .map_err(|_| FetchError::InvalidUrl("invalid media URL".to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::HttpRequest(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.config.max_size {
                return Err(FetchError::ResponseTooLarge {
                    size: content_length,
                    max: self.config.max_size,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = self.read_with_limit(response).await?;
        let size = bytes.len() as u64;

        Ok(FetchResult {
            bytes,
            content_type,
            size,
        })
    }

    /// Read the response body, failing once it exceeds the configured cap.
    async fn read_with_limit(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        use futures_util::StreamExt;

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result
                .map_err(|e| FetchError::StreamRead(format!("failed to read chunk: {e}")))?;

            let new_size = body.len() as u64 + chunk.len() as u64;
            if new_size > self.config.max_size {
                return Err(FetchError::ResponseTooLarge {
                    size: new_size,
                    max: self.config.max_size,
                });
            }

            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_config_defaults() {
        let config = FetchConfig::default();
        assert_eq!(config.max_size, DEFAULT_MAX_RELAY_BYTES);
        assert_eq!(config.timeout_ms, DEFAULT_FETCH_TIMEOUT_MS);
    }

    #[test]
    fn fetch_config_builder() {
        let config = FetchConfig::default()
            .with_max_size(10 * 1024 * 1024)
            .with_timeout_ms(60_000);
        assert_eq!(config.max_size, 10 * 1024 * 1024);
        assert_eq!(config.timeout_ms, 60_000);
    }

    #[test]
    fn fetch_config_timeout_capped() {
        let config = FetchConfig::default().with_timeout_ms(MAX_FETCH_TIMEOUT_MS + 100_000);
        assert_eq!(config.timeout_ms, MAX_FETCH_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn fetch_rejects_overlong_url() {
        let fetcher = MediaFetcher::new().unwrap();
        let long_url = format!("https://example.com/{}", "x".repeat(MAX_URL_LENGTH));
        let result = fetcher.fetch(&long_url).await;
        assert!(matches!(result, Err(FetchError::UrlTooLong { .. })));
    }

    #[tokio::test]
    async fn fetch_rejects_file_scheme() {
        let fetcher = MediaFetcher::new().unwrap();
        let result = fetcher.fetch("file:///etc/passwd").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn fetch_rejects_ftp_scheme() {
        let fetcher = MediaFetcher::new().unwrap();
        let result = fetcher.fetch("ftp://ftp.example.com/file").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn fetch_rejects_unparseable_url() {
        let fetcher = MediaFetcher::new().unwrap();
        let result = fetcher.fetch("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
