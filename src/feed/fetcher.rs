use crate::config::FetchConfig;
use crate::feed::parser::parse_feed;
use crate::types::{RawEntry, Source};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while turning a feed URL into entries.
///
/// Every variant is scoped to one source: the aggregator logs it and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Server returned 429 Too Many Requests after max retries
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Feed document could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Feed parsed but contained no items
    #[error("Feed has no items")]
    Empty,
}

/// Turns a feed URL into parsed entries.
///
/// The aggregator only depends on this contract, so tests substitute canned
/// entries or scripted failures for the HTTP implementation.
#[async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<RawEntry>, FetchError>;
}

/// [`FeedClient`] backed by `reqwest` and `feed-rs`.
///
/// Rate limiting (429) and server errors (5xx) are retried with exponential
/// backoff; 4xx errors fail immediately.
#[derive(Clone)]
pub struct HttpFeedClient {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    max_bytes: usize,
}

impl HttpFeedClient {
    pub fn new(client: reqwest::Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            max_bytes: config.max_feed_bytes,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut retry_count = 0;

        loop {
            let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            let status = response.status();
            let retryable =
                status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

            if retryable {
                if retry_count >= self.max_retries {
                    return Err(if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        FetchError::RateLimited(self.max_retries)
                    } else {
                        FetchError::HttpStatus(status.as_u16())
                    });
                }

                let delay_secs = 1u64 << retry_count; // 1s, 2s, 4s
                tracing::warn!(
                    feed = %url,
                    status = %status,
                    retry = retry_count + 1,
                    delay_secs = delay_secs,
                    "Feed request failed, retrying after delay"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::HttpStatus(status.as_u16()));
            }

            return read_limited_bytes(response, self.max_bytes).await;
        }
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_and_parse(&self, url: &str) -> Result<Vec<RawEntry>, FetchError> {
        let bytes = self.download(url).await?;
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Fetches one source and caps the number of entries handed downstream.
///
/// Each entry costs a summarization call, so the cap bounds the work of a pass.
pub async fn fetch_source(
    client: &dyn FeedClient,
    source: &Source,
    max_entries: usize,
) -> Result<Vec<RawEntry>, FetchError> {
    let mut entries = client.fetch_and_parse(&source.url).await?;
    if entries.is_empty() {
        return Err(FetchError::Empty);
    }

    let found = entries.len();
    entries.truncate(max_entries);
    tracing::debug!(
        source = %source.name,
        found = found,
        kept = entries.len(),
        "Fetched feed"
    );
    Ok(entries)
}
