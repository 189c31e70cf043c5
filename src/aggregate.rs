//! One aggregation pass: every source, every entry, one sorted list.
//!
//! Sources are fetched concurrently and the entries of a source are summarized
//! concurrently, all on the caller's task. Failures stay where they happen: a
//! broken feed contributes no items, a rejected summary drops its entry, and
//! neither affects any sibling.

use crate::config::Config;
use crate::content::select;
use crate::feed::{fetch_source, FeedClient, HttpFeedClient};
use crate::summary::{HttpCompletionClient, Normalized, Normalizer, Summarizer, Summary};
use crate::types::{NewsItem, RawEntry, Source};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Nothing to aggregate.
    #[error("No feed sources configured")]
    NoSources,
    #[error("Invalid normalizer pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub struct Aggregator {
    feeds: Arc<dyn FeedClient>,
    summarizer: Summarizer,
    normalizer: Normalizer,
    entries_per_source: usize,
}

impl Aggregator {
    pub fn new(
        feeds: Arc<dyn FeedClient>,
        summarizer: Summarizer,
        normalizer: Normalizer,
        entries_per_source: usize,
    ) -> Self {
        Self {
            feeds,
            summarizer,
            normalizer,
            entries_per_source,
        }
    }

    /// Wires the HTTP clients described by `config`.
    ///
    /// Summaries are extractive when `offline` is set or no API key is
    /// configured.
    pub fn from_config(config: &Config, offline: bool) -> Result<Self, AggregateError> {
        let http = reqwest::Client::builder()
            .user_agent(&config.fetch.user_agent)
            .connect_timeout(Duration::from_secs(config.fetch.timeout_secs))
            .build()?;

        let feeds = Arc::new(HttpFeedClient::new(http.clone(), &config.fetch));

        let summarizer = match config.api_key() {
            Some(key) if !offline => {
                let client = HttpCompletionClient::new(
                    http,
                    &config.summarizer.base_url,
                    key,
                    Duration::from_secs(config.summarizer.timeout_secs),
                );
                Summarizer::new(Some(Arc::new(client)), config.summarizer.clone())
            }
            Some(_) => {
                tracing::info!("Offline mode, using extractive summaries");
                Summarizer::offline(config.summarizer.clone())
            }
            None => {
                tracing::info!("No API key configured, using extractive summaries");
                Summarizer::offline(config.summarizer.clone())
            }
        };

        let normalizer = Normalizer::new(&config.normalizer)?;

        Ok(Self::new(
            feeds,
            summarizer,
            normalizer,
            config.entries_per_source,
        ))
    }

    /// Runs one pass over `sources` and returns the items newest first.
    ///
    /// Fails only when `sources` is empty. Entries without a date are stamped
    /// with the time the pass started.
    pub async fn aggregate(&self, sources: &[Source]) -> Result<Vec<NewsItem>, AggregateError> {
        if sources.is_empty() {
            return Err(AggregateError::NoSources);
        }

        let fetched_at = Utc::now();
        let per_source: Vec<Vec<NewsItem>> = stream::iter(sources)
            .map(|source| self.process_source(source, fetched_at))
            .buffer_unordered(sources.len())
            .collect()
            .await;

        let mut items: Vec<NewsItem> = per_source.into_iter().flatten().collect();
        items.sort_by(|a, b| b.published.cmp(&a.published));

        tracing::info!(
            sources = sources.len(),
            items = items.len(),
            "Aggregation complete"
        );
        Ok(items)
    }

    async fn process_source(&self, source: &Source, fetched_at: DateTime<Utc>) -> Vec<NewsItem> {
        let entries = match fetch_source(self.feeds.as_ref(), source, self.entries_per_source).await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "Failed to fetch source");
                return Vec::new();
            }
        };

        let items: Vec<NewsItem> = futures::future::join_all(
            entries
                .into_iter()
                .map(|entry| self.process_entry(source, entry, fetched_at)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        tracing::debug!(source = %source.name, items = items.len(), "Processed source");
        items
    }

    async fn process_entry(
        &self,
        source: &Source,
        entry: RawEntry,
        fetched_at: DateTime<Utc>,
    ) -> Option<NewsItem> {
        let title = entry.title.as_deref().map(str::trim).unwrap_or_default();
        let link = entry.link.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || link.is_empty() {
            tracing::debug!(source = %source.name, "Skipping entry without title or link");
            return None;
        }

        let content = select(&entry);
        if content.is_empty() {
            tracing::debug!(source = %source.name, link = %link, "Skipping entry without content");
            return None;
        }

        let summary = match self.summarizer.summarize(&content).await {
            Summary::Generated(raw) => match self.normalizer.normalize(&raw) {
                Normalized::Accepted(text) => text,
                Normalized::Rejected(reason) => {
                    tracing::debug!(
                        source = %source.name,
                        link = %link,
                        reason = %reason,
                        "Summary rejected"
                    );
                    return None;
                }
            },
            Summary::Fallback(text) => text,
            Summary::Unavailable => {
                tracing::debug!(source = %source.name, link = %link, "No summary available");
                return None;
            }
        };

        Some(NewsItem::new(
            title.to_string(),
            link.to_string(),
            source.name.clone(),
            entry.published.unwrap_or(fetched_at),
            summary,
        ))
    }
}
