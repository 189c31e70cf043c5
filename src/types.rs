//! Data model shared by every stage of an aggregation pass.
//!
//! Nothing here is persisted: a [`RawEntry`] is produced by a fetch, turned into
//! at most one [`NewsItem`], and dropped when the pass returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured feed: a short identifier plus the URL of its RSS/Atom document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One article as it came out of the feed document.
///
/// Every field is optional. The four content fields are listed in the order
/// the content selector prefers them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    /// `content:encoded` in RSS, HTML `<content>` in Atom.
    pub content_encoded: Option<String>,
    /// Plain-text `<content>` body.
    pub content: Option<String>,
    /// RSS `<description>` / Atom `<summary>`.
    pub description: Option<String>,
    /// Media namespace description (`media:description`).
    pub snippet: Option<String>,
}

/// The externally visible unit of an aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    /// RFC 3339 rendering of [`NewsItem::published`].
    pub pub_date: String,
    pub summary: String,
    /// Sort key. Falls back to the fetch time when the entry carried no date.
    #[serde(skip)]
    pub published: DateTime<Utc>,
}

impl NewsItem {
    pub fn new(
        title: String,
        link: String,
        source: String,
        published: DateTime<Utc>,
        summary: String,
    ) -> Self {
        Self {
            title,
            link,
            source,
            pub_date: published.to_rfc3339(),
            summary,
            published,
        }
    }
}

/// JSON body emitted by the binary: `{ "feeds": [...] }` on success,
/// `{ "error": "...", "feeds": [] }` on total failure.
#[derive(Debug, Serialize)]
pub struct FeedsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub feeds: Vec<NewsItem>,
}

impl FeedsResponse {
    pub fn ok(feeds: Vec<NewsItem>) -> Self {
        Self { error: None, feeds }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            feeds: Vec::new(),
        }
    }
}
