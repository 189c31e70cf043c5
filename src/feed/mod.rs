//! Feed retrieval for aggregation passes.
//!
//! - [`parser`] - RSS/Atom/JSON Feed documents to [`RawEntry`](crate::types::RawEntry) via `feed-rs`
//! - [`fetcher`] - HTTP retrieval with retry, size limits and the per-source entry cap

mod fetcher;
mod parser;

pub use fetcher::{fetch_source, FeedClient, FetchError, HttpFeedClient};
pub use parser::parse_feed;
