//! Aggregates news feeds and attaches a short, cleaned-up summary to each
//! article.
//!
//! An aggregation pass fetches every configured [`Source`](types::Source)
//! concurrently, picks the best text of each entry, asks a text-generation
//! service for a summary (or extracts one locally), strips reasoning leakage
//! from the answer and returns the surviving items newest first.

pub mod aggregate;
pub mod config;
pub mod content;
pub mod feed;
pub mod summary;
pub mod types;
pub mod util;
