//! Summary acquisition and cleanup.
//!
//! - [`client`] - OpenAI-compatible chat-completion client
//! - [`summarizer`] - retrying front end with the extractive fallback
//! - [`fallback`] - leading-sentence extraction
//! - [`normalizer`] - strips reasoning leakage from model output

mod client;
mod fallback;
mod normalizer;
mod summarizer;

pub use client::{
    ChatMessage, ChatRequest, CompletionClient, CompletionError, HttpCompletionClient,
};
pub use fallback::extractive_summary;
pub use normalizer::{Normalized, Normalizer, Rejection};
pub use summarizer::{Summarizer, Summary};
