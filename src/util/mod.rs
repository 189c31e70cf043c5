//! Text helpers shared by the content selector, the extractive fallback and
//! the summary normalizer.
//!
//! All lengths are measured in characters, never bytes, so CJK text and
//! ASCII text are limited the same way.

mod text;

pub use text::{
    char_len, complete_sentences, ends_with_any, strip_markup, truncate_chars, SENTENCE_TERMINALS,
};
