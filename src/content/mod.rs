//! Picks the text that gets summarized for a feed entry.

mod selector;

pub use selector::{select, MIN_FIELD_CHARS};
