use crate::config::NormalizerConfig;
use crate::util::{char_len, complete_sentences, ends_with_any};
use regex::Regex;
use std::fmt;

/// Why a model response was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The response exposes reasoning or the prompt's own instructions.
    LeakageKeyword(String),
    /// Unwrapped text with no punctuation-terminated sentence to keep.
    NoCompleteSentence,
    /// Nothing left after cleaning.
    Empty,
    /// A delimiter tag survived extraction.
    TagResidue,
    /// Longer than the configured maximum, in characters.
    TooLong(usize),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LeakageKeyword(k) => write!(f, "leakage keyword {k:?}"),
            Rejection::NoCompleteSentence => f.write_str("no complete sentence"),
            Rejection::Empty => f.write_str("empty"),
            Rejection::TagResidue => f.write_str("tag residue"),
            Rejection::TooLong(n) => write!(f, "too long ({n} chars)"),
        }
    }
}

/// Outcome of [`Normalizer::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Accepted(String),
    Rejected(Rejection),
}

impl Normalized {
    /// The accepted text, or `""` for a rejection.
    pub fn as_str(&self) -> &str {
        match self {
            Normalized::Accepted(text) => text,
            Normalized::Rejected(_) => "",
        }
    }

    pub fn into_accepted(self) -> Option<String> {
        match self {
            Normalized::Accepted(text) => Some(text),
            Normalized::Rejected(_) => None,
        }
    }
}

/// Cleans raw model output into one bounded, punctuation-terminated summary.
///
/// The word lists and limits come from [`NormalizerConfig`]; the regex for
/// discourse markers is compiled once here and reused for every entry.
#[derive(Debug, Clone)]
pub struct Normalizer {
    open_tag: String,
    close_tag: String,
    strip_prefix: String,
    terminal_marks: Vec<char>,
    default_mark: char,
    min_chars: usize,
    max_chars: usize,
    /// Matches a marker and the rest of its sentence. `None` with no markers.
    marker_sentence: Option<Regex>,
    leakage_keywords: Vec<String>,
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self, regex::Error> {
        let terminal_marks: Vec<char> = config.terminal_marks.chars().collect();

        let mut markers: Vec<&str> = config
            .discourse_markers
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();
        // Leftmost-first alternation: try "现在开始处理" before "现在".
        markers.sort_by_key(|m| std::cmp::Reverse(char_len(m)));

        let marker_sentence = if markers.is_empty() || terminal_marks.is_empty() {
            None
        } else {
            let alternation = markers
                .iter()
                .map(|m| regex::escape(m))
                .collect::<Vec<_>>()
                .join("|");
            let class = regex::escape(&config.terminal_marks);
            Some(Regex::new(&format!("(?:{alternation})[^{class}]*[{class}]"))?)
        };

        Ok(Self {
            open_tag: format!("<{}>", config.tag),
            close_tag: format!("</{}>", config.tag),
            strip_prefix: config.strip_prefix.clone(),
            terminal_marks,
            default_mark: config.default_mark,
            min_chars: config.min_chars,
            max_chars: config.max_chars,
            marker_sentence,
            leakage_keywords: config
                .leakage_keywords
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        })
    }

    pub fn normalize(&self, raw: &str) -> Normalized {
        match self.clean(raw) {
            Ok(text) => Normalized::Accepted(text),
            Err(reason) => Normalized::Rejected(reason),
        }
    }

    fn clean(&self, raw: &str) -> Result<String, Rejection> {
        let text = raw.trim();
        let text = if self.strip_prefix.is_empty() {
            text
        } else {
            text.strip_prefix(self.strip_prefix.as_str())
                .unwrap_or(text)
                .trim_start()
        };

        let text = match &self.marker_sentence {
            Some(re) => re.replace_all(text, ""),
            None => text.into(),
        };
        let text = text.trim();

        self.check_leakage(text)?;

        let wrapped = if self.is_wrapped(text) {
            text.to_string()
        } else {
            let body = if ends_with_any(text, &self.terminal_marks) {
                text.to_string()
            } else {
                let kept = complete_sentences(text, &self.terminal_marks).concat();
                let kept = kept.trim();
                if kept.is_empty() {
                    return Err(Rejection::NoCompleteSentence);
                }
                kept.to_string()
            };
            format!("{}{}{}", self.open_tag, body, self.close_tag)
        };

        let payload = self.payload(&wrapped);
        let untagged = wrapped
            .replace(&self.open_tag, "")
            .replace(&self.close_tag, "");
        let untagged = untagged.trim();

        // A short payload usually means the model put the summary outside the tags.
        let candidate = if char_len(payload) < self.min_chars && char_len(&wrapped) > self.min_chars
        {
            untagged
        } else {
            payload
        };

        if candidate.is_empty() {
            return Err(Rejection::Empty);
        }
        if candidate.contains(&self.open_tag) || candidate.contains(&self.close_tag) {
            return Err(Rejection::TagResidue);
        }
        self.check_leakage(candidate)?;

        let mut summary = candidate.to_string();
        if !ends_with_any(&summary, &self.terminal_marks) {
            summary.push(self.default_mark);
        }

        let len = char_len(&summary);
        if len > self.max_chars {
            return Err(Rejection::TooLong(len));
        }
        Ok(summary)
    }

    fn check_leakage(&self, text: &str) -> Result<(), Rejection> {
        match self.leakage_keywords.iter().find(|k| text.contains(k.as_str())) {
            Some(keyword) => Err(Rejection::LeakageKeyword(keyword.clone())),
            None => Ok(()),
        }
    }

    fn is_wrapped(&self, text: &str) -> bool {
        text.find(&self.open_tag)
            .is_some_and(|open| text[open..].contains(&self.close_tag))
    }

    /// Text between the first opening tag and the closing tag after it.
    fn payload<'a>(&self, wrapped: &'a str) -> &'a str {
        let Some(open) = wrapped.find(&self.open_tag) else {
            return "";
        };
        let inner = &wrapped[open + self.open_tag.len()..];
        match inner.find(&self.close_tag) {
            Some(close) => inner[..close].trim(),
            None => "",
        }
    }
}
