use crate::types::RawEntry;
use crate::util::{char_len, strip_markup};

/// A content field must be longer than this (after markup removal) to be chosen
/// over the fields after it.
pub const MIN_FIELD_CHARS: usize = 20;

/// Returns the plain text to summarize for `entry`.
///
/// Fields are tried richest first: encoded content, plain content,
/// description, media snippet. The first one longer than
/// [`MIN_FIELD_CHARS`] wins; otherwise the title is used as-is. The result is
/// empty only when the entry has nothing usable at all.
pub fn select(entry: &RawEntry) -> String {
    let candidates = [
        entry.content_encoded.as_deref(),
        entry.content.as_deref(),
        entry.description.as_deref(),
        entry.snippet.as_deref(),
    ];

    for field in candidates.into_iter().flatten() {
        let text = strip_markup(field).trim().to_string();
        if char_len(&text) > MIN_FIELD_CHARS {
            return text;
        }
    }

    entry
        .title
        .as_deref()
        .map(|t| strip_markup(t).trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LONG_CN: &str = "这是一段足够长的新闻正文，用来测试内容选择的优先级规则。";

    fn entry() -> RawEntry {
        RawEntry {
            title: Some("标题".to_string()),
            link: Some("https://example.com/a".to_string()),
            ..RawEntry::default()
        }
    }

    #[test]
    fn test_encoded_content_wins_and_is_stripped() {
        let e = RawEntry {
            content_encoded: Some(format!("<p>{}</p>", LONG_CN)),
            description: Some("A different but also long enough description.".to_string()),
            ..entry()
        };
        assert_eq!(select(&e), LONG_CN);
    }

    #[test]
    fn test_short_field_is_skipped() {
        let e = RawEntry {
            content_encoded: Some("<p>短</p>".to_string()),
            content: None,
            description: Some(LONG_CN.to_string()),
            ..entry()
        };
        assert_eq!(select(&e), LONG_CN);
    }

    #[test]
    fn test_threshold_measured_after_markup_removal() {
        // 21+ chars of markup, 2 chars of text
        let e = RawEntry {
            content: Some(r#"<a href="https://example.com/x">短文</a>"#.to_string()),
            snippet: Some("A media snippet that is long enough.".to_string()),
            ..entry()
        };
        assert_eq!(select(&e), "A media snippet that is long enough.");
    }

    #[test]
    fn test_title_is_last_resort() {
        let e = RawEntry {
            description: Some("too short".to_string()),
            ..entry()
        };
        assert_eq!(select(&e), "标题");
    }

    #[test]
    fn test_nothing_usable_is_empty() {
        assert_eq!(select(&RawEntry::default()), "");
    }

    #[test]
    fn test_entities_are_not_decoded() {
        let e = RawEntry {
            description: Some("<b>Q&amp;A</b> session with the whole engineering team".to_string()),
            ..entry()
        };
        assert_eq!(select(&e), "Q&amp;A session with the whole engineering team");
    }
}
