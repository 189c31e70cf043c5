/// Sentence-terminal punctuation recognised by the extractive fallback,
/// ASCII and full-width CJK forms.
pub const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Removes every `<...>` tag from `s`.
///
/// Only tags are removed: entities stay encoded and the text between tags is
/// kept as-is. A `<` with no closing `>` is treated as literal text.
///
/// # Arguments
///
/// * `s` - HTML or plain text from a feed field
///
/// # Returns
///
/// A new `String` holding the text with all complete tags removed.
///
/// # Examples
///
/// ```
/// use feedbrief::util::strip_markup;
///
/// assert_eq!(strip_markup("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(strip_markup("1 < 2"), "1 < 2");
/// ```
pub fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Length in characters, which is what every length limit in this crate means.
///
/// # Examples
///
/// ```
/// use feedbrief::util::char_len;
///
/// assert_eq!(char_len("新品发布"), 4);
/// assert_eq!(char_len("news"), 4);
/// ```
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Returns the longest prefix of `s` holding at most `max_chars` characters.
///
/// Cuts on a character boundary, so multi-byte text never panics.
///
/// # Arguments
///
/// * `s` - The string to cut
/// * `max_chars` - Maximum number of characters to keep
///
/// # Returns
///
/// A borrowed prefix of `s`; `s` itself when it is already short enough.
///
/// # Examples
///
/// ```
/// use feedbrief::util::truncate_chars;
///
/// assert_eq!(truncate_chars("新品发布会", 2), "新品");
/// assert_eq!(truncate_chars("short", 10), "short");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// True when the last character of `s` is one of `marks`.
///
/// # Examples
///
/// ```
/// use feedbrief::util::{ends_with_any, SENTENCE_TERMINALS};
///
/// assert!(ends_with_any("完成。", SENTENCE_TERMINALS));
/// assert!(!ends_with_any("", SENTENCE_TERMINALS));
/// ```
pub fn ends_with_any(s: &str, marks: &[char]) -> bool {
    s.chars().next_back().is_some_and(|c| marks.contains(&c))
}

/// Splits `s` into punctuation-terminated sentences.
///
/// Each returned slice ends with one of `marks` and keeps its leading
/// whitespace, so concatenating them reproduces the covered prefix of `s`
/// byte for byte. A trailing fragment without a terminal mark is not
/// returned. Runs of marks (`"?!"`, `"..."`) stay with their sentence.
///
/// # Arguments
///
/// * `s` - Text to split
/// * `marks` - Characters that end a sentence
///
/// # Returns
///
/// Slices of `s` in order, each ending with a run of `marks`. Empty when `s`
/// contains no mark.
///
/// # Examples
///
/// ```
/// use feedbrief::util::{complete_sentences, SENTENCE_TERMINALS};
///
/// let sentences = complete_sentences("A大涨。B持平！C下跌", SENTENCE_TERMINALS);
/// assert_eq!(sentences, vec!["A大涨。", "B持平！"]);
/// ```
pub fn complete_sentences<'a>(s: &'a str, marks: &[char]) -> Vec<&'a str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !marks.contains(&c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !marks.contains(&next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        sentences.push(&s[start..end]);
        start = end;
    }

    sentences
}
