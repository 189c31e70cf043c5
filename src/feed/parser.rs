use crate::types::RawEntry;
use feed_rs::model::{Content, Entry};
use feed_rs::parser;

/// Parses an RSS/Atom/JSON feed document into raw entries, in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawEntry>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;
    Ok(feed.entries.into_iter().map(to_raw_entry).collect())
}

fn to_raw_entry(entry: Entry) -> RawEntry {
    let link = entry.links.first().map(|l| l.href.clone());
    let published = entry.published.or(entry.updated);
    let title = entry.title.map(|t| t.content);
    let description = entry.summary.map(|s| s.content);
    let snippet = entry
        .media
        .into_iter()
        .find_map(|m| m.description.map(|d| d.content));
    let (content_encoded, content) = split_content(entry.content);

    RawEntry {
        title: non_blank(title),
        link: non_blank(link),
        published,
        content_encoded: non_blank(content_encoded),
        content: non_blank(content),
        description: non_blank(description),
        snippet: non_blank(snippet),
    }
}

/// Plain-text bodies go to `content`; everything else (HTML from
/// `content:encoded` or Atom `type="html"`) to `content_encoded`.
fn split_content(content: Option<Content>) -> (Option<String>, Option<String>) {
    let Some(content) = content else {
        return (None, None);
    };
    let is_plain = content.content_type.essence().to_string() == "text/plain";
    match content.body {
        Some(body) if is_plain => (None, Some(body)),
        Some(body) => (Some(body), None),
        None => (None, None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
