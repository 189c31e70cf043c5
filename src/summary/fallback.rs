use crate::util::{char_len, complete_sentences, truncate_chars, SENTENCE_TERMINALS};

const ELLIPSIS: &str = "...";

/// Builds a summary from the leading sentences of `content`.
///
/// Takes the first `sentences` complete sentences (split on `.!?。！？`). When
/// the content has no sentence boundary at all it is cut to `char_budget`
/// characters and marked with an ellipsis. Deterministic and offline.
///
/// # Arguments
///
/// * `content` - Plain article text, markup already removed
/// * `sentences` - How many leading sentences to keep (at least one is kept)
/// * `char_budget` - Hard limit for content without any sentence boundary
///
/// # Returns
///
/// The trimmed summary. Empty only when `content` is blank. Content without a
/// boundary that fits the budget is returned unchanged, without an ellipsis.
///
/// # Examples
///
/// ```
/// use feedbrief::summary::extractive_summary;
///
/// assert_eq!(extractive_summary("A大涨。B持平。C下跌。", 2, 150), "A大涨。B持平。");
/// assert_eq!(extractive_summary("没有标点的长文本", 4, 4), "没有标点...");
/// ```
pub fn extractive_summary(content: &str, sentences: usize, char_budget: usize) -> String {
    let content = content.trim();
    let leading = complete_sentences(content, SENTENCE_TERMINALS);

    if leading.is_empty() {
        if char_len(content) <= char_budget {
            return content.to_string();
        }
        let mut cut = truncate_chars(content, char_budget).trim_end().to_string();
        cut.push_str(ELLIPSIS);
        return cut;
    }

    leading
        .into_iter()
        .take(sentences.max(1))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_first_two_cjk_sentences() {
        assert_eq!(extractive_summary("A大涨。B持平。C下跌。", 2, 150), "A大涨。B持平。");
    }

    #[test]
    fn test_mixed_terminals_and_spacing() {
        let content = "  Shares rose 5%. Analysts were surprised! More later? Maybe.";
        assert_eq!(
            extractive_summary(content, 2, 150),
            "Shares rose 5%. Analysts were surprised!"
        );
    }

    #[test]
    fn test_fewer_sentences_than_requested() {
        assert_eq!(extractive_summary("只有一句。后面没有结束", 3, 150), "只有一句。");
    }

    #[test]
    fn test_no_boundary_truncates_with_ellipsis() {
        let content = "字".repeat(200);
        let summary = extractive_summary(&content, 2, 150);
        assert_eq!(summary, format!("{}...", "字".repeat(150)));
    }

    #[test]
    fn test_no_boundary_short_content_unchanged() {
        assert_eq!(extractive_summary("没有标点的短文本", 2, 150), "没有标点的短文本");
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(extractive_summary("   ", 2, 150), "");
    }

    proptest! {
        #[test]
        fn prop_bounded_when_no_boundary(s in "[a-z 中文]{0,400}") {
            let summary = extractive_summary(&s, 2, 150);
            prop_assert!(char_len(&summary) <= 150 + ELLIPSIS.len());
        }

        #[test]
        fn prop_sentence_output_is_prefix_and_terminated(s in "[a-z中。！？.!? ]{0,200}", n in 1usize..5) {
            let summary = extractive_summary(&s, n, 150);
            if !complete_sentences(s.trim(), SENTENCE_TERMINALS).is_empty() {
                prop_assert!(s.trim().starts_with(&summary));
                prop_assert!(summary.ends_with(SENTENCE_TERMINALS));
            }
        }
    }
}
