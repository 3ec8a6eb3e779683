//! Word-token counting, input truncation and summary clipping.
//!
//! A token is a non-whitespace segment from the Unicode word-boundary
//! algorithm (UAX #29): words, numbers and individual punctuation marks
//! each count once.

use unicode_segmentation::UnicodeSegmentation;

/// Byte spans `(start, end)` of every token in `text`.
fn token_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    text.split_word_bound_indices()
        .filter(|(_, s)| !s.trim().is_empty())
        .map(|(i, s)| (i, i + s.len()))
}

pub fn count_tokens(text: &str) -> usize {
    token_spans(text).count()
}

/// Keep at most `max` tokens. Returns the kept prefix and whether anything
/// was cut.
pub fn truncate_tokens(text: &str, max: usize) -> (&str, bool) {
    match token_spans(text).nth(max) {
        Some((next_start, _)) => {
            let end = token_spans(text)
                .take(max)
                .last()
                .map(|(_, end)| end)
                .unwrap_or(0);
            debug_assert!(end <= next_start);
            (&text[..end], true)
        }
        None => (text.trim_end(), false),
    }
}

fn is_sentence_end(token: &str) -> bool {
    matches!(token, "." | "!" | "?" | "\u{2026}")
}

/// Clip `text` to at most `max` tokens.
///
/// The cut falls after the last sentence terminator inside the window when
/// that keeps at least `min` tokens; otherwise at the token boundary.
/// Returns the clipped text and whether it was shortened.
pub fn clip_summary(text: &str, max: usize, min: usize) -> (String, bool) {
    let spans: Vec<(usize, usize)> = token_spans(text).collect();
    if spans.len() <= max {
        return (text.trim().to_string(), false);
    }

    let window = &spans[..max];
    let sentence_cut = window
        .iter()
        .enumerate()
        .rev()
        .find(|(_, span)| is_sentence_end(&text[span.0..span.1]))
        .map(|(i, span)| (i + 1, span.1));

    let end = match sentence_cut {
        Some((kept, end)) if kept >= min => end,
        _ => window.last().map(|&(_, e)| e).unwrap_or(0),
    };
    (text[..end].trim().to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_punctuation() {
        assert_eq!(count_tokens("Hello, world!"), 4);
        assert_eq!(count_tokens("don't stop 3.14"), 3);
        assert_eq!(count_tokens("   "), 0);
        assert_eq!(count_tokens("naïve café"), 2);
    }

    #[test]
    fn truncation() {
        let (kept, cut) = truncate_tokens("one two three four", 2);
        assert_eq!(kept, "one two");
        assert!(cut);

        let (kept, cut) = truncate_tokens("one two ", 2);
        assert_eq!(kept, "one two");
        assert!(!cut);
    }

    #[test]
    fn truncation_to_zero() {
        let (kept, cut) = truncate_tokens("one", 0);
        assert_eq!(kept, "");
        assert!(cut);
    }

    #[test]
    fn clip_prefers_sentence_end() {
        let text = "A b c. D e f g h i.";
        // Tokens: A b c . D e f g h i . → 11
        let (clipped, cut) = clip_summary(text, 8, 3);
        assert_eq!(clipped, "A b c.");
        assert!(cut);
    }

    #[test]
    fn clip_falls_back_to_token_boundary() {
        let text = "A b c. D e f g h i.";
        let (clipped, cut) = clip_summary(text, 8, 6);
        assert_eq!(clipped, "A b c. D e f g");
        assert_eq!(count_tokens(&clipped), 8);
        assert!(cut);
    }

    #[test]
    fn clip_leaves_short_text_alone() {
        let (clipped, cut) = clip_summary(" short one. ", 10, 0);
        assert_eq!(clipped, "short one.");
        assert!(!cut);
    }
}
