//! Deterministic text cleanup for extracted input and model output.
//!
//! Each rule is a pure `&str → String` pass; the two entry points apply
//! them in a fixed order.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise text pulled out of a PDF, JSON document or stdin.
///
/// 1. CRLF / CR → LF, form feeds → blank line
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Join words hyphenated across a line break
/// 5. Collapse 3+ blank lines down to one
pub fn clean_extracted(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = dehyphenate(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Normalise a model completion into a single prose paragraph.
///
/// 1. Strip outer code fences
/// 2. Strip a leading "Summary:" style preamble
/// 3. Strip wrapping quotes
/// 4. Collapse all whitespace runs to one space
pub fn clean_summary(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_fences(&s);
    let s = strip_preamble(&s);
    let s = collapse_whitespace(&s);
    strip_wrapping_quotes(&s)
}

// ── Shared rules ─────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{000C}', "\n\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Extracted-text rules ─────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_LINEBREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})-\n[ \t]*(\p{Ll})").unwrap());

fn dehyphenate(input: &str) -> String {
    RE_LINEBREAK_HYPHEN.replace_all(input, "$1$2").to_string()
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Summary rules ────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:\*\*)?(?:here\s+is\s+(?:a|the)\s+(?:\w+\s+)?summary[^:\n]*|summary)\s*:(?:\*\*)?\s*")
        .unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input, "").to_string()
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input.trim(), " ").to_string()
}

fn strip_wrapping_quotes(input: &str) -> String {
    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}')] {
        if let Some(inner) = input
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            if !inner.contains(open) && !inner.contains(close) {
                return inner.trim().to_string();
            }
        }
    }
    input.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_line_endings_and_invisibles() {
        assert_eq!(clean_extracted("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(clean_extracted("\u{FEFF}zero\u{200B}width"), "zerowidth");
    }

    #[test]
    fn extracted_dehyphenates_line_breaks() {
        assert_eq!(
            clean_extracted("the experi-\nment worked"),
            "the experiment worked"
        );
        // Capitalised continuation is a real compound, keep it.
        assert_eq!(clean_extracted("Jean-\nPaul"), "Jean-\nPaul");
    }

    #[test]
    fn extracted_collapses_blank_runs() {
        assert_eq!(clean_extracted("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_extracted("page one\u{000C}page two"), "page one\n\npage two");
    }

    #[test]
    fn extracted_whitespace_only_is_empty() {
        assert_eq!(clean_extracted("  \n\t\n  "), "");
    }

    #[test]
    fn summary_strips_fences_and_preamble() {
        assert_eq!(clean_summary("```\nShort text.\n```"), "Short text.");
        assert_eq!(
            clean_summary("Here is a concise summary of the document:\n\nIt works."),
            "It works."
        );
        assert_eq!(clean_summary("**Summary:** It works."), "It works.");
    }

    #[test]
    fn summary_flattens_whitespace() {
        assert_eq!(clean_summary("One.\n\nTwo   three.\n"), "One. Two three.");
    }

    #[test]
    fn summary_strips_wrapping_quotes_only() {
        assert_eq!(clean_summary("\"All good.\""), "All good.");
        assert_eq!(
            clean_summary("\"A\" said B, \"C\""),
            "\"A\" said B, \"C\""
        );
    }
}
