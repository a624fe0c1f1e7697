//! Finite-state sentence splitting.
//!
//! Splits on terminal punctuation with suppression for abbreviations,
//! enumerated item markers, and decimal numerics. Boundaries require the
//! next non-space character to open a new sentence (uppercase, digit, or
//! end of text).

use std::ops::Range;

/// Abbreviations whose trailing period never ends a sentence.
const ABBREVIATIONS: [&str; 16] = [
    "e.g", "i.e", "etc", "vs", "cf", "no", "fig", "st", "mr", "mrs", "ms", "dr", "prof", "inc",
    "ltd", "approx",
];

/// Splitter state while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Inside sentence body.
    Body,
    /// Just saw terminal punctuation; deciding whether it closes a sentence.
    AfterTerminal,
}

/// Splits text into sentence byte ranges.
///
/// Ranges cover the original text without gaps inside a paragraph apart from
/// inter-sentence whitespace; each range is trimmed of surrounding spaces.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<Range<usize>> {
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut state = State::Body;
    let mut start = skip_whitespace(text, 0);
    let mut terminal_end = 0;

    for (idx, ch) in text.char_indices() {
        match state {
            State::Body => {
                if matches!(ch, '.' | '!' | '?') {
                    let end = idx + ch.len_utf8();
                    if ch == '.' && is_suppressed_period(text, idx) {
                        continue;
                    }
                    terminal_end = end;
                    state = State::AfterTerminal;
                }
            }
            State::AfterTerminal => {
                match ch {
                    // Run of terminal marks or a closing quote extends the
                    // sentence end.
                    '.' | '!' | '?' | '"' | '\'' | ')' | ']' => {
                        terminal_end = idx + ch.len_utf8();
                    }
                    c if c.is_whitespace() => {
                        let next_start = skip_whitespace(text, idx);
                        let opens_new = next_start >= bytes.len()
                            || text[next_start..]
                                .chars()
                                .next()
                                .is_some_and(|c| c.is_uppercase() || c.is_numeric() || c == '\n');
                        let hard_break = text[idx..next_start].contains('\n');
                        if opens_new || hard_break {
                            if terminal_end > start {
                                sentences.push(start..terminal_end);
                            }
                            start = next_start;
                            state = State::Body;
                        } else {
                            state = State::Body;
                        }
                    }
                    _ => {
                        state = State::Body;
                    }
                }
            }
        }
    }

    // Trailing material without terminal punctuation is still a sentence.
    let tail_start = if state == State::AfterTerminal {
        if terminal_end > start {
            sentences.push(start..terminal_end);
        }
        skip_whitespace(text, terminal_end)
    } else {
        start
    };
    if tail_start < text.len() && !text[tail_start..].trim().is_empty() {
        let end = text.len() - trailing_whitespace_len(text);
        if end > tail_start {
            sentences.push(tail_start..end);
        }
    }

    sentences
}

/// Whether a period at `idx` is suppressed (abbreviation, enumeration
/// marker, or decimal point).
fn is_suppressed_period(text: &str, idx: usize) -> bool {
    let before = &text[..idx];
    let after = &text[idx + 1..];

    // Decimal numeric: digit on both sides.
    let prev_char = before.chars().next_back();
    let next_char = after.chars().next();
    if prev_char.is_some_and(|c| c.is_ascii_digit()) && next_char.is_some_and(|c| c.is_ascii_digit())
    {
        return true;
    }

    // Token immediately before the period.
    let token_start = before
        .rfind(|c: char| c.is_whitespace() || c == '(')
        .map_or(0, |p| p + 1);
    let token = &before[token_start..];

    // Enumerated item marker at line/token start: "1." or "a.".
    let at_token_start = token_start == 0
        || before[..token_start].ends_with('\n')
        || before[..token_start].ends_with("\n ")
        || before[..token_start].trim_end().ends_with('\n');
    let is_marker_token = (token.chars().all(|c| c.is_ascii_digit())
        && !token.is_empty()
        && token.len() <= 3)
        || (token.chars().count() == 1 && token.chars().all(char::is_alphabetic));
    if is_marker_token
        && at_token_start
        && next_char.is_none_or(|c| c == ' ')
        && is_enumeration_context(before)
    {
        return true;
    }

    // Abbreviation: compare the lowercased token against the list.
    let normalized = token.trim_end_matches('.').to_lowercase();
    ABBREVIATIONS.contains(&normalized.as_str())
}

/// Enumeration context: the token sits at a line start or right after a
/// step keyword.
fn is_enumeration_context(before: &str) -> bool {
    let trimmed = before.trim_end_matches(|c: char| c.is_ascii_digit() || c.is_alphabetic());
    trimmed.is_empty()
        || trimmed.ends_with('\n')
        || trimmed.to_lowercase().trim_end().ends_with("step")
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map_or(text.len(), |(i, _)| from + i)
}

fn trailing_whitespace_len(text: &str) -> usize {
    text.len() - text.trim_end().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences_of(text: &str) -> Vec<&str> {
        split_sentences(text).into_iter().map(|r| &text[r]).collect()
    }

    #[test]
    fn test_simple_sentences() {
        let text = "First sentence. Second sentence. Third one.";
        assert_eq!(
            sentences_of(text),
            vec!["First sentence.", "Second sentence.", "Third one."]
        );
    }

    #[test]
    fn test_question_and_exclamation() {
        let text = "What is NAV? It is the net asset value! Simple.";
        assert_eq!(
            sentences_of(text),
            vec!["What is NAV?", "It is the net asset value!", "Simple."]
        );
    }

    #[test]
    fn test_abbreviation_suppression() {
        let text = "Funds hold assets, e.g. bonds and equities. Fees accrue daily.";
        assert_eq!(
            sentences_of(text),
            vec!["Funds hold assets, e.g. bonds and equities.", "Fees accrue daily."]
        );
    }

    #[test]
    fn test_decimal_suppression() {
        let text = "The fee is 0.25 percent per year. It accrues daily.";
        assert_eq!(
            sentences_of(text),
            vec!["The fee is 0.25 percent per year.", "It accrues daily."]
        );
    }

    #[test]
    fn test_enumeration_suppression() {
        let text = "1. Open the wizard and follow the prompts.\n2. Enter the fund name.";
        let result = sentences_of(text);
        // Item markers must not split "1." away from their item text.
        assert!(result.iter().all(|s| !s.trim().trim_end_matches('.').chars().all(|c| c.is_ascii_digit())));
    }

    #[test]
    fn test_no_terminal_punctuation() {
        let text = "a heading like line without punctuation";
        assert_eq!(sentences_of(text), vec![text]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n  ").is_empty());
    }

    #[test]
    fn test_closing_quote_included() {
        let text = "Click the 'Create Fund' button. Then wait.";
        let result = sentences_of(text);
        assert_eq!(result[0], "Click the 'Create Fund' button.");
    }

    #[test]
    fn test_lowercase_continuation_not_split() {
        // Terminal followed by lowercase continues the sentence (likely an
        // abbreviation the list does not know).
        let text = "See sec. two for details. Next sentence here.";
        let result = sentences_of(text);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], "See sec. two for details.");
    }

    #[test]
    fn test_multiline_paragraph() {
        let text = "First line of prose continues.\nStill the second sentence starts Here. Done now.";
        let result = sentences_of(text);
        assert!(result.len() >= 2);
    }

    #[test]
    fn test_ranges_are_valid() {
        let text = "One. Two! Three? Four.";
        for range in split_sentences(text) {
            assert!(range.start < range.end);
            assert!(range.end <= text.len());
            assert!(text.is_char_boundary(range.start));
            assert!(text.is_char_boundary(range.end));
        }
    }
}
