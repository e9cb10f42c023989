//! Paragraph text and emphasis map
//!
//! A [`StyledParagraph`] keeps two views of one source paragraph: the
//! normalized, trimmed text used for classification and segmentation, and the
//! raw concatenated run text with one emphasis flag per character, used to
//! decide which answer was marked as correct.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::docx::{Paragraph, Run};

/// A paragraph reduced to what the question parser needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledParagraph {
    /// Normalized, trimmed text
    pub text: String,
    raw: Vec<char>,
    emphasis: Vec<bool>,
}

impl StyledParagraph {
    pub fn from_runs(runs: &[Run]) -> Self {
        let mut raw = Vec::new();
        let mut emphasis = Vec::new();

        for run in runs {
            let emphasized = run.format.is_emphasized();
            for c in run.text.chars() {
                raw.push(c);
                emphasis.push(emphasized);
            }
        }

        let joined: String = raw.iter().collect();
        let text = normalize_notation(&joined).trim().to_string();

        Self {
            text,
            raw,
            emphasis,
        }
    }

    pub fn from_paragraph(paragraph: &Paragraph) -> Self {
        Self::from_runs(&paragraph.runs)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Concatenated run text before normalization
    pub fn raw(&self) -> &[char] {
        &self.raw
    }

    /// Whether every non-whitespace character of `span` is emphasized
    ///
    /// A span reaching past the end of the paragraph is never emphasized.
    pub fn span_is_emphasized(&self, span: Range<usize>) -> bool {
        if span.end > self.raw.len() {
            return false;
        }
        (span.start..span.end).all(|i| self.raw[i].is_whitespace() || self.emphasis[i])
    }

    /// Char index of the first occurrence of `needle` at or after `from`
    pub fn find_raw(&self, needle: &str, from: usize) -> Option<usize> {
        let needle: Vec<char> = needle.chars().collect();
        if needle.is_empty() || from >= self.raw.len() {
            return None;
        }
        self.raw[from..]
            .windows(needle.len())
            .position(|window| window == needle.as_slice())
            .map(|pos| pos + from)
    }

    /// Char index of the first non-whitespace character at or after `from`
    pub fn next_non_whitespace(&self, from: usize) -> Option<usize> {
        self.raw
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, _)| i)
    }
}

fn built_in(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid built-in pattern")
}

// "25 oC", "3.5 0F" written with a letter instead of the degree sign
static LETTER_DEGREE_RE: LazyLock<Regex> =
    LazyLock::new(|| built_in(r"([0-9.,])\s*([oO0])\s*([cCfF])"));
// bare degree sign without a unit
static BARE_DEGREE_RE: LazyLock<Regex> = LazyLock::new(|| built_in(r"([0-9.,])\s*°"));
static KELVIN_PERIOD_RE: LazyLock<Regex> = LazyLock::new(|| built_in(r"([0-9.])\s*K\s*\."));
static KELVIN_RE: LazyLock<Regex> = LazyLock::new(|| built_in(r"([0-9.])\s*K\s*"));
static CELSIUS_RE: LazyLock<Regex> = LazyLock::new(|| built_in(r"([0-9])C"));

/// Rewrite temperature notation typed in common broken ways
///
/// Rules run in a fixed order, each over the output of the previous one.
pub fn normalize_notation(text: &str) -> String {
    let text = LETTER_DEGREE_RE.replace_all(text, "${1}°${3}");
    let text = replace_unless_followed_by(&BARE_DEGREE_RE, &text, starts_with_unit, |caps| {
        format!("{}°C", &caps[1])
    });
    let text = KELVIN_PERIOD_RE.replace_all(&text, "${1} K.");
    let text = KELVIN_RE.replace_all(&text, "${1} K");
    replace_unless_followed_by(&CELSIUS_RE, &text, starts_with_word_char, |caps| {
        format!("{}°C", &caps[1])
    })
}

/// `replace_all`, keeping matches whose trailing text satisfies `keep`
///
/// Stands in for a negative lookahead, which `regex` does not support.
fn replace_unless_followed_by<K, F>(re: &Regex, text: &str, keep: K, replace: F) -> String
where
    K: Fn(&str) -> bool,
    F: Fn(&Captures<'_>) -> String,
{
    re.replace_all(text, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let end = caps.get(0).map_or(text.len(), |m| m.end());
        if keep(&text[end..]) {
            whole.to_string()
        } else {
            replace(caps)
        }
    })
    .into_owned()
}

fn starts_with_unit(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some('C' | 'F' | 'K'))
}

/// ASCII word boundary check after a trailing word character
fn starts_with_word_char(rest: &str) -> bool {
    rest.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_degree() {
        assert_eq!(normalize_notation("Nước sôi ở 100 oC"), "Nước sôi ở 100°C");
        assert_eq!(normalize_notation("37 0F"), "37°F");
        assert_eq!(normalize_notation("2,5oC"), "2,5°C");
        // lower-case unit is not recognised by the bare-degree rule
        assert_eq!(normalize_notation("2,5oc"), "2,5°Cc");
    }

    #[test]
    fn test_bare_degree_gets_celsius() {
        assert_eq!(normalize_notation("30 ° là"), "30°C là");
        assert_eq!(normalize_notation("30° C"), "30° C");
        assert_eq!(normalize_notation("30°K"), "30°K");
    }

    #[test]
    fn test_kelvin_spacing() {
        assert_eq!(normalize_notation("bằng 300K."), "bằng 300 K.");
        assert_eq!(normalize_notation("T = 273K"), "T = 273 K");
    }

    #[test]
    fn test_celsius_suffix_needs_word_boundary() {
        assert_eq!(normalize_notation("25C"), "25°C");
        assert_eq!(normalize_notation("25C."), "25°C.");
        assert_eq!(normalize_notation("25Cx"), "25Cx");
        assert_eq!(normalize_notation("Câu 1. 2+2=?"), "Câu 1. 2+2=?");
    }

    #[test]
    fn test_styled_paragraph_maps_emphasis() {
        let paragraph = StyledParagraph::from_runs(&[
            Run::plain("A. 3 B. "),
            Run::bold("4"),
            Run::plain(" C. 5 "),
        ]);

        assert_eq!(paragraph.text, "A. 3 B. 4 C. 5");
        assert_eq!(paragraph.raw().len(), 15);
        assert!(paragraph.span_is_emphasized(8..9));
        assert!(!paragraph.span_is_emphasized(3..4));
        // whitespace does not break emphasis
        assert!(paragraph.span_is_emphasized(7..9));
        assert!(!paragraph.span_is_emphasized(14..20));
    }

    #[test]
    fn test_find_raw() {
        let paragraph = StyledParagraph::from_runs(&[Run::plain("A. x B. x")]);
        assert_eq!(paragraph.find_raw("x", 0), Some(3));
        assert_eq!(paragraph.find_raw("x", 4), Some(8));
        assert_eq!(paragraph.find_raw("B.", 0), Some(5));
        assert_eq!(paragraph.find_raw("y", 0), None);
        assert_eq!(paragraph.next_non_whitespace(2), Some(3));
    }

    #[test]
    fn test_blank_paragraph_is_empty() {
        assert!(StyledParagraph::from_runs(&[Run::plain("   ")]).is_empty());
        assert!(StyledParagraph::from_runs(&[]).is_empty());
    }
}
