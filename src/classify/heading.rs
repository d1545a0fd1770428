//! Heading and subheading detection
//!
//! Pure text heuristics: no styles, no fonts, only the characters of the
//! paragraph and a short window of what came before it.

use once_cell::sync::Lazy;
use regex::Regex;

const MAX_HEADING_CHARS: usize = 150;
const MAX_LABEL_TAIL_CHARS: usize = 100;
const MAX_SUBHEADING_CHARS: usize = 100;
const DEMOTED_HEADING_CHARS: usize = 60;
const SHORT_LINE_WORDS: usize = 6;

/// Section names that open a heading when they start the line
const SECTION_VOCABULARY: &[&str] = &[
    "introduction",
    "conclusion",
    "summary",
    "overview",
    "background",
    "methodology",
    "results",
    "discussion",
    "recommendations",
    "recommendation",
    "references",
    "abstract",
    "executive summary",
    "scope",
    "objectives",
    "findings",
    "analysis",
    "appendix",
    "bibliography",
    "acknowledgments",
];

const SUBHEADING_PREFIXES: &[&str] = &["subsection", "part", "item", "sub", "section"];

/// Heading patterns, tried in order against the trimmed text
static HEADING_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 1. / 1.2 / 1.2.3 followed by a space
        r"^\s*\d+(\.\d+)*\s+",
        // II. Roman numerals
        r"^\s*[IVX]+\.\s+",
        // A. Lettered
        r"^\s*[A-Z]\.\s+",
        // ALL CAPS
        r"^[A-Z\s]{3,}$",
        // Bulleted lines
        r"^\s*[•\-*]\s+",
        r"(?i)^(Section|Chapter|Part|Appendix)\s+\d+",
        // Short line ending in a period
        r"^[\w\s]{3,30}\.$",
        r"(?i)^(Overview|Summary|Introduction|Conclusion|Background|Methodology|Results|Discussion|Recommendations|References)",
        r"^\d+\.\s+[A-Za-z]",
        r"(?i)(Overview|Summary|Introduction|Conclusion|Background|Methodology|Results|Discussion|Recommendations|References)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Deeper numbering right after a heading: 1.1, 1.1.1, a., (a), (iv)
static NESTED_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+\.\d+|\d+\.\d+\.\d+|[a-z]\.|\([a-z]\)|\([ivx]+\))").unwrap());

/// Indented numbering or bullets, checked on the untrimmed text
static INDENTED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s+\d+\.|\s+[a-z]\.|\s+•|\s+-|\s+\*)").unwrap());

/// Decide whether a paragraph reads as a heading
///
/// Rules in order, first match wins:
/// 1. longer than 150 characters: never a heading
/// 2. a colon with a short tail (`Section: Overview`)
/// 3. fewer than six words
/// 4. starts with a section name (`introduction`, `findings`, ...)
/// 5. any of the structural patterns (numbering, all caps, bullets, ...)
pub fn classify_heading(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADING_CHARS {
        return false;
    }

    if let Some((_, tail)) = text.split_once(':') {
        if tail.trim().chars().count() < MAX_LABEL_TAIL_CHARS {
            return true;
        }
    }

    if trimmed.split_whitespace().count() < SHORT_LINE_WORDS {
        return true;
    }

    let lower = trimmed.to_lowercase();
    if SECTION_VOCABULARY.iter().any(|word| lower.starts_with(word)) {
        return true;
    }

    HEADING_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(trimmed))
}

/// Decide whether a paragraph reads as a subheading
///
/// `recent` is the window of preceding paragraph texts, oldest first;
/// `just_saw_heading` is set by the caller while a heading is still close.
/// A heading as the last entry of `recent` counts as a recent heading too.
pub fn classify_subheading(text: &str, recent: &[String], just_saw_heading: bool) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_SUBHEADING_CHARS {
        return false;
    }

    let after_heading =
        just_saw_heading || recent.last().is_some_and(|previous| classify_heading(previous));

    if after_heading {
        if NESTED_NUMBERING.is_match(trimmed) {
            return true;
        }

        // A shorter heading-like line under a heading is demoted one level
        if classify_heading(text) && trimmed.chars().count() < DEMOTED_HEADING_CHARS {
            return true;
        }
    }

    if INDENTED_MARKER.is_match(text) {
        return true;
    }

    let lower = text.to_lowercase();
    text.chars().count() < DEMOTED_HEADING_CHARS
        && SUBHEADING_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}
