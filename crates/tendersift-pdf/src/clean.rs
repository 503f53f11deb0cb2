//! Page text cleaning applied after extraction.
//!
//! Extraction artifacts — running headers like "Page 3 of 120", bare "3/120"
//! counters, control characters, ragged whitespace — add noise that inflates
//! substring matches, so they are stripped before the text reaches the
//! scoring engine.

use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_OF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Page\s+\d+\s+of\s+\d+").unwrap());

static PAGE_COUNTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+/\d+\b").unwrap());

/// Clean a raw extracted page into scorer-ready text.
pub fn clean_page_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let without_headers = PAGE_OF_RE.replace_all(raw, " ");
    let without_counters = PAGE_COUNTER_RE.replace_all(&without_headers, " ");

    let without_controls: String = without_counters
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    collapse_whitespace(&without_controls)
}

/// Collapse any whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
