//! Model output parsing and extracted-value cleaning.
//!
//! The model is asked for JSON, but real responses arrive fenced, prefixed,
//! or as loose text. Parsing is JSON-first with regex fallbacks, and every
//! extracted value passes through the same cleaning before it reaches the
//! report.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel value for a parameter the model could not find.
pub const NOT_FOUND: &str = "NOT_FOUND";

static FENCE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*").unwrap());

static ANSWER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?im)answer["\s]*:\s*["']?([^"'\n]+)"#).unwrap());

static DETAILS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?im)details["\s]*:\s*["']?([^"'\n]+)"#).unwrap());

/// Phrases that mean "nothing was found", normalized to [`NOT_FOUND`].
const NOT_FOUND_INDICATORS: [&str; 9] = [
    "not found",
    "not available",
    "not specified",
    "not mentioned",
    "cannot be found",
    "not provided",
    "not indicated",
    "n/a",
    "לא נמצא",
];

/// Parse a raw model response into `(answer, details)`.
///
/// Never fails: an unusable response degrades to `(NOT_FOUND, "")`.
pub fn parse_model_output(raw: &str) -> (String, String) {
    let text = strip_fences(raw);
    if text.is_empty() {
        return (NOT_FOUND.to_string(), String::new());
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(obj) = value.as_object() {
            let answer = obj
                .get("answer")
                .and_then(|v| v.as_str())
                .unwrap_or(NOT_FOUND);
            let details = obj.get("details").and_then(|v| v.as_str()).unwrap_or("");
            return (
                clean_extracted_value(answer),
                clean_extracted_value(details),
            );
        }
    }

    parse_text_response(&text)
}

/// Fallback for non-JSON responses: look for `answer:` / `details:` labels,
/// then take the first line as a last resort.
fn parse_text_response(text: &str) -> (String, String) {
    let answer = ANSWER_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .or_else(|| text.lines().next().map(|l| l.trim().to_string()))
        .unwrap_or_else(|| NOT_FOUND.to_string());

    let details = DETAILS_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    (clean_extracted_value(&answer), clean_extracted_value(&details))
}

fn strip_fences(raw: &str) -> String {
    let without_open = FENCE_OPEN_RE.replace_all(raw, "");
    without_open.trim().trim_end_matches("```").trim().to_string()
}

/// Clean one extracted value: unwrap quotes, collapse whitespace, and map
/// "not found"-style phrasing onto [`NOT_FOUND`].
pub fn clean_extracted_value(value: &str) -> String {
    let mut cleaned = value.trim();

    if cleaned.len() >= 2
        && ((cleaned.starts_with('"') && cleaned.ends_with('"'))
            || (cleaned.starts_with('\'') && cleaned.ends_with('\'')))
    {
        cleaned = &cleaned[1..cleaned.len() - 1];
    }

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return String::new();
    }

    let lower = collapsed.to_lowercase();
    if collapsed == NOT_FOUND || NOT_FOUND_INDICATORS.iter().any(|i| lower.contains(i)) {
        return NOT_FOUND.to_string();
    }

    collapsed
}

/// Heuristic confidence for a cleaned extraction, in 0.0–1.0.
///
/// Mirrors the report's expectations: concrete, detailed answers without
/// hedging language score higher.
pub fn estimate_confidence(answer: &str, details: &str) -> f64 {
    if answer == NOT_FOUND {
        return 0.0;
    }

    let mut factors: Vec<f64> = Vec::new();

    let answer_words = answer.split_whitespace().count();
    factors.push(if (2..=50).contains(&answer_words) {
        0.8
    } else if answer_words > 0 {
        0.6
    } else {
        0.2
    });

    let details_words = details.split_whitespace().count();
    factors.push(if details_words > 5 {
        0.8
    } else if details_words > 0 {
        0.6
    } else {
        0.4
    });

    if answer.chars().any(|c| c.is_ascii_digit()) {
        factors.push(0.7);
    }

    let hedges = ["maybe", "perhaps", "possibly", "unclear", "ambiguous", "אולי"];
    let combined = format!("{answer} {details}").to_lowercase();
    factors.push(if hedges.iter().any(|h| combined.contains(h)) {
        0.3
    } else {
        0.8
    });

    let sum: f64 = factors.iter().sum();
    (sum / factors.len() as f64).min(1.0)
}
