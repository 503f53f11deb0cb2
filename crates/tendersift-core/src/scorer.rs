//! Pure lexical scoring of page text against a keyword set.
//!
//! Matching is plain substring containment: case-insensitive for
//! Latin-script terms, exact for Hebrew (which has no case, so a single
//! Unicode-lowercase comparison covers both). There is deliberately no
//! tokenization, stemming, or word-boundary anchoring — Hebrew morphology
//! attaches prefixes and suffixes directly to roots, which makes
//! boundary-anchored matching unreliable.

use crate::rulebook::KeywordSet;

/// Result of scoring one text against one keyword set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Count of distinct listed terms present in the text. Presence, not
    /// frequency: a term repeated across the page still contributes 1.
    pub value: usize,
    /// The terms that matched, in keyword-set flattening order.
    pub matched: Vec<String>,
}

impl Score {
    pub fn zero() -> Self {
        Self {
            value: 0,
            matched: Vec::new(),
        }
    }
}

/// Score `text` against `keyword_set`.
///
/// Total over all inputs: empty text or an empty flattened set yields a
/// zero score, never an error. `value` always equals `matched.len()`.
pub fn score(text: &str, keyword_set: &KeywordSet) -> Score {
    if text.is_empty() {
        return Score::zero();
    }

    let haystack = text.to_lowercase();
    let mut matched = Vec::new();

    for term in keyword_set.flattened() {
        let needle = term.to_lowercase();
        if !needle.is_empty() && haystack.contains(&needle) {
            matched.push(term.to_string());
        }
    }

    Score {
        value: matched.len(),
        matched,
    }
}
