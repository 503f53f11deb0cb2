//! Page classification: advisory category tags per page.
//!
//! A page is tagged with every category whose keyword score is positive —
//! there is no competitive "best category" rule, and an untagged page is a
//! valid outcome that stays eligible for parameter matching.

use std::collections::BTreeSet;

use crate::rulebook::KeywordRulebook;
use crate::{scorer, CategoryTag, Page};

/// Assigns category tags to pages using the rulebook's classification rules.
pub struct PageClassifier<'a> {
    rulebook: &'a KeywordRulebook,
}

impl<'a> PageClassifier<'a> {
    pub fn new(rulebook: &'a KeywordRulebook) -> Self {
        Self { rulebook }
    }

    /// Classify one page, writing the resulting tag set into `page.tags`.
    ///
    /// Idempotent: re-running under the same rulebook always produces the
    /// same set.
    pub fn classify(&self, page: &mut Page) -> BTreeSet<CategoryTag> {
        let mut tags = BTreeSet::new();
        for tag in CategoryTag::ALL {
            let score = scorer::score(&page.text, self.rulebook.category_keywords(tag));
            if score.value > 0 {
                tags.insert(tag);
            }
        }
        tracing::debug!(page = page.number(), tags = tags.len(), "classified page");
        page.tags = tags.clone();
        tags
    }

    /// Classify every page in source order.
    pub fn classify_all(&self, pages: &mut [Page]) {
        for page in pages.iter_mut() {
            self.classify(page);
        }
    }
}

/// Pages carrying a given tag, in source order.
pub fn pages_with_tag<'p>(pages: &'p [Page], tag: CategoryTag) -> Vec<&'p Page> {
    pages.iter().filter(|p| p.tags.contains(&tag)).collect()
}
