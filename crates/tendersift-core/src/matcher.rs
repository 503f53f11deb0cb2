//! Parameter-to-page matching with the three-tier fallback chain.
//!
//! Tiers resolve strictly in order PRIMARY → SECONDARY → TERTIARY; the first
//! tier that selects at least one page wins, and pages from two tiers are
//! never mixed into one result. All tiers coming up empty is a normal
//! "parameter not found in document" outcome, not an error.

use crate::rulebook::{KeywordRulebook, KeywordSet};
use crate::{scorer, FallbackTier, MatchResult, Page, Parameter, Tier};

/// Per-run matching options.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Maximum pages selected per parameter; shared across parameters.
    pub top_k: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Selects the pages most relevant to each parameter.
pub struct ParameterPageMatcher<'a> {
    rulebook: &'a KeywordRulebook,
    options: MatchOptions,
}

impl<'a> ParameterPageMatcher<'a> {
    pub fn new(rulebook: &'a KeywordRulebook, options: MatchOptions) -> Self {
        Self { rulebook, options }
    }

    /// Match one parameter against the document's pages.
    pub fn match_parameter<'p>(
        &self,
        parameter: Parameter,
        pages: &'p [Page],
    ) -> MatchResult<'p> {
        // idea_author is defined by policy to never be found in the source
        // document, independent of any textual evidence. The scorer and
        // rulebook are not consulted.
        if parameter == Parameter::IdeaAuthor {
            tracing::debug!(%parameter, "policy short-circuit, empty match");
            return MatchResult {
                parameter,
                pages: Vec::new(),
                fallback_tier: FallbackTier::None,
            };
        }

        for tier in Tier::CHAIN {
            let keywords = self.rulebook.parameter_keywords(parameter, tier);
            if keywords.is_empty() {
                continue;
            }
            let selected = self.select_pages(&keywords, pages);
            if !selected.is_empty() {
                tracing::debug!(
                    %parameter,
                    tier = ?tier,
                    pages = selected.len(),
                    "parameter matched"
                );
                return MatchResult {
                    parameter,
                    pages: selected,
                    fallback_tier: tier.into(),
                };
            }
        }

        tracing::debug!(%parameter, "no tier matched any page");
        MatchResult {
            parameter,
            pages: Vec::new(),
            fallback_tier: FallbackTier::None,
        }
    }

    /// Match every parameter in the given order.
    pub fn match_all<'p>(
        &self,
        parameters: &[Parameter],
        pages: &'p [Page],
    ) -> Vec<MatchResult<'p>> {
        parameters
            .iter()
            .map(|&parameter| self.match_parameter(parameter, pages))
            .collect()
    }

    /// Score every page, keep positive scores, order by score descending
    /// with page index ascending as tiebreaker, truncate to top-K.
    fn select_pages<'p>(&self, keywords: &KeywordSet, pages: &'p [Page]) -> Vec<&'p Page> {
        let mut scored: Vec<(usize, &Page)> = pages
            .iter()
            .map(|page| (scorer::score(&page.text, keywords).value, page))
            .filter(|(value, _)| *value > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.index.cmp(&b.1.index)));
        scored.truncate(self.options.top_k);
        scored.into_iter().map(|(_, page)| page).collect()
    }
}
