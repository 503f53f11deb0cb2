//! End-to-end engine tests against the rulebook shipped in `config/`.
//!
//! These exercise the classify-then-match flow the CLI runs, with the real
//! keyword configuration rather than the unit-test fixtures.

use std::path::PathBuf;

use tendersift_core::{
    CategoryTag, FallbackTier, MatchOptions, Page, PageClassifier, Parameter,
    ParameterPageMatcher, RulebookCache,
};

fn shipped_rulebook_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config/keywords_config.json")
}

fn document() -> Vec<Page> {
    vec![
        Page::new(0, "מכרז פומבי 12/2024 - הזמנה להציע הצעות לאספקת שירותי מחשוב"),
        Page::new(1, "תוכן עניינים: פרק א - כללי, פרק ב - תנאי סף, נספחים"),
        Page::new(
            2,
            "תנאי סף להשתתפות: ניסיון מוכח של חמש שנים, מחזור כספי שנתי של מיליון שקל",
        ),
        Page::new(
            3,
            "ערבות בנקאית בסך 5% מסכום ההצעה תצורף להצעה. תקופת ההתקשרות הינה 24 חודשים עם אופציה להארכה",
        ),
        Page::new(
            4,
            "שיטת הערכה: שקלול של 70% איכות ו-30% מחיר. התשלום יבוצע לפי החוזה",
        ),
        Page::new(5, ""),
    ]
}

#[test]
fn shipped_rulebook_is_valid() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    cache.get().expect("shipped rulebook must validate");
}

#[test]
fn classification_tags_expected_pages() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    let rulebook = cache.get().unwrap();
    let classifier = PageClassifier::new(&rulebook);

    let mut pages = document();
    classifier.classify_all(&mut pages);

    assert!(pages[0].tags.contains(&CategoryTag::CoverPage));
    assert!(pages[1].tags.contains(&CategoryTag::TableOfContents));
    // The guarantee/payment page speaks both legal and financial language.
    assert!(pages[4].tags.contains(&CategoryTag::FinancialInfo));
    assert!(pages[4].tags.contains(&CategoryTag::LegalTerms));
    // An empty page stays untagged and is still a valid page.
    assert!(pages[5].tags.is_empty());
}

#[test]
fn matching_covers_all_parameters_without_error() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    let rulebook = cache.get().unwrap();
    let matcher = ParameterPageMatcher::new(&rulebook, MatchOptions::default());

    let pages = document();
    let results = matcher.match_all(&Parameter::ALL, &pages);
    assert_eq!(results.len(), Parameter::ALL.len());

    for result in &results {
        if result.parameter == Parameter::IdeaAuthor {
            assert!(result.pages.is_empty());
            assert_eq!(result.fallback_tier, FallbackTier::None);
        }
    }
}

#[test]
fn bid_guarantee_and_contract_period_match_their_page() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    let rulebook = cache.get().unwrap();
    let matcher = ParameterPageMatcher::new(&rulebook, MatchOptions::default());

    let pages = document();

    let guarantee = matcher.match_parameter(Parameter::BidGuarantee, &pages);
    assert_eq!(guarantee.fallback_tier, FallbackTier::Primary);
    assert!(guarantee.page_numbers().contains(&4));

    let period = matcher.match_parameter(Parameter::ContractPeriod, &pages);
    assert_eq!(period.fallback_tier, FallbackTier::Primary);
    assert!(period.page_numbers().contains(&4));
}

#[test]
fn idea_author_ignores_consultant_mentions() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    let rulebook = cache.get().unwrap();
    let matcher = ParameterPageMatcher::new(&rulebook, MatchOptions::default());

    let pages = vec![
        Page::new(0, "המסמך הוכן על ידי יועץ חיצוני"),
        Page::new(1, "the consultant who prepared this tender"),
    ];

    let result = matcher.match_parameter(Parameter::IdeaAuthor, &pages);
    assert!(result.pages.is_empty());
    assert_eq!(result.fallback_tier, FallbackTier::None);
}

#[test]
fn full_run_is_deterministic() {
    let cache = RulebookCache::new(shipped_rulebook_path());
    let rulebook = cache.get().unwrap();
    let classifier = PageClassifier::new(&rulebook);
    let matcher = ParameterPageMatcher::new(&rulebook, MatchOptions::default());

    let mut first_pages = document();
    classifier.classify_all(&mut first_pages);
    let first: Vec<_> = matcher
        .match_all(&Parameter::ALL, &first_pages)
        .iter()
        .map(|m| (m.parameter, m.page_numbers(), m.fallback_tier))
        .collect();

    let mut second_pages = document();
    classifier.classify_all(&mut second_pages);
    let second: Vec<_> = matcher
        .match_all(&Parameter::ALL, &second_pages)
        .iter()
        .map(|m| (m.parameter, m.page_numbers(), m.fallback_tier))
        .collect();

    assert_eq!(first, second);
}
