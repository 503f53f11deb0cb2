//! Keyword rulebook: the single source of truth for all category and
//! parameter keyword sets, loaded once and cached.
//!
//! The backing document is JSON with four mandatory top-level sections:
//! `page_classification`, `parameter_matching`, `fallback_keywords` and
//! `generic_search`. Validation is eager — a malformed document fails at
//! construction, before any page is processed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwapOption;
use serde::Deserialize;
use thiserror::Error;

use crate::{CategoryTag, Parameter, Tier};

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("rulebook file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("rulebook is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rulebook is missing required section `{0}`")]
    MissingSection(&'static str),
    #[error("no keyword entry for category `{0}`")]
    MissingCategory(CategoryTag),
    #[error("keyword entry for category `{0}` contains no terms")]
    EmptyCategory(CategoryTag),
    #[error("keyword term for `{0}` is empty")]
    EmptyTerm(String),
    #[error("unknown parameter identifier `{0}`")]
    UnknownParameter(String),
}

/// Terms for one language: either a flat ordered list or named sub-groups.
///
/// Sub-groups exist purely for the rule author's organization; scoring
/// flattens them. Duplicate terms across groups are kept — each listed term
/// is a distinct scoring unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TermGroups {
    Flat(Vec<String>),
    Grouped(BTreeMap<String, Vec<String>>),
}

impl TermGroups {
    fn terms(&self) -> Vec<&str> {
        match self {
            TermGroups::Flat(list) => list.iter().map(String::as_str).collect(),
            TermGroups::Grouped(groups) => groups
                .values()
                .flat_map(|list| list.iter().map(String::as_str))
                .collect(),
        }
    }
}

/// Per-language keyword collection for one category or one parameter tier.
///
/// Keys are language tags ("english", "hebrew"); synthesized and flat
/// fallback sets use the "generic" tag. Flattening order is language tag
/// order, then sub-group name order, then listed order — deterministic, and
/// only visible in the ordering of matched terms.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(pub BTreeMap<String, TermGroups>);

impl KeywordSet {
    /// A single-language flat set, used for SECONDARY and TERTIARY tiers.
    pub fn flat(language: &str, terms: Vec<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(language.to_string(), TermGroups::Flat(terms));
        KeywordSet(map)
    }

    /// All terms across languages and sub-groups, order preserved,
    /// duplicates kept.
    pub fn flattened(&self) -> Vec<&str> {
        self.0.values().flat_map(|g| g.terms()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.flattened().is_empty()
    }
}

/// Flags controlling TERTIARY keyword synthesis from a parameter identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct NameTransformations {
    /// Include the identifier with underscores replaced by spaces.
    #[serde(default = "default_true")]
    pub replace_underscore: bool,
    /// Include the identifier unchanged.
    #[serde(default = "default_true")]
    pub include_original: bool,
    /// Additional literal patterns; `{parameter}` is substituted with the
    /// raw identifier.
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for NameTransformations {
    fn default() -> Self {
        Self {
            replace_underscore: true,
            include_original: true,
            additional_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RulebookDoc {
    page_classification: Option<BTreeMap<String, KeywordSet>>,
    parameter_matching: Option<BTreeMap<String, KeywordSet>>,
    fallback_keywords: Option<FallbackSection>,
    generic_search: Option<GenericSearchSection>,
}

#[derive(Debug, Deserialize)]
struct FallbackSection {
    parameter_matching: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct GenericSearchSection {
    parameter_name_transformations: Option<NameTransformations>,
}

/// Validated, in-memory keyword configuration.
#[derive(Debug, Clone)]
pub struct KeywordRulebook {
    categories: BTreeMap<CategoryTag, KeywordSet>,
    parameters: BTreeMap<Parameter, KeywordSet>,
    fallback_parameters: BTreeMap<Parameter, Vec<String>>,
    transformations: NameTransformations,
}

impl KeywordRulebook {
    /// Load and validate the rulebook from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            return Err(ConfigurationError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::Io(path.to_path_buf(), e))?;
        let rulebook = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "loaded keyword rulebook");
        Ok(rulebook)
    }

    /// Parse and validate a rulebook document.
    ///
    /// All four top-level sections are mandatory. Every category must have a
    /// non-empty entry (categories have no lower tier to fall back to);
    /// parameter entries may be missing since SECONDARY and TERTIARY cover
    /// them.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let doc: RulebookDoc = serde_json::from_str(json)?;

        let page_classification = doc
            .page_classification
            .ok_or(ConfigurationError::MissingSection("page_classification"))?;
        let parameter_matching = doc
            .parameter_matching
            .ok_or(ConfigurationError::MissingSection("parameter_matching"))?;
        let fallback = doc
            .fallback_keywords
            .ok_or(ConfigurationError::MissingSection("fallback_keywords"))?
            .parameter_matching
            .ok_or(ConfigurationError::MissingSection(
                "fallback_keywords.parameter_matching",
            ))?;
        let transformations = doc
            .generic_search
            .ok_or(ConfigurationError::MissingSection("generic_search"))?
            .parameter_name_transformations
            .ok_or(ConfigurationError::MissingSection(
                "generic_search.parameter_name_transformations",
            ))?;

        let mut categories = BTreeMap::new();
        for tag in CategoryTag::ALL {
            let set = page_classification
                .get(tag.as_str())
                .cloned()
                .ok_or(ConfigurationError::MissingCategory(tag))?;
            if set.is_empty() {
                return Err(ConfigurationError::EmptyCategory(tag));
            }
            validate_terms(tag.as_str(), &set)?;
            categories.insert(tag, set);
        }

        let mut parameters = BTreeMap::new();
        for (name, set) in &parameter_matching {
            // Entries for identifiers outside the fixed parameter set are
            // ignored; the parameter list collaborator defines what runs.
            if let Ok(parameter) = Parameter::parse(name) {
                validate_terms(name, set)?;
                parameters.insert(parameter, set.clone());
            } else {
                tracing::warn!(entry = %name, "ignoring rulebook entry for unknown parameter");
            }
        }

        let mut fallback_parameters = BTreeMap::new();
        for (name, terms) in &fallback {
            if let Ok(parameter) = Parameter::parse(name) {
                if terms.iter().any(|t| t.trim().is_empty()) {
                    return Err(ConfigurationError::EmptyTerm(name.clone()));
                }
                fallback_parameters.insert(parameter, terms.clone());
            }
        }

        Ok(Self {
            categories,
            parameters,
            fallback_parameters,
            transformations,
        })
    }

    /// Keyword set for a page category. Guaranteed present and non-empty by
    /// construction-time validation.
    pub fn category_keywords(&self, category: CategoryTag) -> &KeywordSet {
        &self.categories[&category]
    }

    /// Keyword set for a parameter at the given fallback tier.
    ///
    /// PRIMARY and SECONDARY may be empty when the configuration has no
    /// entry for the parameter; TERTIARY is synthesized and never empty.
    pub fn parameter_keywords(&self, parameter: Parameter, tier: Tier) -> KeywordSet {
        match tier {
            Tier::Primary => self.parameters.get(&parameter).cloned().unwrap_or_default(),
            Tier::Secondary => self
                .fallback_parameters
                .get(&parameter)
                .map(|terms| KeywordSet::flat("generic", terms.clone()))
                .unwrap_or_default(),
            Tier::Tertiary => self.synthesize(parameter),
        }
    }

    /// Build the TERTIARY keyword set from the parameter's own identifier.
    ///
    /// This is the guaranteed floor: if every transformation flag is off and
    /// no additional patterns are configured, the separator-replaced
    /// identifier is emitted anyway.
    fn synthesize(&self, parameter: Parameter) -> KeywordSet {
        let ident = parameter.as_str();
        let spaced = ident.replace('_', " ");
        let t = &self.transformations;

        let mut terms = Vec::new();
        if t.replace_underscore {
            terms.push(spaced.clone());
        }
        if t.include_original {
            terms.push(ident.to_string());
        }
        for pattern in &t.additional_patterns {
            terms.push(pattern.replace("{parameter}", ident));
        }
        if terms.is_empty() {
            terms.push(spaced);
        }
        KeywordSet::flat("generic", terms)
    }
}

fn validate_terms(entry: &str, set: &KeywordSet) -> Result<(), ConfigurationError> {
    if set.flattened().iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigurationError::EmptyTerm(entry.to_string()));
    }
    Ok(())
}

/// Process-wide cache around the rulebook source.
///
/// The source document is read at most once per process lifetime, on first
/// access; `reload` is the only invalidation. Intended usage populates the
/// cache before any concurrent reader starts, so the mutex here is an
/// initialization barrier, not an ongoing lock.
pub struct RulebookCache {
    source: PathBuf,
    slot: ArcSwapOption<KeywordRulebook>,
    init: Mutex<()>,
}

impl RulebookCache {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            slot: ArcSwapOption::const_empty(),
            init: Mutex::new(()),
        }
    }

    /// The cached rulebook, loading the source on first call.
    pub fn get(&self) -> Result<Arc<KeywordRulebook>, ConfigurationError> {
        if let Some(rulebook) = self.slot.load_full() {
            return Ok(rulebook);
        }
        let _guard = self.init.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have populated the slot while we waited.
        if let Some(rulebook) = self.slot.load_full() {
            return Ok(rulebook);
        }
        let rulebook = Arc::new(KeywordRulebook::load(&self.source)?);
        self.slot.store(Some(Arc::clone(&rulebook)));
        Ok(rulebook)
    }

    /// Re-read the source and replace the cached rulebook.
    pub fn reload(&self) -> Result<Arc<KeywordRulebook>, ConfigurationError> {
        let _guard = self.init.lock().unwrap_or_else(|e| e.into_inner());
        let rulebook = Arc::new(KeywordRulebook::load(&self.source)?);
        self.slot.store(Some(Arc::clone(&rulebook)));
        tracing::info!(path = %self.source.display(), "reloaded keyword rulebook");
        Ok(rulebook)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal but complete rulebook used across the engine's tests.
    pub(crate) fn sample_rulebook_json() -> String {
        let mut categories = String::new();
        for tag in CategoryTag::ALL {
            let (english, hebrew) = match tag {
                CategoryTag::CoverPage => (r#"["tender", "invitation to bid"]"#, r#"["מכרז"]"#),
                CategoryTag::TableOfContents => {
                    (r#"["table of contents", "contents"]"#, r#"["תוכן עניינים"]"#)
                }
                CategoryTag::LegalTerms => (r#"["legal", "contract"]"#, r#"["חוזה", "הסכם"]"#),
                CategoryTag::FinancialInfo => (r#"["payment", "price"]"#, r#"["תשלום", "מחיר"]"#),
                _ => (r#"["placeholder"]"#, "[]"),
            };
            categories.push_str(&format!(
                r#""{}": {{"english": {english}, "hebrew": {hebrew}}},"#,
                tag.as_str()
            ));
        }
        categories.pop(); // trailing comma

        format!(
            r#"{{
  "page_classification": {{ {categories} }},
  "parameter_matching": {{
    "client_name": {{
      "english": ["client", "organization"],
      "hebrew": ["מזמין", "רשות"]
    }},
    "bid_guarantee": {{
      "english": ["bid guarantee", "bank guarantee"],
      "hebrew": {{
        "guarantee_terms": ["ערבות", "בנקאית"],
        "amount_terms": ["בסך", "אחוז"]
      }}
    }},
    "evaluation_method": {{
      "english": ["evaluation", "scoring"],
      "hebrew": ["אמות מידה", "ניקוד"]
    }}
  }},
  "fallback_keywords": {{
    "parameter_matching": {{
      "client_name": ["מזמין"],
      "tender_name": ["שם המכרז", "tender name"]
    }}
  }},
  "generic_search": {{
    "parameter_name_transformations": {{
      "replace_underscore": true,
      "include_original": true,
      "additional_patterns": []
    }}
  }}
}}"#
        )
    }

    pub(crate) fn sample_rulebook() -> KeywordRulebook {
        KeywordRulebook::from_json(&sample_rulebook_json()).unwrap()
    }

    #[test]
    fn parses_complete_document() {
        let rulebook = sample_rulebook();
        assert!(!rulebook.category_keywords(CategoryTag::CoverPage).is_empty());
    }

    #[test]
    fn missing_section_is_fatal() {
        let err = KeywordRulebook::from_json(r#"{"page_classification": {}}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingSection("parameter_matching")
        ));
    }

    #[test]
    fn invalid_json_is_fatal() {
        assert!(matches!(
            KeywordRulebook::from_json("not json").unwrap_err(),
            ConfigurationError::Parse(_)
        ));
    }

    #[test]
    fn missing_category_is_fatal() {
        // Every category except cover_page.
        let json = sample_rulebook_json().replace("\"cover_page\"", "\"cover_page_renamed\"");
        let err = KeywordRulebook::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingCategory(CategoryTag::CoverPage)
        ));
    }

    #[test]
    fn empty_term_is_fatal() {
        let json = sample_rulebook_json().replace(r#"["client", "organization"]"#, r#"["client", ""]"#);
        assert!(matches!(
            KeywordRulebook::from_json(&json).unwrap_err(),
            ConfigurationError::EmptyTerm(_)
        ));
    }

    #[test]
    fn flatten_keeps_subgroup_duplicates() {
        let set: KeywordSet = serde_json::from_str(
            r#"{"hebrew": {"a_group": ["ערבות", "בנקאית"], "b_group": ["ערבות"]}}"#,
        )
        .unwrap();
        assert_eq!(set.flattened(), vec!["ערבות", "בנקאית", "ערבות"]);
    }

    #[test]
    fn flatten_orders_languages_then_groups() {
        let set: KeywordSet = serde_json::from_str(
            r#"{"hebrew": ["ב"], "english": {"z_group": ["late"], "a_group": ["early"]}}"#,
        )
        .unwrap();
        assert_eq!(set.flattened(), vec!["early", "late", "ב"]);
    }

    #[test]
    fn primary_missing_entry_is_empty() {
        let rulebook = sample_rulebook();
        assert!(rulebook
            .parameter_keywords(Parameter::ContractPeriod, Tier::Primary)
            .is_empty());
    }

    #[test]
    fn secondary_is_independent_flat_list() {
        let rulebook = sample_rulebook();
        let set = rulebook.parameter_keywords(Parameter::TenderName, Tier::Secondary);
        assert_eq!(set.flattened(), vec!["שם המכרז", "tender name"]);
    }

    #[test]
    fn tertiary_applies_both_transformations() {
        let rulebook = sample_rulebook();
        let set = rulebook.parameter_keywords(Parameter::ContractPeriod, Tier::Tertiary);
        assert_eq!(set.flattened(), vec!["contract period", "contract_period"]);
    }

    #[test]
    fn tertiary_additional_patterns_substitute_identifier() {
        let json = sample_rulebook_json().replace(
            r#""additional_patterns": []"#,
            r#""additional_patterns": ["{parameter} details"]"#,
        );
        let rulebook = KeywordRulebook::from_json(&json).unwrap();
        let set = rulebook.parameter_keywords(Parameter::ContractPeriod, Tier::Tertiary);
        assert!(set
            .flattened()
            .contains(&"contract_period details"));
    }

    #[test]
    fn tertiary_never_empty_even_with_all_flags_off() {
        let json = sample_rulebook_json()
            .replace(r#""replace_underscore": true"#, r#""replace_underscore": false"#)
            .replace(r#""include_original": true"#, r#""include_original": false"#);
        let rulebook = KeywordRulebook::from_json(&json).unwrap();
        for parameter in Parameter::ALL {
            let set = rulebook.parameter_keywords(parameter, Tier::Tertiary);
            assert!(!set.is_empty(), "tertiary floor violated for {parameter}");
        }
    }

    #[test]
    fn cache_reads_source_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, sample_rulebook_json()).unwrap();

        let cache = RulebookCache::new(&path);
        let first = cache.get().unwrap();

        // Remove the backing file; cached access must keep working.
        std::fs::remove_file(&path).unwrap();
        let second = cache.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_reload_replaces_rulebook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, sample_rulebook_json()).unwrap();

        let cache = RulebookCache::new(&path);
        let first = cache.get().unwrap();

        let updated = sample_rulebook_json().replace(r#"["מזמין"]"#, r#"["מזמין", "לקוח"]"#);
        std::fs::write(&path, updated).unwrap();
        let second = cache.reload().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            second
                .parameter_keywords(Parameter::ClientName, Tier::Secondary)
                .flattened(),
            vec!["מזמין", "לקוח"]
        );
    }

    #[test]
    fn cache_missing_file_errors() {
        let cache = RulebookCache::new("/nonexistent/keywords.json");
        assert!(matches!(
            cache.get().unwrap_err(),
            ConfigurationError::NotFound(_)
        ));
    }
}
