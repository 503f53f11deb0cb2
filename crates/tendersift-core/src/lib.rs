use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod classifier;
pub mod config_file;
pub mod matcher;
pub mod rulebook;
pub mod scorer;

// Re-export for convenience
pub use classifier::PageClassifier;
pub use matcher::{MatchOptions, ParameterPageMatcher};
pub use rulebook::{ConfigurationError, KeywordRulebook, KeywordSet, RulebookCache};
pub use scorer::{score, Score};

/// A single page extracted from a tender document.
///
/// Pages are produced by a [`PdfBackend`] and owned by the pipeline run.
/// [`PageClassifier`] writes the `tags` field; nothing else mutates a page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in the source document.
    pub index: usize,
    /// Cleaned extracted text; may mix Latin and Hebrew script.
    pub text: String,
    pub tags: BTreeSet<CategoryTag>,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            tags: BTreeSet::new(),
        }
    }

    /// 1-based page number as shown to users and in reports.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Semantic category of a page's content. A page may carry several tags,
/// or none at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTag {
    CoverPage,
    TableOfContents,
    GeneralInfo,
    TechnicalSpecs,
    FinancialInfo,
    LegalTerms,
    EvaluationCriteria,
    SubmissionRequirements,
    ContactInfo,
    Appendix,
}

impl CategoryTag {
    pub const ALL: [CategoryTag; 10] = [
        CategoryTag::CoverPage,
        CategoryTag::TableOfContents,
        CategoryTag::GeneralInfo,
        CategoryTag::TechnicalSpecs,
        CategoryTag::FinancialInfo,
        CategoryTag::LegalTerms,
        CategoryTag::EvaluationCriteria,
        CategoryTag::SubmissionRequirements,
        CategoryTag::ContactInfo,
        CategoryTag::Appendix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryTag::CoverPage => "cover_page",
            CategoryTag::TableOfContents => "table_of_contents",
            CategoryTag::GeneralInfo => "general_info",
            CategoryTag::TechnicalSpecs => "technical_specs",
            CategoryTag::FinancialInfo => "financial_info",
            CategoryTag::LegalTerms => "legal_terms",
            CategoryTag::EvaluationCriteria => "evaluation_criteria",
            CategoryTag::SubmissionRequirements => "submission_requirements",
            CategoryTag::ContactInfo => "contact_info",
            CategoryTag::Appendix => "appendix",
        }
    }
}

impl std::fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extraction parameter. The set is fixed by the external parameter list;
/// variants are never created or destroyed at runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    ClientName,
    TenderName,
    ThresholdConditions,
    ContractPeriod,
    EvaluationMethod,
    BidGuarantee,
    IdeaAuthor,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::ClientName,
        Parameter::TenderName,
        Parameter::ThresholdConditions,
        Parameter::ContractPeriod,
        Parameter::EvaluationMethod,
        Parameter::BidGuarantee,
        Parameter::IdeaAuthor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::ClientName => "client_name",
            Parameter::TenderName => "tender_name",
            Parameter::ThresholdConditions => "threshold_conditions",
            Parameter::ContractPeriod => "contract_period",
            Parameter::EvaluationMethod => "evaluation_method",
            Parameter::BidGuarantee => "bid_guarantee",
            Parameter::IdeaAuthor => "idea_author",
        }
    }

    /// Parse an identifier from the external parameters list.
    pub fn parse(s: &str) -> Result<Self, ConfigurationError> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownParameter(s.to_string()))
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback rank of a keyword rule set for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Primary,
    Secondary,
    Tertiary,
}

impl Tier {
    /// Resolution order for the fallback chain.
    pub const CHAIN: [Tier; 3] = [Tier::Primary, Tier::Secondary, Tier::Tertiary];
}

/// Which tier actually produced a match, or `None` when no tier did
/// (a normal "parameter not found in document" outcome, not an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTier {
    Primary,
    Secondary,
    Tertiary,
    None,
}

impl From<Tier> for FallbackTier {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Primary => FallbackTier::Primary,
            Tier::Secondary => FallbackTier::Secondary,
            Tier::Tertiary => FallbackTier::Tertiary,
        }
    }
}

impl std::fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FallbackTier::Primary => "primary",
            FallbackTier::Secondary => "secondary",
            FallbackTier::Tertiary => "tertiary",
            FallbackTier::None => "none",
        };
        f.write_str(s)
    }
}

/// The outcome of matching one parameter against the document's pages.
/// Immutable after creation; consumed by the prompt builder.
#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub parameter: Parameter,
    /// Best-first: score descending, ties broken by page index ascending.
    pub pages: Vec<&'a Page>,
    pub fallback_tier: FallbackTier,
}

impl MatchResult<'_> {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 1-based page numbers of the matched pages, in match order.
    pub fn page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.number()).collect()
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF page extraction backends.
///
/// Implementors provide the low-level per-page text extraction step; cleaning
/// and everything downstream (classification, matching, prompting) is backend
/// independent.
pub trait PdfBackend: Send + Sync {
    /// Extract all pages of a PDF in source order.
    fn extract_pages(&self, path: &Path) -> Result<Vec<Page>, BackendError>;
}

/// Load the parameter list from a JSON array of identifier strings.
///
/// The file is produced by an external collaborator; order is preserved.
pub fn load_parameters(path: &Path) -> Result<Vec<Parameter>, ConfigurationError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigurationError::Io(path.to_path_buf(), e))?;
    let names: Vec<String> = serde_json::from_str(&content)?;
    names.iter().map(|n| Parameter::parse(n)).collect()
}
