use thiserror::Error;

use tendersift_core::Parameter;

pub mod client;
pub mod prompt;
pub mod response;

// Re-export for convenience
pub use client::{ExtractionClient, GeminiClient, LlmConfig};
pub use prompt::{build_prompt, PromptRequest};
pub use response::{clean_extracted_value, parse_model_output, NOT_FOUND};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("empty response from model")]
    EmptyResponse,
    #[error("model returned HTTP {0}")]
    Status(u16),
    #[error("all {0} extraction attempts failed: {1}")]
    RetriesExhausted(u32, String),
    #[error("extraction cancelled")]
    Cancelled,
}

/// One extraction outcome for one parameter.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub parameter: Parameter,
    /// Extracted value, or [`NOT_FOUND`].
    pub answer: String,
    /// Supporting context from the document.
    pub details: String,
    /// Heuristic 0.0–1.0 confidence in the extracted value.
    pub confidence: f64,
    /// 1-based numbers of the pages the prompt was built from.
    pub page_numbers: Vec<usize>,
}

impl Extraction {
    /// A fixed "not found" outcome, emitted without contacting the model —
    /// used for parameters whose match produced no pages.
    pub fn not_found(parameter: Parameter) -> Self {
        Self {
            parameter,
            answer: NOT_FOUND.to_string(),
            details: String::new(),
            confidence: 0.0,
            page_numbers: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.answer != NOT_FOUND
    }
}

/// Progress events emitted during batch extraction.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Extracting {
        index: usize,
        total: usize,
        parameter: Parameter,
    },
    Extracted {
        index: usize,
        total: usize,
        extraction: Box<Extraction>,
    },
    /// A parameter skipped the model because its match had no pages.
    SkippedNoPages {
        index: usize,
        total: usize,
        parameter: Parameter,
    },
    Retrying {
        parameter: Parameter,
        attempt: u32,
        backoff_ms: u64,
    },
}
