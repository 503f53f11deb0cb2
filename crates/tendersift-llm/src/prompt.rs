//! Prompt construction for per-parameter extraction requests.
//!
//! Each parameter has an instruction template with a Hebrew description and
//! few-shot JSON examples; the matched pages are appended under explicit
//! page headers. A match with no pages produces no prompt at all — that is
//! what turns an empty [`MatchResult`] into a fixed "not found" answer
//! without an API call.

use tendersift_core::{MatchResult, Parameter};

/// System prompt shared by all extractions.
pub const SYSTEM_PROMPT: &str = "You are an expert document analyst specializing in tender and \
procurement documents. Extract the requested information from the provided pages only. \
Respond as JSON with two fields, \"answer\" and \"details\", both in Hebrew. \
If the information is not present, use \"NOT_FOUND\" for both fields.";

/// Marker appended when page content is truncated to fit the length budget.
pub const TRUNCATION_MARKER: &str = "[CONTENT TRUNCATED FOR LENGTH]";

/// A ready-to-send extraction request.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub parameter: Parameter,
    pub prompt: String,
    /// 1-based numbers of the pages included in the prompt.
    pub page_numbers: Vec<usize>,
}

struct Template {
    instruction: &'static str,
    examples: &'static [&'static str],
}

fn template(parameter: Parameter) -> Template {
    match parameter {
        Parameter::ClientName => Template {
            instruction: "Extract the CLIENT NAME (שם המזמין) — the organization issuing this \
tender. Look for the procuring entity, government authority, municipality or company named as \
the contracting party. Return the full official name as it appears in the document, in Hebrew.",
            examples: &[
                r#"{"answer": "משרד הבריאות", "details": "משרד ממשלתי האחראי על רכש ציוד רפואי"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::TenderName => Template {
            instruction: "Extract the TENDER NAME (שם המכרז) — the full title of the tender, \
including its number and type (public, two-stage, etc.). Look for the tender title, project \
name or RFP subject. Return the complete title in Hebrew.",
            examples: &[
                r#"{"answer": "מכרז פומבי 12/2024 לאספקת ציוד רפואי", "details": "רכש ציוד רפואי למתקני בריאות אזוריים"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::ThresholdConditions => Template {
            instruction: "Extract the THRESHOLD CONDITIONS (תנאי סף) — mandatory requirements \
for participation: experience, licensing, financial turnover, legal compliance. Return the \
specific conditions as stated, in Hebrew.",
            examples: &[
                r#"{"answer": "ניסיון מוכח של 5 שנים בפרויקטים דומים", "details": "הניסיון יוכח באמצעות המלצות לקוחות"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::ContractPeriod => Template {
            instruction: "Extract the CONTRACT PERIOD (תקופת ההתקשרות) — how long the \
engagement lasts and any extension options. Look for contract duration, start and end dates, \
or service term. Return the period in Hebrew.",
            examples: &[
                r#"{"answer": "24 חודשים עם אופציה להארכה בשנה נוספת", "details": "תקופת ההתקשרות מפורטת בהסכם"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::EvaluationMethod => Template {
            instruction: "Extract the EVALUATION METHOD (שיטת הערכה) — how bids are weighed: \
price versus quality, scoring criteria and their weights. Return the method as described, in \
Hebrew.",
            examples: &[
                r#"{"answer": "70% איכות, 30% מחיר", "details": "ההערכה האיכותית כוללת ניסיון ומתודולוגיה"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::BidGuarantee => Template {
            instruction: "Extract the BID GUARANTEE (ערבות מכרז) — the guarantee amount, type, \
validity and presentation requirements. Look for bank guarantee or deposit requirements tied \
to bid submission. Return the requirements in Hebrew.",
            examples: &[
                r#"{"answer": "ערבות בנקאית בסך 2% מערך ההצעה", "details": "הערבות תהיה בתוקף 90 יום ממועד ההגשה"}"#,
                r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#,
            ],
        },
        Parameter::IdeaAuthor => Template {
            instruction: "Extract the IDEA AUTHOR (הוגה הרעיון) — the consultant or firm that \
prepared this tender. This detail is typically absent from tender documents. Return the name \
in Hebrew, or NOT_FOUND.",
            examples: &[r#"{"answer": "NOT_FOUND", "details": "NOT_FOUND"}"#],
        },
    }
}

/// Build the extraction prompt for one matched parameter.
///
/// Returns `None` when the match carries no pages — the caller must emit a
/// fixed not-found answer instead of contacting the model.
pub fn build_prompt(matched: &MatchResult<'_>, max_chars: usize) -> Option<PromptRequest> {
    let content_pages: Vec<_> = matched.pages.iter().filter(|p| !p.is_empty()).collect();
    if content_pages.is_empty() {
        return None;
    }

    let t = template(matched.parameter);
    let mut parts = vec![SYSTEM_PROMPT.to_string(), String::new()];
    parts.push(format!("TASK: {}", t.instruction));

    if !t.examples.is_empty() {
        parts.push("\nEXAMPLES:".to_string());
        for example in t.examples {
            parts.push(format!("- {example}"));
        }
    }

    parts.push("\nDOCUMENT CONTENT:".to_string());
    parts.push("=".repeat(50));
    for page in &content_pages {
        parts.push(format!("\n--- PAGE {} ---", page.number()));
        parts.push(page.text.clone());
    }
    parts.push("=".repeat(50));
    parts.push(format!(
        "\nExtract the {} from the above document content. Return JSON with \"answer\" and \
\"details\" fields, both in Hebrew. If not found, use \"NOT_FOUND\" for both.",
        matched.parameter.as_str().replace('_', " ")
    ));

    let prompt = truncate_to_budget(parts.join("\n"), max_chars);

    Some(PromptRequest {
        parameter: matched.parameter,
        page_numbers: content_pages.iter().map(|p| p.number()).collect(),
        prompt,
    })
}

/// Estimated token count for a prompt (rough: 1 token ≈ 4 characters).
pub fn estimate_tokens(prompt: &str) -> usize {
    prompt.len() / 4
}

/// Truncate an over-budget prompt at a paragraph or sentence boundary,
/// appending [`TRUNCATION_MARKER`].
fn truncate_to_budget(prompt: String, max_chars: usize) -> String {
    if prompt.len() <= max_chars {
        return prompt;
    }

    let mut cut = max_chars;
    while !prompt.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = &prompt[..cut];

    // Prefer a paragraph boundary, then a sentence boundary, as long as
    // enough of the content survives.
    if let Some(boundary) = truncated.rfind("\n\n").filter(|&b| b > max_chars * 7 / 10) {
        truncated = &truncated[..boundary];
    } else if let Some(boundary) = truncated.rfind(". ").filter(|&b| b > max_chars * 8 / 10) {
        truncated = &truncated[..boundary + 1];
    }

    tracing::warn!(
        original = prompt.len(),
        truncated = truncated.len(),
        "prompt truncated to length budget"
    );
    format!("{truncated}\n\n{TRUNCATION_MARKER}")
}
