//! Result formatting and export.
//!
//! The report is the per-parameter `{answer, details, source, score}` map
//! consumed by downstream systems. `source` is a Hebrew page list so the
//! report reads naturally next to the extracted Hebrew values.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use tendersift_core::Parameter;
use tendersift_llm::Extraction;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output formats for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Text => "txt",
        }
    }
}

/// One parameter's row in the final report.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterEntry {
    pub parameter: Parameter,
    pub answer: String,
    pub details: String,
    /// Hebrew page reference, e.g. "עמוד 3, עמוד 7", or "לא נמצא".
    pub source: String,
    /// 0–5 confidence bucket.
    pub score: u8,
}

/// The complete report, entries in extraction order.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub entries: Vec<ParameterEntry>,
}

impl Report {
    pub fn found_count(&self) -> usize {
        self.entries.iter().filter(|e| e.score > 0).count()
    }
}

/// Assemble the report from the batch's extractions.
pub fn build_report(extractions: &[Extraction]) -> Report {
    let entries = extractions
        .iter()
        .map(|e| ParameterEntry {
            parameter: e.parameter,
            answer: if e.is_found() {
                e.answer.clone()
            } else {
                String::new()
            },
            details: if e.is_found() {
                e.details.clone()
            } else {
                String::new()
            },
            source: source_string(e),
            score: confidence_to_score(e.confidence),
        })
        .collect();
    Report { entries }
}

/// Hebrew page reference for an extraction.
fn source_string(extraction: &Extraction) -> String {
    if !extraction.is_found() || extraction.page_numbers.is_empty() {
        return "לא נמצא".to_string();
    }
    let mut pages = extraction.page_numbers.clone();
    pages.sort_unstable();
    pages
        .iter()
        .map(|p| format!("עמוד {p}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bucket a 0.0–1.0 confidence into the report's 0–5 score.
pub fn confidence_to_score(confidence: f64) -> u8 {
    if confidence >= 0.9 {
        5
    } else if confidence >= 0.8 {
        4
    } else if confidence >= 0.6 {
        3
    } else if confidence >= 0.4 {
        2
    } else if confidence >= 0.2 {
        1
    } else {
        0
    }
}

/// Export the report to `path` in the given format.
pub fn export_report(report: &Report, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let content = match format {
        ExportFormat::Json => render_json(report)?,
        ExportFormat::Csv => render_csv(report),
        ExportFormat::Text => render_text(report),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ExportError::Io(parent.display().to_string(), e))?;
    }
    let mut file = std::fs::File::create(path)
        .map_err(|e| ExportError::Io(path.display().to_string(), e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| ExportError::Io(path.display().to_string(), e))?;

    tracing::info!(path = %path.display(), format = ?format, "wrote report");
    Ok(())
}

/// JSON object keyed by parameter identifier.
pub fn render_json(report: &Report) -> Result<String, ExportError> {
    let mut map = serde_json::Map::new();
    for entry in &report.entries {
        map.insert(
            entry.parameter.as_str().to_string(),
            serde_json::json!({
                "answer": entry.answer,
                "details": entry.details,
                "source": entry.source,
                "score": entry.score,
            }),
        );
    }
    Ok(serde_json::to_string_pretty(&serde_json::Value::Object(
        map,
    ))?)
}

pub fn render_csv(report: &Report) -> String {
    let mut out = String::from("parameter,answer,details,source,score\n");
    for entry in &report.entries {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(entry.parameter.as_str()),
            csv_escape(&entry.answer),
            csv_escape(&entry.details),
            csv_escape(&entry.source),
            entry.score
        ));
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Human-readable summary.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let sep = "=".repeat(60);
    out.push_str(&format!("{sep}\nTENDER ANALYSIS RESULTS\n{sep}\n\n"));
    out.push_str(&format!(
        "Parameters found: {}/{}\n\n",
        report.found_count(),
        report.entries.len()
    ));

    for entry in &report.entries {
        out.push_str(&format!("{}\n", entry.parameter));
        if entry.score > 0 && !entry.answer.is_empty() {
            out.push_str(&format!("  Answer:  {}\n", entry.answer));
            if !entry.details.is_empty() {
                out.push_str(&format!("  Details: {}\n", entry.details));
            }
            out.push_str(&format!("  Source:  {}\n", entry.source));
            out.push_str(&format!("  Score:   {}/5\n", entry.score));
        } else {
            out.push_str("  Answer:  NOT FOUND\n");
            out.push_str("  Source:  לא נמצא\n");
            out.push_str("  Score:   0/5\n");
        }
        out.push('\n');
    }
    out
}
