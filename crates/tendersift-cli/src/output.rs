use std::collections::BTreeMap;
use std::io::Write;

use owo_colors::OwoColorize;

use tendersift_core::{CategoryTag, MatchResult, Page};
use tendersift_llm::ProgressEvent;
use tendersift_reporting::Report;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the per-category page counts after classification.
pub fn print_tag_summary(w: &mut dyn Write, pages: &[Page], color: ColorMode) -> std::io::Result<()> {
    let mut counts: BTreeMap<CategoryTag, usize> = BTreeMap::new();
    for page in pages {
        for tag in &page.tags {
            *counts.entry(*tag).or_insert(0) += 1;
        }
    }
    let untagged = pages.iter().filter(|p| p.tags.is_empty()).count();

    writeln!(w, "Classified {} pages:", pages.len())?;
    for (tag, count) in &counts {
        writeln!(w, "  {:<24} {} pages", tag.to_string(), count)?;
    }
    if untagged > 0 {
        if color.enabled() {
            writeln!(w, "{}", format!("  ({} pages untagged)", untagged).dimmed())?;
        } else {
            writeln!(w, "  ({} pages untagged)", untagged)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print the per-parameter match plan (pages and fallback tier).
pub fn print_match_plan(
    w: &mut dyn Write,
    matches: &[MatchResult<'_>],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Parameter matching:")?;
    for m in matches {
        if m.pages.is_empty() {
            if color.enabled() {
                writeln!(
                    w,
                    "  {:<24} {}",
                    m.parameter.to_string(),
                    "no pages (will report not found)".red()
                )?;
            } else {
                writeln!(
                    w,
                    "  {:<24} no pages (will report not found)",
                    m.parameter.to_string()
                )?;
            }
        } else {
            let pages: Vec<String> = m.page_numbers().iter().map(|n| n.to_string()).collect();
            writeln!(
                w,
                "  {:<24} pages {} (tier {})",
                m.parameter.to_string(),
                pages.join(", "),
                m.fallback_tier
            )?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print a real-time extraction progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Extracting {
            index,
            total,
            parameter,
        } => {
            writeln!(w, "[{}/{}] Extracting: {}", index + 1, total, parameter)?;
        }
        ProgressEvent::Extracted {
            index,
            total,
            extraction,
        } => {
            if extraction.is_found() {
                if color.enabled() {
                    writeln!(w, "[{}/{}] -> {}", index + 1, total, "FOUND".green())?;
                } else {
                    writeln!(w, "[{}/{}] -> FOUND", index + 1, total)?;
                }
            } else if color.enabled() {
                writeln!(w, "[{}/{}] -> {}", index + 1, total, "NOT FOUND".red())?;
            } else {
                writeln!(w, "[{}/{}] -> NOT FOUND", index + 1, total)?;
            }
        }
        ProgressEvent::SkippedNoPages {
            index,
            total,
            parameter,
        } => {
            if color.enabled() {
                writeln!(
                    w,
                    "[{}/{}] {} {}",
                    index + 1,
                    total,
                    parameter,
                    "skipped (no matched pages)".dimmed()
                )?;
            } else {
                writeln!(
                    w,
                    "[{}/{}] {} skipped (no matched pages)",
                    index + 1,
                    total,
                    parameter
                )?;
            }
        }
        ProgressEvent::Retrying {
            parameter,
            attempt,
            backoff_ms,
        } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{} {} attempt {} in {}ms",
                    "RETRY:".yellow(),
                    parameter,
                    attempt,
                    backoff_ms
                )?;
            } else {
                writeln!(
                    w,
                    "RETRY: {} attempt {} in {}ms",
                    parameter, attempt, backoff_ms
                )?;
            }
        }
    }
    Ok(())
}

/// Print the final report to the terminal.
pub fn print_report(w: &mut dyn Write, report: &Report, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "TENDER ANALYSIS RESULTS".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(w, "TENDER ANALYSIS RESULTS")?;
        writeln!(w, "{sep}")?;
    }
    writeln!(
        w,
        "Parameters found: {}/{}",
        report.found_count(),
        report.entries.len()
    )?;
    writeln!(w)?;

    for entry in &report.entries {
        if color.enabled() {
            writeln!(w, "{}", entry.parameter.to_string().bold())?;
        } else {
            writeln!(w, "{}", entry.parameter)?;
        }
        if entry.score > 0 && !entry.answer.is_empty() {
            if color.enabled() {
                writeln!(w, "  Answer:  {}", entry.answer.green())?;
            } else {
                writeln!(w, "  Answer:  {}", entry.answer)?;
            }
            if !entry.details.is_empty() {
                writeln!(w, "  Details: {}", entry.details)?;
            }
            writeln!(w, "  Source:  {}", entry.source)?;
            writeln!(w, "  Score:   {}/5", entry.score)?;
        } else if color.enabled() {
            writeln!(w, "  {}", "NOT FOUND".red())?;
        } else {
            writeln!(w, "  NOT FOUND")?;
        }
        writeln!(w)?;
    }
    Ok(())
}
