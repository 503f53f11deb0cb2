use std::path::Path;

use mupdf::{Document, TextPageFlags};

use tendersift_core::{BackendError, Page, PdfBackend};

pub mod clean;

/// MuPDF-based implementation of [`PdfBackend`].
///
/// Extracts one [`Page`] per document page in source order. A page whose
/// extraction fails becomes an empty-text page rather than aborting the
/// document — long tender PDFs routinely contain a few scanned or damaged
/// pages, and downstream scoring treats empty text as score zero.
#[derive(Debug, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Page>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        let mut pages = Vec::new();

        for (index, page_result) in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
            .enumerate()
        {
            let text = match extract_page_text(page_result) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(page = index + 1, error = %e, "page extraction failed, keeping empty page");
                    String::new()
                }
            };
            pages.push(Page::new(index, clean::clean_page_text(&text)));
        }

        if pages.is_empty() {
            return Err(BackendError::ExtractionError(
                "no pages extracted from document".into(),
            ));
        }

        tracing::info!(pages = pages.len(), path = %path.display(), "extracted document");
        Ok(pages)
    }
}

fn extract_page_text(
    page_result: Result<mupdf::Page, mupdf::Error>,
) -> Result<String, mupdf::Error> {
    let page = page_result?;
    let text_page = page.to_text_page(TextPageFlags::empty())?;

    let mut page_text = String::new();
    for block in text_page.blocks() {
        for line in block.lines() {
            let line_text: String = line
                .chars()
                .map(|c| c.char().unwrap_or('\u{FFFD}'))
                .collect();
            page_text.push_str(&line_text);
            page_text.push('\n');
        }
    }
    Ok(page_text)
}
