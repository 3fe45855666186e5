#[cfg(test)]
mod tests;

use lopdf::Document;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{FaqError, Result};

/// Extract the text of every page of a PDF, in page order.
///
/// Fails if the file does not exist or cannot be parsed. Pages whose text
/// cannot be decoded are skipped with a warning.
#[inline]
pub fn extract_text_from_pdf(path: &Path) -> Result<String> {
    info!("Extracting text from {}", path.display());

    if !path.exists() {
        return Err(FaqError::Ingestion(format!(
            "PDF file not found at {}",
            path.display()
        )));
    }

    let document = Document::load(path).map_err(|e| {
        FaqError::Ingestion(format!("Failed to load PDF {}: {}", path.display(), e))
    })?;

    let text = extract_text_from_document(&document);
    info!("Extracted {} characters from PDF", text.chars().count());
    Ok(text)
}

/// Extract text from a PDF held in memory
#[inline]
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| FaqError::Ingestion(format!("Failed to load PDF: {}", e)))?;

    Ok(extract_text_from_document(&document))
}

fn extract_text_from_document(document: &Document) -> String {
    // get_pages is keyed by page number, so iteration is already in page order
    let pages = document.get_pages();
    debug!("PDF has {} pages", pages.len());

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!("Skipping page {}: {}", page_number, e),
        }
    }
    text
}
