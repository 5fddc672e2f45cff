//! PDF loading: one document per page.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Text of one page together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub page_content: String,
    pub source: String,
    /// Zero-based page index.
    pub page: u32,
}

/// True when the bytes carry a PDF header within the first KiB.
pub fn looks_like_pdf(data: &[u8]) -> bool {
    let window = &data[..data.len().min(1024)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

pub fn load_pdf(path: &Path, source: &str) -> Result<Vec<PageDocument>, ApiError> {
    let data = std::fs::read(path).map_err(|e| {
        ApiError::Internal(format!("Failed to read {}: {}", path.display(), e))
    })?;
    load_pdf_bytes(&data, source)
}

pub fn load_pdf_bytes(data: &[u8], source: &str) -> Result<Vec<PageDocument>, ApiError> {
    if !looks_like_pdf(data) {
        return Err(ApiError::BadRequest(format!("{} is not a PDF document", source)));
    }

    let document = lopdf::Document::load_mem(data)
        .map_err(|e| ApiError::BadRequest(format!("Failed to parse PDF {}: {}", source, e)))?;

    let mut pages = Vec::new();
    for (index, page_number) in document.get_pages().keys().enumerate() {
        let text = match document.extract_text(&[*page_number]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("No text on page {} of {}: {}", page_number, source, e);
                String::new()
            }
        };
        pages.push(PageDocument {
            page_content: normalize_page_text(&text),
            source: source.to_string(),
            page: index as u32,
        });
    }

    Ok(whole_document_fallback(pages, source, || {
        pdf_extract::extract_text_from_mem(data).map_err(|e| e.to_string())
    }))
}

/// Replaces pages that all came out blank with one document from `extract_all`.
/// Some fonts defeat per-page extraction; the whole-document pass handles more encodings.
fn whole_document_fallback(
    pages: Vec<PageDocument>,
    source: &str,
    extract_all: impl FnOnce() -> Result<String, String>,
) -> Vec<PageDocument> {
    if !pages.iter().all(|p| p.page_content.trim().is_empty()) {
        return pages;
    }

    match extract_all() {
        Ok(text) if !text.trim().is_empty() => {
            tracing::debug!("Falling back to whole-document extraction for {}", source);
            vec![PageDocument {
                page_content: normalize_page_text(&text),
                source: source.to_string(),
                page: 0,
            }]
        }
        Ok(_) => pages,
        Err(e) => {
            tracing::warn!("Whole-document extraction failed for {}: {}", source, e);
            pages
        }
    }
}

/// Normalizes line endings and trims trailing spaces; paragraph breaks are kept.
fn normalize_page_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
