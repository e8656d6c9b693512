//! PDF text extraction module
//!
//! Extracts text page by page using lopdf, falling back to a direct
//! content-stream scan when lopdf cannot decode a page.

use crate::errors::IngestionError;
use tracing::{debug, warn};

/// Normalised text of one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number
    pub page_number: u32,
    pub text: String,
}

/// Extract per-page text from raw PDF bytes
///
/// Pages without extractable text are omitted. `label` names the source in
/// errors and logs.
pub fn extract_pages(bytes: &[u8], label: &str) -> Result<Vec<PageText>, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::InvalidPdf {
        path: label.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(IngestionError::InvalidPdf {
            path: label.to_string(),
            message: "PDF has no pages".to_string(),
        });
    }

    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut result = Vec::with_capacity(pages.len());
    for (&page_number, &page_id) in pages.iter() {
        match extract_page_text(&doc, page_number, page_id) {
            Ok(raw) => {
                let text = clean_text(&raw);
                if text.is_empty() {
                    debug!(page = page_number, "Page has no text");
                    continue;
                }
                result.push(PageText { page_number, text });
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    debug!(pages_with_text = result.len(), "Text extraction complete");

    Ok(result)
}

/// Extract text from a single page
fn extract_page_text(
    doc: &lopdf::Document,
    page_number: u32,
    page_id: lopdf::ObjectId,
) -> Result<String, String> {
    match doc.extract_text(&[page_number]) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => {}
        Err(e) => debug!(page = page_number, error = %e, "lopdf extraction failed, scanning content stream"),
    }

    let content = doc.get_page_content(page_id).map_err(|e| e.to_string())?;
    Ok(extract_text_from_content(&content))
}

/// Extract text from PDF content stream
fn extract_text_from_content(content: &[u8]) -> String {
    // Simple text extraction - looks for text between BT and ET operators
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }

        if trimmed == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block {
            // Text showing operators: Tj, TJ, ', "
            if let Some(text_content) = extract_text_from_operator(trimmed) {
                current_text.push_str(&text_content);
            }
        }
    }

    text
}

/// Extract text from a PDF text operator
fn extract_text_from_operator(line: &str) -> Option<String> {
    // (text) Tj
    if line.ends_with("Tj") || line.ends_with('\'') || line.ends_with('"') {
        if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
            if start < end {
                return Some(decode_pdf_string(&line[start + 1..end]));
            }
        }
    }

    // [(text) num (text) num] TJ
    if line.ends_with("TJ") {
        let mut result = String::new();
        let mut in_paren = false;
        let mut escaped = false;
        let mut current = String::new();

        for ch in line.chars() {
            match ch {
                _ if escaped => {
                    current.push('\\');
                    current.push(ch);
                    escaped = false;
                }
                '\\' if in_paren => escaped = true,
                '(' if !in_paren => in_paren = true,
                ')' if in_paren => {
                    in_paren = false;
                    result.push_str(&decode_pdf_string(&current));
                    current.clear();
                }
                _ if in_paren => current.push(ch),
                _ => {}
            }
        }

        if !result.is_empty() {
            return Some(result);
        }
    }

    None
}

/// Decode PDF string escapes
fn decode_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(c) => result.push(c),
                None => {}
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Collapse whitespace and strip common extraction artifacts
pub(crate) fn clean_text(text: &str) -> String {
    text.replace('\u{FEFF}', "")
        .replace('\u{0}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
