//! Source file loading and text extraction.

use crate::types::Document;
use recall_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Pdf,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" | "md" | "markdown" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Pdf => "pdf",
        }
    }
}

/// Load a file into a [`Document`] whose id is the file path.
pub fn load_document(path: &Path) -> AppResult<Document> {
    let content_type = ContentType::from_path(path).ok_or_else(|| {
        AppError::UnsupportedFormat(format!(
            "{:?}: expected a .txt, .text, .md, .markdown or .pdf file",
            path
        ))
    })?;

    let text = match content_type {
        ContentType::PlainText => read_text(path)?,
        ContentType::Pdf => extract_pdf_text(path)?,
    };

    tracing::debug!(
        "Loaded {:?} as {} ({} bytes of text)",
        path,
        content_type.as_str(),
        text.len()
    );

    Ok(Document {
        id: path.to_string_lossy().into_owned(),
        text,
        content_type: content_type.as_str().to_string(),
    })
}

fn read_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::UnsupportedFormat(format!("{:?} is not valid UTF-8: {}", path, e)))
}

/// Extract text page by page, concatenated in page order with no separator.
fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let pdf = lopdf::Document::load(path)
        .map_err(|e| AppError::UnsupportedFormat(format!("Failed to open PDF {:?}: {}", path, e)))?;

    let mut text = String::new();
    // get_pages is keyed by page number, so iteration is in page order.
    for page_number in pdf.get_pages().keys() {
        match pdf.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                return Err(AppError::UnsupportedFormat(format!(
                    "Failed to extract page {} of {:?}: {}",
                    page_number, path, e
                )))
            }
        }
    }

    Ok(text)
}
