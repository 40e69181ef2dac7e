//! Text extraction — turns an uploaded resume (PDF or DOCX) into plain text.
//!
//! Format is chosen by filename extension. Both parsers work on in-memory
//! buffers, so nothing touches the filesystem and concurrent requests never
//! share a path.

pub mod docx;
pub mod pdf;

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Document, ExtractedText};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Case-insensitive lookup by extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file format. Please upload a PDF or DOCX.")]
    UnsupportedFormat,

    #[error("Error parsing {format}: {cause}")]
    ExtractionFailed {
        format: DocumentFormat,
        cause: String,
    },
}

impl ExtractionError {
    pub(crate) fn failed(format: DocumentFormat, cause: impl fmt::Display) -> Self {
        Self::ExtractionFailed {
            format,
            cause: cause.to_string(),
        }
    }
}

/// Extracts text from `document`, dispatching on its extension.
///
/// Parsing runs on the blocking pool; a panic inside a parser is reported as
/// `ExtractionFailed` rather than tearing down the request task.
pub async fn extract_text(document: &Document) -> Result<ExtractedText, ExtractionError> {
    let format = detect_format(document)?;
    let bytes = document.bytes.clone();

    let content = tokio::task::spawn_blocking(move || extract_with(format, &bytes))
        .await
        .map_err(|e| ExtractionError::failed(format, format!("parser aborted: {e}")))??;

    debug!(
        "Extracted {} chars from {} ({})",
        content.len(),
        document.filename,
        format
    );
    Ok(ExtractedText::new(content))
}

pub fn detect_format(document: &Document) -> Result<DocumentFormat, ExtractionError> {
    document
        .extension()
        .as_deref()
        .and_then(DocumentFormat::from_extension)
        .ok_or_else(|| {
            warn!("Rejecting {}: not a PDF or DOCX", document.filename);
            ExtractionError::UnsupportedFormat
        })
}

fn extract_with(format: DocumentFormat, bytes: &[u8]) -> Result<String, ExtractionError> {
    match format {
        DocumentFormat::Pdf => pdf::extract_pdf_text(bytes),
        DocumentFormat::Docx => docx::extract_docx_text(bytes),
    }
}
