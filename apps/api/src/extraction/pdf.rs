use super::{DocumentFormat, ExtractionError};

/// Extracts the text layer of every page, concatenated in document order.
/// Pages without a text layer contribute an empty string.
pub fn extract_pdf_text(pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| ExtractionError::failed(DocumentFormat::Pdf, e))?;

    Ok(pages.concat())
}
