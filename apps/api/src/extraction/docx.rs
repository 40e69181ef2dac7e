use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::{DocumentFormat, ExtractionError};

/// Main body part inside an OOXML word-processing package.
const DOCUMENT_PART: &str = "word/document.xml";

/// Upper bound on the inflated size of the body part.
const MAX_DOCUMENT_PART_BYTES: u64 = 32 * 1024 * 1024;

/// Extracts paragraph text in document order, each paragraph followed by a
/// line break. The archive is read straight from memory.
pub fn extract_docx_text(docx_bytes: &[u8]) -> Result<String, ExtractionError> {
    extract_with_limit(docx_bytes, MAX_DOCUMENT_PART_BYTES)
}

fn extract_with_limit(docx_bytes: &[u8], limit: u64) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(docx_bytes))
        .map_err(|e| ExtractionError::failed(DocumentFormat::Docx, e))?;

    let part = archive.by_name(DOCUMENT_PART).map_err(|e| {
        ExtractionError::failed(DocumentFormat::Docx, format!("{DOCUMENT_PART}: {e}"))
    })?;

    // Declared size is untrusted; the read is bounded as well.
    if part.size() > limit {
        return Err(part_too_large(limit));
    }
    let mut raw = Vec::new();
    part.take(limit + 1)
        .read_to_end(&mut raw)
        .map_err(|e| ExtractionError::failed(DocumentFormat::Docx, e))?;
    if raw.len() as u64 > limit {
        return Err(part_too_large(limit));
    }

    let xml = String::from_utf8(raw).map_err(|e| {
        ExtractionError::failed(DocumentFormat::Docx, format!("{DOCUMENT_PART}: {e}"))
    })?;
    paragraphs_to_text(&xml)
}

fn part_too_large(limit: u64) -> ExtractionError {
    ExtractionError::failed(
        DocumentFormat::Docx,
        format!("{DOCUMENT_PART} exceeds {limit} bytes uncompressed"),
    )
}

/// Walks `w:p` elements. Text comes from `w:t` runs; `w:tab` maps to a tab and
/// `w:br`/`w:cr` to a newline. Tab stops declared in `w:pPr` are not content.
///
/// Text boxes are stored twice under `mc:AlternateContent`; only the
/// `mc:Choice` copy is read. A paragraph nested in a text box ends its own
/// line, and the enclosing paragraph adds no second break after it.
fn paragraphs_to_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;
    let mut in_paragraph_props = false;
    let mut fallback_depth = 0usize;
    let mut paragraph_depth = 0usize;
    let mut after_nested_paragraph = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            ExtractionError::failed(
                DocumentFormat::Docx,
                format!("malformed {DOCUMENT_PART} at byte {}: {e}", reader.buffer_position()),
            )
        })?;

        match &event {
            Event::Start(e) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth += 1;
                continue;
            }
            Event::End(e) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ if fallback_depth > 0 => continue,
            _ => {}
        }

        match event {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = true,
                b"pPr" => in_paragraph_props = true,
                b"p" => paragraph_depth += 1,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"pPr" => in_paragraph_props = false,
                b"p" => {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    if paragraph_depth > 0 {
                        text.push('\n');
                        after_nested_paragraph = true;
                    } else {
                        if !after_nested_paragraph {
                            text.push('\n');
                        }
                        after_nested_paragraph = false;
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if !in_paragraph_props => {
                    text.push('\t');
                    after_nested_paragraph = false;
                }
                b"br" | b"cr" => {
                    text.push('\n');
                    after_nested_paragraph = false;
                }
                b"p" => {
                    text.push('\n');
                    after_nested_paragraph = paragraph_depth > 0;
                }
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| ExtractionError::failed(DocumentFormat::Docx, e))?;
                if !unescaped.is_empty() {
                    text.push_str(&unescaped);
                    after_nested_paragraph = false;
                }
            }
            _ => {}
        }
    }

    Ok(text)
}
