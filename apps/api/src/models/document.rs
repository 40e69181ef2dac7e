use bytes::Bytes;

/// An uploaded resume file. Lives only for the duration of one request.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Bytes,
}

impl Document {
    /// Builds a document from a client-supplied filename, keeping only the
    /// final path component and dropping control characters.
    pub fn new(raw_filename: &str, bytes: Bytes) -> Self {
        Self {
            filename: sanitize_filename(raw_filename),
            bytes,
        }
    }

    /// Lowercased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.filename.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Plain text pulled out of a `Document`. An empty string is a valid result
/// (e.g. a scanned PDF with no text layer), not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    pub content: String,
}

impl ExtractedText {
    pub fn new(content: String) -> Self {
        Self { content }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
