//! Response normalization — coerces a model reply into `OptimizationResult`.
//!
//! Replies often arrive wrapped in a code fence with a `json` language tag.
//! Those are stripped, then the text is parsed strictly: all four result keys
//! must be present. Field-level coercion lives on `OptimizationResult`.

use thiserror::Error;

use crate::models::OptimizationResult;

#[derive(Debug, Error)]
pub enum NormalizationError {
    /// `raw` is the untouched model reply, kept for server-side logs only.
    #[error("model reply is not a valid optimization result: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

impl NormalizationError {
    pub fn raw_text(&self) -> &str {
        match self {
            NormalizationError::InvalidJson { raw, .. } => raw,
        }
    }
}

/// Parses a raw model reply into the result contract.
pub fn normalize(raw: &str) -> Result<OptimizationResult, NormalizationError> {
    serde_json::from_str(clean_model_text(raw)).map_err(|source| {
        NormalizationError::InvalidJson {
            source,
            raw: raw.to_string(),
        }
    })
}

/// Strips surrounding whitespace, code-fence backticks, and a leading `json`
/// language tag.
pub fn clean_model_text(raw: &str) -> &str {
    let text = raw.trim().trim_matches('`').trim();
    strip_language_tag(text).trim()
}

fn strip_language_tag(text: &str) -> &str {
    match text.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &text[4..],
        _ => text,
    }
}
