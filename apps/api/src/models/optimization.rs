use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// The pair of inputs sent to the generation service.
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub resume_text: String,
    pub job_description: String,
}

impl OptimizationRequest {
    /// The job description must be non-empty before any external call is made.
    pub fn new(resume_text: String, job_description: String) -> Result<Self, AppError> {
        if job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "Job description is required".to_string(),
            ));
        }
        Ok(Self {
            resume_text,
            job_description,
        })
    }
}

/// The contract returned to the caller. All four keys are required; the
/// field deserializers coerce the loose shapes models tend to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimized_resume: String,
    /// 0 – 100
    #[serde(deserialize_with = "deserialize_score")]
    pub ats_score: u8,
    #[serde(deserialize_with = "deserialize_string_list")]
    pub modifications: Vec<String>,
    #[serde(deserialize_with = "deserialize_string_list")]
    pub upskilling_suggestions: Vec<String>,
}

/// Accepts `85`, `85.4`, or `"85"` / `"85/100"`; rounds and clamps into 0..=100.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .split('/')
            .next()
            .map(|s| s.trim().trim_end_matches('%'))
            .and_then(|s| s.parse::<f64>().ok()),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .ok_or_else(|| de::Error::custom(format!("ats_score is not numeric: {value}")))?;

    Ok(score.round().clamp(0.0, 100.0) as u8)
}

/// Accepts a JSON array of strings or a single newline-separated string.
/// Bullet markers and blank lines are dropped.
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(_) | Value::Bool(_) => Ok(item.to_string()),
                other => Err(de::Error::custom(format!(
                    "expected a list of strings, found element {other}"
                ))),
            })
            .collect(),
        Value::String(s) => Ok(s
            .lines()
            .map(strip_list_marker)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()),
        other => Err(de::Error::custom(format!(
            "expected a list of strings, found {other}"
        ))),
    }
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }
    line
}
