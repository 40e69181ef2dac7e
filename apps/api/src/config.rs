use std::str::FromStr;

use anyhow::{bail, Context, Result};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    /// Empty means any origin (`*`).
    pub cors_allowed_origins: Vec<String>,
    pub gateway_max_attempts: u32,
    pub gateway_backoff_base_ms: u64,
    pub gateway_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gateway_max_attempts: u32 = parse_env_or("GATEWAY_MAX_ATTEMPTS", 5)?;
        if gateway_max_attempts == 0 {
            bail!("GATEWAY_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            cors_allowed_origins: parse_origins(
                &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
            gateway_max_attempts,
            gateway_backoff_base_ms: parse_env_or("GATEWAY_BACKOFF_BASE_MS", 1000)?,
            gateway_timeout_secs: parse_env_or("GATEWAY_TIMEOUT_SECS", 120)?,
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env_or("PORT", 5000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list. `*` anywhere in the list means any origin.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.iter().any(|o| o == "*") {
        Vec::new()
    } else {
        origins
    }
}

#[cfg(test)]
impl Config {
    /// Zero-delay configuration for in-process tests.
    pub fn for_tests() -> Self {
        Config {
            gemini_api_key: "test-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_base: "http://127.0.0.1:9".to_string(),
            cors_allowed_origins: Vec::new(),
            gateway_max_attempts: 5,
            gateway_backoff_base_ms: 0,
            gateway_timeout_secs: 5,
            max_upload_bytes: 10 * 1024 * 1024,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }
}
