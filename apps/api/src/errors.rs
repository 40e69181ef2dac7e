use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::GatewayError;
use crate::optimization::normalizer::NormalizationError;

pub const AI_SERVICE_ERROR_MESSAGE: &str = "An error occurred with the AI service.";
pub const AI_RESPONSE_ERROR_MESSAGE: &str = "Failed to process the response from the AI model.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Upload(e) => ("UPLOAD_ERROR", e.body_text()),
            AppError::Extraction(e) => {
                tracing::error!("Extraction error: {e:?}");
                ("EXTRACTION_ERROR", e.to_string())
            }
            AppError::Gateway(e) => {
                tracing::error!("Gateway error: {e}");
                ("AI_SERVICE_ERROR", AI_SERVICE_ERROR_MESSAGE.to_string())
            }
            AppError::Normalization(e) => {
                tracing::error!("Failed to parse JSON from model response: {e}");
                tracing::error!("Raw model response: {}", e.raw_text());
                ("AI_RESPONSE_ERROR", AI_RESPONSE_ERROR_MESSAGE.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
