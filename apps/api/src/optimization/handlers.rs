//! Axum route handler for the Optimization API.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use bytes::Bytes;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Document, OptimizationResult};
use crate::optimization::pipeline::optimize_resume;
use crate::state::AppState;

pub const RESUME_FIELD: &str = "resume";
pub const JOB_DESCRIPTION_FIELD: &str = "job_description";

/// Parts pulled out of the multipart body. Unknown fields are ignored.
#[derive(Debug, Default)]
struct OptimizeForm {
    resume: Option<(String, Bytes)>,
    job_description: Option<String>,
}

/// POST /api/optimize
///
/// Multipart body with `resume` (file) and `job_description` (text).
/// Returns the optimized resume, ATS score, change summary and skill gaps.
pub async fn handle_optimize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OptimizationResult>, AppError> {
    let multipart = multipart.map_err(|e| {
        AppError::Validation(format!("Expected a multipart form upload: {}", e.body_text()))
    })?;
    let form = read_form(multipart).await?;

    let (filename, bytes) = form
        .resume
        .ok_or_else(|| AppError::Validation("No resume file part".to_string()))?;
    let document = Document::new(&filename, bytes);
    let job_description = form.job_description.unwrap_or_default();

    let span = info_span!(
        "optimize",
        request_id = %Uuid::new_v4(),
        filename = %document.filename,
    );

    async move {
        info!(
            "Optimizing {} ({} bytes) against a {}-char job description",
            document.filename,
            document.bytes.len(),
            job_description.len()
        );
        optimize_resume(&state.gateway, document, job_description).await
    }
    .instrument(span)
    .await
    .map(Json)
}

async fn read_form(mut multipart: Multipart) -> Result<OptimizeForm, AppError> {
    let mut form = OptimizeForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(RESUME_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.resume = Some((filename, bytes));
            }
            Some(JOB_DESCRIPTION_FIELD) => {
                form.job_description = Some(field.text().await?);
            }
            _ => {}
        }
    }

    Ok(form)
}
