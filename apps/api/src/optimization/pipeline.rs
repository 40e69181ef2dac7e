//! Resume optimization — orchestrates one request end to end.
//!
//! Flow: Received → Extracting → Prompting → Generating → Normalizing → Completed.
//! Linear; the only loop is the gateway's internal retry. Any failure ends the
//! request at the stage where it happened, and no external call is made before
//! the inputs are validated and the resume text is extracted.

use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::extraction::extract_text;
use crate::llm_client::ModelGateway;
use crate::models::{Document, OptimizationRequest, OptimizationResult};
use crate::optimization::normalizer::normalize;
use crate::optimization::prompts::build_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Extracting,
    Prompting,
    Generating,
    Normalizing,
    Completed,
}

/// Runs the optimization pipeline for one uploaded resume.
pub async fn optimize_resume(
    gateway: &ModelGateway,
    document: Document,
    job_description: String,
) -> Result<OptimizationResult, AppError> {
    let mut stage = PipelineStage::Received;
    let result = run_stages(gateway, document, job_description, &mut stage).await;

    if let Err(e) = &result {
        warn!("Optimization failed during {stage:?}: {e}");
    }
    result
}

async fn run_stages(
    gateway: &ModelGateway,
    document: Document,
    job_description: String,
    stage: &mut PipelineStage,
) -> Result<OptimizationResult, AppError> {
    validate_received(&document, &job_description)?;

    advance(stage, PipelineStage::Extracting);
    let extracted = extract_text(&document).await?;
    if extracted.is_blank() {
        warn!(
            "No extractable text in {}; continuing with an empty resume",
            document.filename
        );
    }
    drop(document);

    let request = OptimizationRequest::new(extracted.content, job_description)?;

    advance(stage, PipelineStage::Prompting);
    let prompt = build_prompt(&request.resume_text, &request.job_description);

    advance(stage, PipelineStage::Generating);
    let raw = gateway.generate(&prompt).await?;

    advance(stage, PipelineStage::Normalizing);
    let result = normalize(&raw)?;

    advance(stage, PipelineStage::Completed);
    info!(
        "Optimization completed: ats_score={}, {} modifications, {} suggestions",
        result.ats_score,
        result.modifications.len(),
        result.upskilling_suggestions.len()
    );
    Ok(result)
}

/// Client errors: checked before anything else runs.
fn validate_received(document: &Document, job_description: &str) -> Result<(), AppError> {
    if document.filename.is_empty() {
        return Err(AppError::Validation("No selected resume file".to_string()));
    }
    if document.bytes.is_empty() {
        return Err(AppError::Validation(
            "Uploaded resume file is empty".to_string(),
        ));
    }
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description is required".to_string(),
        ));
    }
    Ok(())
}

fn advance(stage: &mut PipelineStage, next: PipelineStage) {
    debug!("Pipeline stage {:?} -> {:?}", stage, next);
    *stage = next;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::extraction::docx::tests::make_test_docx;
    use crate::extraction::pdf::tests::make_test_pdf;
    use crate::extraction::ExtractionError;
    use crate::llm_client::testing::{ScriptedGenerator, Step};
    use crate::llm_client::{GatewayError, RetryPolicy};

    const JOB: &str = "Looking for a senior engineer with Rust and distributed systems experience.";

    const REPLY: &str = r###"```json
{
  "optimized_resume": "## Summary\nExperienced engineer with **Rust** expertise.",
  "ats_score": 84,
  "modifications": ["Added Rust keywords", "Rephrased summary"],
  "upskilling_suggestions": ["Distributed systems course", "Kubernetes certification", "Kafka"]
}
```"###;

    fn gateway(generator: &Arc<ScriptedGenerator>) -> ModelGateway {
        ModelGateway::new(generator.clone(), RetryPolicy::immediate(5))
    }

    fn pdf_document(text: &str) -> Document {
        Document::new("resume.pdf", Bytes::from(make_test_pdf(&[text])))
    }

    #[tokio::test]
    async fn test_pdf_end_to_end() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let result = optimize_resume(
            &gateway(&generator),
            pdf_document("Experienced engineer"),
            JOB.to_string(),
        )
        .await
        .unwrap();

        assert!(result.optimized_resume.starts_with("## Summary\n"));
        assert!(result.ats_score <= 100);
        assert_eq!(result.ats_score, 84);
        assert_eq!(result.modifications.len(), 2);
        assert_eq!(result.upskilling_suggestions.len(), 3);

        let value = serde_json::to_value(&result).unwrap();
        let mut keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "ats_score",
                "modifications",
                "optimized_resume",
                "upskilling_suggestions"
            ]
        );

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Experienced"));
        assert!(prompts[0].contains(JOB));
    }

    #[tokio::test]
    async fn test_docx_end_to_end() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let document = Document::new(
            "resume.docx",
            Bytes::from(make_test_docx(&["Jane Doe", "Backend developer"])),
        );
        optimize_resume(&gateway(&generator), document, JOB.to_string())
            .await
            .unwrap();
        assert!(generator.prompts()[0].contains("Jane Doe\nBackend developer\n"));
    }

    #[tokio::test]
    async fn test_unsupported_format_never_calls_gateway() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let document = Document::new("resume.txt", Bytes::from_static(b"Experienced engineer"));
        let err = optimize_resume(&gateway(&generator), document, JOB.to_string())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::UnsupportedFormat)
        ));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_never_calls_gateway() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let document = Document::new("resume.pdf", Bytes::from_static(b"corrupted bytes"));
        let err = optimize_resume(&gateway(&generator), document, JOB.to_string())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Extraction(ExtractionError::ExtractionFailed { .. })
        ));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_job_description_is_client_error() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let err = optimize_resume(
            &gateway(&generator),
            pdf_document("Experienced engineer"),
            " \n ".to_string(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_filename_and_empty_file_are_client_errors() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let unnamed = Document::new("", Bytes::from_static(b"%PDF"));
        let empty = Document::new("resume.pdf", Bytes::new());

        for document in [unnamed, empty] {
            let err = optimize_resume(&gateway(&generator), document, JOB.to_string())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_pdf_still_reaches_gateway() {
        let generator = Arc::new(ScriptedGenerator::replying(REPLY));
        let document = Document::new("scan.pdf", Bytes::from(make_test_pdf(&[""])));
        optimize_resume(&gateway(&generator), document, JOB.to_string())
            .await
            .unwrap();
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_gateway_is_reported() {
        let generator = Arc::new(ScriptedGenerator::new(vec![Step::Transient; 5]));
        let err = optimize_resume(
            &gateway(&generator),
            pdf_document("Experienced engineer"),
            JOB.to_string(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AppError::Gateway(GatewayError::RetriesExhausted { .. })
        ));
        assert_eq!(generator.calls(), 5);
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_normalization_error() {
        let generator = Arc::new(ScriptedGenerator::replying("I cannot help with that."));
        let err = optimize_resume(
            &gateway(&generator),
            pdf_document("Experienced engineer"),
            JOB.to_string(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Normalization(_)));
    }
}
