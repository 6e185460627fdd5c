//! Axum route handler for the resume match endpoint.

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::extract_text;
use crate::matching::models::MatchResult;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const JOB_DESC_FIELD: &str = "jobDesc";

/// The two inputs of a match request, as read off the multipart form.
#[derive(Debug, Default)]
struct MatchForm {
    resume: Option<Bytes>,
    job_desc: Option<String>,
}

/// POST /api/resumeMatch
///
/// Multipart form: `resume` (PDF file) and `jobDesc` (text).
/// Both are required; a missing input is rejected before any extraction or
/// LLM work happens.
pub async fn handle_resume_match(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let request_id = Uuid::new_v4();

    async move {
        let form = read_form(&mut multipart).await?;

        let resume = form
            .resume
            .ok_or_else(|| AppError::Validation("No resume uploaded".to_string()))?;
        let job_desc = form
            .job_desc
            .filter(|jd| !jd.trim().is_empty())
            .ok_or_else(|| AppError::Validation("No job description provided".to_string()))?;

        info!("Evaluating resume ({} bytes) against job description", resume.len());

        // PDF parsing is CPU-bound; keep it off the async workers.
        let resume_text = tokio::task::spawn_blocking(move || extract_text(&resume))
            .await
            .context("PDF extraction task failed")??;
        debug!("Extracted {} chars of resume text", resume_text.len());

        let result = state.evaluator.evaluate(&resume_text, &job_desc).await?;
        Ok::<_, AppError>(Json(result))
    }
    .instrument(info_span!("resume_match", %request_id))
    .await
}

/// Reads the known fields and skips the rest. A `resume` part only counts
/// when it is a file upload.
async fn read_form(multipart: &mut Multipart) -> Result<MatchForm, AppError> {
    let mut form = MatchForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(RESUME_FIELD) => {
                if field.file_name().is_some() {
                    form.resume = Some(field.bytes().await?);
                } else {
                    debug!("Ignoring non-file resume field");
                }
            }
            Some(JOB_DESC_FIELD) => {
                form.job_desc = Some(field.text().await?);
            }
            _ => {}
        }
    }

    Ok(form)
}
