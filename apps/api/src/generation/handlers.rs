//! Axum route handlers for the Generation API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::documents::handlers::{open_document, DocumentResponse};
use crate::errors::AppError;
use crate::generation::generator::generate_report;
use crate::generation::ingest::ingest;
use crate::generation::prompts::DEFAULT_OUTLINE;
use crate::models::FormattingModel;
use crate::state::AppState;

/// Upper bound on requested pages; larger reports exceed a single LLM reply.
const MAX_PAGES: usize = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub topic: String,
    pub pages: usize,
    /// Section outline. Absent → the default report outline; blank → none.
    pub outline: Option<String>,
    pub formatting: Option<FormattingModel>,
}

/// POST /api/v1/documents/generate
///
/// Full pipeline: LLM report → ingest → document session → auto-fit to `pages`.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateReportRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let writer = state.writer.as_ref().ok_or_else(|| {
        AppError::UnprocessableEntity(
            "Report generation is unavailable: ANTHROPIC_API_KEY is not configured".to_string(),
        )
    })?;

    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(AppError::Validation("Please enter a topic for the report.".to_string()));
    }
    if request.pages == 0 || request.pages > MAX_PAGES {
        return Err(AppError::Validation(format!(
            "pages must be between 1 and {MAX_PAGES}"
        )));
    }

    let formatting = request.formatting.unwrap_or_default();
    formatting.validate().map_err(AppError::Validation)?;

    let outline = request.outline.as_deref().unwrap_or(DEFAULT_OUTLINE);
    let inbound = generate_report(writer.as_ref(), topic, outline, request.pages).await?;
    let blocks = ingest(&inbound, &formatting)?;

    let response = open_document(&state, blocks, formatting, Some(request.pages)).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
