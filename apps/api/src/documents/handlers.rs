//! Axum route handlers for the Documents API.
//!
//! Edits answer immediately with the new version and schedule a debounced
//! relayout; reads (`GET`, export, auto-fit) return a layout that is current
//! for the version they report.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::service::{auto_fit, schedule_relayout, with_layout};
use crate::documents::session::{AutoFitReport, BlockEdit, DocumentSession, DocumentView};
use crate::documents::store::SessionHandle;
use crate::errors::AppError;
use crate::export::{build_manifest, ExportManifest};
use crate::generation::ingest::{ingest, InboundBlock};
use crate::models::{Block, FormattingModel, FormattingPatch};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub blocks: Vec<InboundBlock>,
    pub formatting: Option<FormattingModel>,
    /// When set, auto-fit runs right after the document is created.
    pub target_pages: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub document: DocumentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_fit: Option<AutoFitReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEditResponse {
    pub version: u64,
    pub block: Block,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBreakResponse {
    pub version: u64,
    pub page_break_before: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyStyleResponse {
    pub version: u64,
    pub updated: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertImageRequest {
    /// Data-URI of the image.
    pub src: String,
    pub after_block_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertImageResponse {
    pub version: u64,
    pub block_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFitRequest {
    pub target_pages: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Shared flow
// ────────────────────────────────────────────────────────────────────────────

/// Registers a new document and, if asked, auto-fits it before the first view.
pub async fn open_document(
    state: &AppState,
    blocks: Vec<Block>,
    formatting: FormattingModel,
    target_pages: Option<usize>,
) -> Result<DocumentResponse, AppError> {
    let block_count = blocks.len();
    let handle = state
        .sessions
        .insert(DocumentSession::new(blocks, formatting))
        .await;
    info!(document_id = %handle.id, blocks = block_count, "Document created");

    let result = first_view(state, &handle, target_pages).await;
    if result.is_err() {
        // The caller never learns the id of a document that failed to open.
        let _ = state.sessions.remove(handle.id).await;
        warn!(document_id = %handle.id, "Discarded document that failed to open");
    }
    result
}

async fn first_view(
    state: &AppState,
    handle: &SessionHandle,
    target_pages: Option<usize>,
) -> Result<DocumentResponse, AppError> {
    let report = match target_pages {
        Some(target) => Some(auto_fit(handle, &state.pipeline, target).await?),
        None => None,
    };

    let document = with_layout(handle, &state.pipeline, |s, l| s.view(l)).await?;
    Ok(DocumentResponse {
        document,
        auto_fit: report,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/documents
///
/// Creates a document from inbound `{type, text}` content.
pub async fn handle_create_document(
    State(state): State<AppState>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let formatting = request.formatting.unwrap_or_default();
    formatting.validate().map_err(AppError::Validation)?;

    let blocks = ingest(&request.blocks, &formatting)?;
    let response = open_document(&state, blocks, formatting, request.target_pages).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/documents/:id
///
/// Paginated view with per-page display text.
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let document = with_layout(&handle, &state.pipeline, |s, l| s.view(l)).await?;
    Ok(Json(DocumentResponse {
        document,
        auto_fit: None,
    }))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(document_id).await?;
    info!(document_id = %document_id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/documents/:id/formatting
pub async fn handle_update_formatting(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(patch): Json<FormattingPatch>,
) -> Result<Json<VersionResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let version = {
        let mut session = handle.lock().await;
        session.update_formatting(&patch)?;
        session.version
    };

    schedule_relayout(handle, state.pipeline.clone());
    Ok(Json(VersionResponse { version }))
}

/// PATCH /api/v1/documents/:id/blocks/:block_id
///
/// Replaces text and/or patches style of one block.
pub async fn handle_edit_block(
    State(state): State<AppState>,
    Path((document_id, block_id)): Path<(Uuid, String)>,
    Json(edit): Json<BlockEdit>,
) -> Result<Json<BlockEditResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let response = {
        let mut session = handle.lock().await;
        let block = session.edit_block(&block_id, edit)?.clone();
        BlockEditResponse {
            version: session.version,
            block,
        }
    };

    schedule_relayout(handle, state.pipeline.clone());
    Ok(Json(response))
}

/// POST /api/v1/documents/:id/blocks/:block_id/page-break
pub async fn handle_toggle_page_break(
    State(state): State<AppState>,
    Path((document_id, block_id)): Path<(Uuid, String)>,
) -> Result<Json<PageBreakResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let response = {
        let mut session = handle.lock().await;
        let page_break_before = session.toggle_page_break(&block_id)?;
        PageBreakResponse {
            version: session.version,
            page_break_before,
        }
    };

    schedule_relayout(handle, state.pipeline.clone());
    Ok(Json(response))
}

/// POST /api/v1/documents/:id/blocks/:block_id/apply-style
///
/// Copies the block's style to every block of the same type.
pub async fn handle_apply_style(
    State(state): State<AppState>,
    Path((document_id, block_id)): Path<(Uuid, String)>,
) -> Result<Json<ApplyStyleResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let response = {
        let mut session = handle.lock().await;
        let updated = session.apply_style_to_type(&block_id)?;
        ApplyStyleResponse {
            version: session.version,
            updated,
        }
    };

    schedule_relayout(handle, state.pipeline.clone());
    Ok(Json(response))
}

/// POST /api/v1/documents/:id/images
pub async fn handle_insert_image(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<InsertImageRequest>,
) -> Result<(StatusCode, Json<InsertImageResponse>), AppError> {
    let handle = state.sessions.get(document_id).await?;
    let response = {
        let mut session = handle.lock().await;
        let block_id = session.insert_image(&request.src, request.after_block_id.as_deref())?;
        InsertImageResponse {
            version: session.version,
            block_id,
        }
    };

    schedule_relayout(handle, state.pipeline.clone());
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/documents/:id/auto-fit
pub async fn handle_auto_fit(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(request): Json<AutoFitRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let report = auto_fit(&handle, &state.pipeline, request.target_pages).await?;
    let document = with_layout(&handle, &state.pipeline, |s, l| s.view(l)).await?;

    Ok(Json(DocumentResponse {
        document,
        auto_fit: Some(report),
    }))
}

/// POST /api/v1/documents/:id/auto-fit/revert
///
/// Restores blocks and formatting from before the first auto-fit step.
pub async fn handle_revert_auto_fit(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    handle.lock().await.revert_auto_fit()?;
    let document = with_layout(&handle, &state.pipeline, |s, l| s.view(l)).await?;

    Ok(Json(DocumentResponse {
        document,
        auto_fit: None,
    }))
}

/// POST /api/v1/documents/:id/auto-fit/dismiss
pub async fn handle_dismiss_auto_fit(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = state.sessions.get(document_id).await?;
    handle.lock().await.dismiss_auto_fit();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/documents/:id/export
///
/// Export manifest with the exact page boundaries of the current layout.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ExportManifest>, AppError> {
    let handle = state.sessions.get(document_id).await?;
    let manifest = with_layout(&handle, &state.pipeline, |s, l| {
        build_manifest(s.id, s.version, &s.blocks, &s.formatting, l)
    })
    .await?;

    Ok(Json(manifest))
}
