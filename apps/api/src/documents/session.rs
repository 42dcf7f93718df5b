//! Document session — the single owner of a document's blocks and formatting.
//!
//! Every mutation goes through a method here and bumps `version`. Layout results
//! are cached against the version they were computed for, so a pass that was
//! started before an edit can never be applied after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::ingest::style_for;
use crate::layout::autofit::AutoFitState;
use crate::layout::numbering::{display_text, page_list_indices};
use crate::layout::{AutoFitNotice, AutoFitOutcome, PaginatedLayout};
use crate::models::block::strip_list_marker;
use crate::models::formatting::{check_font_size, theme_default_color};
use crate::models::{Block, BlockStylePatch, BlockType, FormattingModel, FormattingPatch};

// ────────────────────────────────────────────────────────────────────────────
// Edits and views
// ────────────────────────────────────────────────────────────────────────────

/// Text and/or style change for one block. The type of a block never changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockEdit {
    pub text: Option<String>,
    pub style: Option<BlockStylePatch>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    #[serde(flatten)]
    pub block: Block,
    /// Text as displayed, list marker included (numbering restarts on every page).
    pub display_text: String,
    pub height_px: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub number: usize,
    pub height_px: f32,
    pub oversized: bool,
    pub blocks: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub version: u64,
    pub formatting: FormattingModel,
    pub page_count: usize,
    pub page_budget_px: f32,
    pub content_width_px: f32,
    pub pages: Vec<PageView>,
    pub notice: Option<AutoFitNotice>,
    pub can_revert: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of one auto-fit run, returned alongside the updated document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFitReport {
    pub converged: bool,
    pub page_count: usize,
    pub target_pages: usize,
    pub steps: u32,
    pub initial_font_px: f32,
    pub final_font_px: f32,
    pub notice: Option<AutoFitNotice>,
    pub trace: Vec<AutoFitState>,
}

/// Snapshot an auto-fit run works on, tagged with the version it was taken at.
#[derive(Debug, Clone)]
pub struct AutoFitTicket {
    pub version: u64,
    pub blocks: Vec<Block>,
    pub formatting: FormattingModel,
}

/// Revert point captured before the first shrink step.
#[derive(Debug, Clone)]
struct AutoFitSession {
    blocks: Vec<Block>,
    formatting: FormattingModel,
}

#[derive(Debug, Clone)]
struct CachedLayout {
    version: u64,
    layout: PaginatedLayout,
}

// ────────────────────────────────────────────────────────────────────────────
// DocumentSession
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct DocumentSession {
    pub id: Uuid,
    pub blocks: Vec<Block>,
    pub formatting: FormattingModel,
    pub version: u64,
    pub notice: Option<AutoFitNotice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    layout: Option<CachedLayout>,
    auto_fit: Option<AutoFitSession>,
}

impl DocumentSession {
    pub fn new(blocks: Vec<Block>, formatting: FormattingModel) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            blocks,
            formatting,
            version: 1,
            notice: None,
            created_at: now,
            updated_at: now,
            layout: None,
            auto_fit: None,
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    fn block_index(&self, block_id: &str) -> Result<usize, AppError> {
        self.blocks
            .iter()
            .position(|b| b.id == block_id)
            .ok_or_else(|| AppError::NotFound(format!("Block {block_id} not found")))
    }

    pub fn can_revert(&self) -> bool {
        self.auto_fit.is_some()
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    /// Replaces text and/or patches style of one block.
    ///
    /// Edited text may come back with its display marker; it is stripped.
    /// A style change clears any pending auto-fit notice.
    pub fn edit_block(&mut self, block_id: &str, edit: BlockEdit) -> Result<&Block, AppError> {
        if edit.text.is_none() && edit.style.is_none() {
            return Err(AppError::Validation(
                "edit must contain text or style".to_string(),
            ));
        }
        if let Some(family) = edit.style.as_ref().and_then(|s| s.font_family.as_deref()) {
            if family.trim().is_empty() {
                return Err(AppError::Validation("fontFamily cannot be empty".to_string()));
            }
        }
        if let Some(size) = edit.style.as_ref().and_then(|s| s.font_size.as_ref()) {
            check_font_size(size).map_err(AppError::Validation)?;
        }

        let index = self.block_index(block_id)?;
        let block = &mut self.blocks[index];
        if let Some(text) = &edit.text {
            block.text = strip_list_marker(text).to_string();
        }
        if let Some(style) = &edit.style {
            block.style.apply(style);
            self.notice = None;
        }

        self.touch();
        Ok(&self.blocks[index])
    }

    /// Flips `page_break_before` on one block and returns the new value.
    pub fn toggle_page_break(&mut self, block_id: &str) -> Result<bool, AppError> {
        let index = self.block_index(block_id)?;
        let block = &mut self.blocks[index];
        block.page_break_before = !block.page_break_before;
        let value = block.page_break_before;
        self.touch();
        Ok(value)
    }

    /// Copies one block's style onto every block of the same type.
    /// Returns how many blocks were restyled, the source included.
    pub fn apply_style_to_type(&mut self, block_id: &str) -> Result<usize, AppError> {
        let index = self.block_index(block_id)?;
        let kind = self.blocks[index].kind;
        let style = self.blocks[index].style.clone();

        let mut count = 0;
        for block in self.blocks.iter_mut().filter(|b| b.kind == kind) {
            block.style = style.clone();
            count += 1;
        }

        self.notice = None;
        self.touch();
        Ok(count)
    }

    /// Applies a global formatting change.
    ///
    /// A theme change recolours blocks still using the old theme colour; a font
    /// family or size change is pushed down to paragraph and list blocks.
    /// Clears the auto-fit notice and drops the revert point.
    pub fn update_formatting(&mut self, patch: &FormattingPatch) -> Result<(), AppError> {
        let old = self.formatting.clone();
        let mut next = old.clone();

        if let Some(family) = &patch.font_family {
            next.font_family = family.clone();
        }
        if let Some(size) = patch.font_size {
            next.font_size = size;
        }
        if let Some(spacing) = patch.line_spacing {
            next.line_spacing = spacing;
        }
        if let Some(align) = patch.text_align {
            next.text_align = align;
        }
        if let Some(margin) = patch.parsed_margin()? {
            next.margin = margin;
        }
        if let Some(theme) = &patch.theme {
            next.theme = theme.clone();
        }
        if let Some(header) = &patch.header {
            next.header = header.clone();
        }
        if let Some(footer) = &patch.footer {
            next.footer = footer.clone();
        }
        if let Some(show) = patch.show_page_numbers {
            next.show_page_numbers = show;
        }
        if let Some(show) = patch.show_borders {
            next.show_borders = show;
        }

        next.validate().map_err(AppError::Validation)?;

        let old_color = theme_default_color(&old.theme);
        let new_color = theme_default_color(&next.theme);
        if !old_color.eq_ignore_ascii_case(new_color) {
            let mut recoloured = 0;
            for block in self
                .blocks
                .iter_mut()
                .filter(|b| b.style.color.eq_ignore_ascii_case(old_color))
            {
                block.style.color = new_color.to_string();
                recoloured += 1;
            }
            debug!(recoloured, from = old_color, to = new_color, "Theme colour change");
        }

        let family_changed = patch.font_family.is_some();
        let size_changed = patch.font_size.is_some();
        if family_changed || size_changed {
            for block in self.blocks.iter_mut().filter(|b| b.kind.is_body_text()) {
                if family_changed {
                    block.style.font_family = next.font_family.clone();
                }
                if size_changed {
                    block.style.font_size = next.font_size;
                }
            }
        }

        self.formatting = next;
        self.notice = None;
        self.auto_fit = None;
        self.touch();
        Ok(())
    }

    /// Inserts an image block after `after` (or at the end) and returns its id.
    pub fn insert_image(&mut self, src: &str, after: Option<&str>) -> Result<String, AppError> {
        if src.trim().is_empty() {
            return Err(AppError::Validation("image source cannot be empty".to_string()));
        }

        let position = match after {
            Some(id) => self.block_index(id)? + 1,
            None => self.blocks.len(),
        };

        let block = Block::new(
            BlockType::Image,
            src.trim(),
            style_for(BlockType::Image, &self.formatting),
        );
        let id = block.id.clone();
        self.blocks.insert(position, block);
        self.touch();
        Ok(id)
    }

    // ── Layout cache ────────────────────────────────────────────────────────

    /// Cached layout, if it was computed for the current version.
    pub fn current_layout(&self) -> Option<&PaginatedLayout> {
        self.layout
            .as_ref()
            .filter(|cached| cached.version == self.version)
            .map(|cached| &cached.layout)
    }

    /// Stores `layout` if it was computed for the current version.
    /// Returns false (and drops the result) when the document moved on.
    pub fn store_layout(&mut self, version: u64, layout: PaginatedLayout) -> bool {
        if version != self.version {
            warn!(
                document_id = %self.id,
                computed_for = version,
                current = self.version,
                "Discarding stale layout result"
            );
            return false;
        }
        self.layout = Some(CachedLayout { version, layout });
        true
    }

    // ── Auto-fit ────────────────────────────────────────────────────────────

    pub fn begin_auto_fit(&self) -> AutoFitTicket {
        AutoFitTicket {
            version: self.version,
            blocks: self.blocks.clone(),
            formatting: self.formatting.clone(),
        }
    }

    /// Applies a finished auto-fit run computed from `ticket`.
    ///
    /// Rejected with a conflict if the document changed while the run was in
    /// flight. The revert point is captured on the first run that changes
    /// anything or leaves a notice, and kept across later runs.
    pub fn finish_auto_fit(
        &mut self,
        ticket: AutoFitTicket,
        outcome: AutoFitOutcome,
    ) -> Result<AutoFitReport, AppError> {
        if ticket.version != self.version {
            warn!(
                document_id = %self.id,
                started_at = ticket.version,
                current = self.version,
                "Discarding auto-fit result for a document that changed"
            );
            return Err(AppError::Conflict(
                "document changed while auto-fit was running; result discarded".to_string(),
            ));
        }

        // Any run that leaves a notice gets a revert point behind it, even a
        // best-effort one that could not shrink at all.
        if self.auto_fit.is_none() && (outcome.steps > 0 || outcome.notice.is_some()) {
            self.auto_fit = Some(AutoFitSession {
                blocks: ticket.blocks,
                formatting: ticket.formatting,
            });
        }
        if outcome.steps > 0 {
            self.blocks = outcome.blocks;
            self.formatting = outcome.formatting;
            self.touch();
        }

        self.notice = outcome.notice.clone();
        self.layout = Some(CachedLayout {
            version: self.version,
            layout: outcome.layout,
        });

        Ok(AutoFitReport {
            converged: outcome.converged,
            page_count: outcome.page_count,
            target_pages: outcome.target_pages,
            steps: outcome.steps,
            initial_font_px: outcome.initial_font_px,
            final_font_px: outcome.final_font_px,
            notice: outcome.notice,
            trace: outcome.trace,
        })
    }

    /// Restores the pre-auto-fit snapshot and drops the revert point.
    pub fn revert_auto_fit(&mut self) -> Result<(), AppError> {
        let snapshot = self
            .auto_fit
            .take()
            .ok_or_else(|| AppError::NotFound("no auto-fit to revert".to_string()))?;

        self.blocks = snapshot.blocks;
        self.formatting = snapshot.formatting;
        self.notice = None;
        self.touch();
        info!(document_id = %self.id, "Auto-fit reverted");
        Ok(())
    }

    /// Clears the notice and drops the revert point.
    pub fn dismiss_auto_fit(&mut self) {
        self.notice = None;
        self.auto_fit = None;
    }

    // ── Views ───────────────────────────────────────────────────────────────

    /// Per-page presentation of `layout`, which must be current for this session.
    pub fn view(&self, layout: &PaginatedLayout) -> DocumentView {
        let pages = layout
            .pages
            .iter()
            .enumerate()
            .map(|(page_index, page)| {
                let slice = page.slice(&self.blocks);
                let blocks = slice
                    .iter()
                    .zip(page_list_indices(slice))
                    .zip(page.blocks.clone())
                    .map(|((block, list_index), index)| BlockView {
                        display_text: display_text(block, list_index),
                        height_px: layout.heights.get(index).copied().flatten(),
                        block: block.clone(),
                    })
                    .collect();
                PageView {
                    number: page_index + 1,
                    height_px: page.height_px,
                    oversized: page.oversized,
                    blocks,
                }
            })
            .collect();

        DocumentView {
            id: self.id,
            version: self.version,
            formatting: self.formatting.clone(),
            page_count: layout.page_count(),
            page_budget_px: layout.budget_px,
            content_width_px: layout.content_width_px,
            pages,
            notice: self.notice.clone(),
            can_revert: self.can_revert(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
