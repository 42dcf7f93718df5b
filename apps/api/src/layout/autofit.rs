//! Auto-Fit Controller — shrinks the document font until it fits a target page count.
//!
//! # State machine
//! ```text
//! Idle → Measuring → Evaluating ─┬─ pages ≤ target ───────────→ Converged
//!             ↑                  ├─ pages > target, font > 10px → Shrinking ─┐
//!             └──────────────────┼────────────────────────────────────────────┘
//!                                └─ pages > target, font = 10px → Exhausted
//! ```
//! Each shrink step lowers the global font size by 1px and every non-image
//! block's own font size by the same amount, so heading/body size differences
//! are preserved. Steps are strictly sequential: step N+1 needs the page count
//! measured in step N.
//!
//! Stepping by 1px instead of bisecting keeps every intermediate state a valid,
//! presentable document, and typical reports converge in a handful of passes.
//! Worst case is `initial_font_px - 10` measurement passes.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::layout::pipeline::{LayoutPipeline, PaginatedLayout};
use crate::layout::LayoutError;
use crate::models::{Block, BlockType, FormattingModel, Length};

/// Smallest global font size auto-fit will shrink to.
pub const FONT_FLOOR_PX: f32 = 10.0;
const SHRINK_STEP_PX: f32 = 1.0;
/// Block fonts never shrink below this, whatever their starting size.
const MIN_BLOCK_FONT_PX: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AutoFitState {
    Idle,
    Measuring,
    Evaluating { page_count: usize },
    Shrinking,
    Converged,
    Exhausted,
}

/// Informational message for the user once auto-fit stops. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoFitNotice {
    /// Target reached after at least one shrink step.
    Applied { target_pages: usize, message: String },
    /// Floor reached with the document still too long.
    BestEffort { target_pages: usize, message: String },
}

impl AutoFitNotice {
    pub fn applied(target_pages: usize) -> Self {
        AutoFitNotice::Applied {
            target_pages,
            message: format!(
                "✨ Auto-Fit Applied: Your report has been formatted to fit {target_pages} pages."
            ),
        }
    }

    pub fn best_effort(target_pages: usize) -> Self {
        AutoFitNotice::BestEffort {
            target_pages,
            message: format!(
                "Content is too long to fit into {target_pages} pages. We've made it as compact as possible."
            ),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AutoFitNotice::Applied { message, .. } | AutoFitNotice::BestEffort { message, .. } => {
                message
            }
        }
    }
}

/// Everything a finished auto-fit run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AutoFitOutcome {
    pub blocks: Vec<Block>,
    pub formatting: FormattingModel,
    /// Final layout of `blocks` under `formatting`.
    pub layout: PaginatedLayout,
    pub converged: bool,
    pub page_count: usize,
    pub target_pages: usize,
    pub steps: u32,
    pub initial_font_px: f32,
    pub final_font_px: f32,
    pub notice: Option<AutoFitNotice>,
    /// Every state visited, in order.
    pub trace: Vec<AutoFitState>,
}

/// Outcome of evaluating one measured page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Converged,
    Shrink,
    Exhausted,
}

impl From<Decision> for AutoFitState {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Converged => AutoFitState::Converged,
            Decision::Shrink => AutoFitState::Shrinking,
            Decision::Exhausted => AutoFitState::Exhausted,
        }
    }
}

/// Decides what to do with a measured page count.
pub fn evaluate(page_count: usize, target_pages: usize, font_px: f32) -> Decision {
    if page_count <= target_pages {
        Decision::Converged
    } else if font_px > FONT_FLOOR_PX {
        Decision::Shrink
    } else {
        Decision::Exhausted
    }
}

/// Applies one shrink step in place and returns the new global font size.
///
/// The global size drops by 1px, clamped at the floor; blocks drop by the same
/// amount the global size actually moved. Images are left alone.
pub fn shrink_step(blocks: &mut [Block], formatting: &mut FormattingModel) -> f32 {
    let current = formatting.font_size_px();
    let next = (current - SHRINK_STEP_PX).max(FONT_FLOOR_PX);
    let delta = current - next;

    formatting.font_size = Length::px(next);
    for block in blocks.iter_mut().filter(|b| b.kind != BlockType::Image) {
        let size = block.style.font_size.to_px();
        block.style.font_size = Length::px((size - delta).max(MIN_BLOCK_FONT_PX));
    }
    next
}

/// Runs the auto-fit loop to completion.
///
/// The inputs are the caller's snapshot; the returned outcome holds the adjusted
/// copies. An empty document returns immediately with zero pages and no notice.
pub async fn run_auto_fit(
    pipeline: &LayoutPipeline,
    mut blocks: Vec<Block>,
    mut formatting: FormattingModel,
    target_pages: usize,
) -> Result<AutoFitOutcome, LayoutError> {
    let initial_font_px = formatting.font_size_px();
    let mut trace = vec![AutoFitState::Idle];
    let mut steps = 0u32;

    if blocks.is_empty() {
        let layout = pipeline.layout(&blocks, &formatting).await?;
        return Ok(AutoFitOutcome {
            blocks,
            formatting,
            layout,
            converged: true,
            page_count: 0,
            target_pages,
            steps,
            initial_font_px,
            final_font_px: initial_font_px,
            notice: None,
            trace,
        });
    }

    info!(
        target_pages,
        blocks = blocks.len(),
        font_px = initial_font_px,
        "Auto-fit started"
    );

    loop {
        trace.push(AutoFitState::Measuring);
        let layout = pipeline.layout(&blocks, &formatting).await?;
        let page_count = layout.page_count();
        trace.push(AutoFitState::Evaluating { page_count });

        let font_px = formatting.font_size_px();
        let decision = evaluate(page_count, target_pages, font_px);
        trace.push(decision.into());

        match decision {
            Decision::Shrink => {
                let shrunk_to = shrink_step(&mut blocks, &mut formatting);
                steps += 1;
                debug!(
                    step = steps,
                    page_count,
                    from_px = font_px,
                    to_px = shrunk_to,
                    "Auto-fit shrink step"
                );
            }
            Decision::Converged | Decision::Exhausted => {
                let converged = decision == Decision::Converged;
                let final_font_px = font_px;
                let notice = if !converged {
                    warn!(
                        target_pages,
                        page_count,
                        font_px = final_font_px,
                        "Auto-fit reached the font floor without meeting the target"
                    );
                    Some(AutoFitNotice::best_effort(target_pages))
                } else if final_font_px != initial_font_px {
                    Some(AutoFitNotice::applied(target_pages))
                } else {
                    None
                };

                info!(
                    target_pages,
                    page_count,
                    steps,
                    converged,
                    final_font_px,
                    "Auto-fit finished"
                );

                return Ok(AutoFitOutcome {
                    blocks,
                    formatting,
                    layout,
                    converged,
                    page_count,
                    target_pages,
                    steps,
                    initial_font_px,
                    final_font_px,
                    notice,
                    trace,
                });
            }
        }
    }
}
