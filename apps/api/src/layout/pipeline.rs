//! Layout pipeline — one measurement pass followed by one pagination pass.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::layout::measure::{MeasureItem, MeasurementSurface};
use crate::layout::numbering::{display_text, flat_list_indices};
use crate::layout::paginator::{paginate, Page};
use crate::layout::LayoutError;
use crate::models::{Block, FormattingModel};

/// Result of laying out a block list under one formatting model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginatedLayout {
    pub pages: Vec<Page>,
    /// Measured height per block, `None` where measurement was unavailable.
    pub heights: Vec<Option<f32>>,
    pub budget_px: f32,
    pub content_width_px: f32,
}

impl PaginatedLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Clone)]
pub struct LayoutPipeline {
    surface: Arc<dyn MeasurementSurface>,
}

impl LayoutPipeline {
    pub fn new(surface: Arc<dyn MeasurementSurface>) -> Self {
        Self { surface }
    }

    /// Measures every block and paginates the result.
    ///
    /// An empty document short-circuits to zero pages without opening a surface.
    pub async fn layout(
        &self,
        blocks: &[Block],
        formatting: &FormattingModel,
    ) -> Result<PaginatedLayout, LayoutError> {
        let budget_px = formatting.page_content_budget_px();
        let content_width_px = formatting.content_width_px();

        if blocks.is_empty() {
            return Ok(PaginatedLayout {
                pages: Vec::new(),
                heights: Vec::new(),
                budget_px,
                content_width_px,
            });
        }

        let items: Vec<MeasureItem> = blocks
            .iter()
            .zip(flat_list_indices(blocks))
            .map(|(block, list_index)| MeasureItem {
                display_text: display_text(block, list_index),
                block: block.clone(),
            })
            .collect();

        let heights = self
            .surface
            .measure(&items, formatting, content_width_px)
            .await?;

        if heights.len() != blocks.len() {
            return Err(LayoutError::HeightCountMismatch {
                expected: blocks.len(),
                got: heights.len(),
            });
        }

        let unmeasured = heights.iter().filter(|h| h.is_none()).count();
        if unmeasured > 0 {
            warn!(
                unmeasured,
                total = blocks.len(),
                "Some blocks could not be measured; paginating them without height"
            );
        }

        let pages = paginate(blocks, &heights, budget_px);
        debug!(
            blocks = blocks.len(),
            pages = pages.len(),
            budget_px,
            "Layout pass complete"
        );

        Ok(PaginatedLayout {
            pages,
            heights,
            budget_px,
            content_width_px,
        })
    }
}
