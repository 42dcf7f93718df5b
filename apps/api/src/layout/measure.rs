//! Measurement Surface — the height oracle pagination depends on.
//!
//! # Contract
//! Given every block of a document (with its display text already resolved),
//! the formatting model and the content width, report the pixel height each
//! block occupies when rendered, or `None` where no height could be produced.
//! Implementations must not mutate their inputs.
//!
//! One call is one measurement pass: the surface opens an off-screen context,
//! lets layout settle, reads metrics, and discards the context. The call is async
//! because real layout engines only resolve metrics after a layout cycle.
//!
//! `MetricsSurface` is the built-in implementation: static glyph tables for text
//! and the image header for pictures. Layout runs on a blocking worker
//! (`tokio::task::spawn_blocking`) so a large document never stalls the executor.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use data_url::DataUrl;
use tracing::{debug, warn};

use crate::layout::font_metrics::{get_metrics, FontClass};
use crate::layout::LayoutError;
use crate::models::{Block, BlockType, FormattingModel};

/// A block plus the text the renderer will actually draw for it (list marker included).
#[derive(Debug, Clone)]
pub struct MeasureItem {
    pub block: Block,
    pub display_text: String,
}

#[async_trait]
pub trait MeasurementSurface: Send + Sync {
    async fn measure(
        &self,
        items: &[MeasureItem],
        formatting: &FormattingModel,
        width_px: f32,
    ) -> Result<Vec<Option<f32>>, LayoutError>;
}

/// Vertical spacing around a block as (before, after) multiples of its font size.
///
/// Shared with the export manifest so exported documents space blocks the same way.
pub fn block_spacing_em(kind: BlockType) -> (f32, f32) {
    match kind {
        BlockType::Heading1 => (1.5, 0.4),
        BlockType::Heading2 => (1.2, 0.4),
        BlockType::Heading3 => (1.0, 0.4),
        BlockType::Paragraph => (0.0, 0.5),
        BlockType::Bullet | BlockType::Numbered => (0.0, 0.2),
        BlockType::Image => (0.0, 0.0),
    }
}

/// Intrinsic pixel size of an image given as a data-URI. `None` for anything else.
pub fn image_dimensions(src: &str) -> Option<(u32, u32)> {
    let url = DataUrl::process(src).ok()?;
    let (bytes, _) = url.decode_to_vec().ok()?;
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Off-screen context
// ────────────────────────────────────────────────────────────────────────────

/// Handle on one off-screen layout context. Released when dropped, which covers
/// early returns, worker failures, and a cancelled measurement future alike.
struct OffscreenSurface {
    live: Arc<AtomicUsize>,
    width_px: f32,
}

impl OffscreenSurface {
    fn open(live: Arc<AtomicUsize>, width_px: f32) -> Self {
        let open_now = live.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(width_px, open_now, "Opened off-screen measurement surface");
        Self { live, width_px }
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(width_px = self.width_px, "Discarded off-screen measurement surface");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MetricsSurface
// ────────────────────────────────────────────────────────────────────────────

pub struct MetricsSurface {
    settle: Duration,
    live: Arc<AtomicUsize>,
}

impl MetricsSurface {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of off-screen contexts currently open.
    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeasurementSurface for MetricsSurface {
    async fn measure(
        &self,
        items: &[MeasureItem],
        formatting: &FormattingModel,
        width_px: f32,
    ) -> Result<Vec<Option<f32>>, LayoutError> {
        if !(width_px.is_finite() && width_px > 0.0) {
            return Err(LayoutError::SurfaceUnavailable(format!(
                "cannot open a surface {width_px}px wide"
            )));
        }
        let _surface = OffscreenSurface::open(self.live.clone(), width_px);

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let items = items.to_vec();
        let formatting = formatting.clone();
        let heights = tokio::task::spawn_blocking(move || {
            items
                .iter()
                .map(|item| measure_item(item, &formatting, width_px))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| LayoutError::Worker(e.to_string()))?;

        Ok(heights)
    }
}

/// Height of one block in whole pixels.
pub(crate) fn measure_item(
    item: &MeasureItem,
    formatting: &FormattingModel,
    width_px: f32,
) -> Option<f32> {
    let block = &item.block;
    if block.kind == BlockType::Image {
        let height = image_height(&block.text, width_px);
        if height.is_none() {
            warn!(block_id = %block.id, "Image block has no decodable dimensions");
        }
        return height;
    }

    let font_px = block.style.font_size.to_px();
    if font_px <= 0.0 || width_px <= 0.0 {
        return None;
    }

    let metrics = get_metrics(FontClass::from_css_name(&block.style.font_family));
    let lines = metrics.wrapped_lines(&item.display_text, width_px / font_px, block.style.bold);
    let line_height = font_px * formatting.line_spacing;
    let (before, after) = block_spacing_em(block.kind);

    Some((lines as f32 * line_height + (before + after) * font_px).round())
}

/// Images render at their natural size, scaled down to fit the content width.
fn image_height(src: &str, width_px: f32) -> Option<f32> {
    let (w, h) = image_dimensions(src)?;
    if w == 0 {
        return None;
    }
    let scale = (width_px / w as f32).min(1.0);
    Some((h as f32 * scale).round())
}

// ────────────────────────────────────────────────────────────────────────────
// Test doubles
// ────────────────────────────────────────────────────────────────────────────


// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
