//! Inbound content → Blocks.
//!
//! Content arrives as ordered `{type, text}` pairs, either from the LLM or
//! straight from a client. Ingest validates the pairs, assigns fresh ids, and
//! derives each block's style from the document formatting:
//!
//! | type      | size   | bold |
//! |-----------|--------|------|
//! | heading1  | body+4 | yes  |
//! | heading2  | body+1 | yes  |
//! | heading3  | body   | yes  |
//! | otherwise | body   | no   |
//!
//! Every heading1 after the first block starts a new page.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Block, BlockStyle, BlockType, FormattingModel, Length};

/// One entry of inbound content, before it becomes a Block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundBlock {
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub text: String,
}

/// Default style for a block of `kind` under `formatting`.
pub fn style_for(kind: BlockType, formatting: &FormattingModel) -> BlockStyle {
    let body_px = formatting.font_size_px();
    let (size_px, bold) = match kind {
        BlockType::Heading1 => (body_px + 4.0, true),
        BlockType::Heading2 => (body_px + 1.0, true),
        BlockType::Heading3 => (body_px, true),
        _ => (body_px, false),
    };

    BlockStyle {
        font_size: Length::px(size_px),
        font_family: formatting.font_family.clone(),
        color: formatting.theme_color().to_string(),
        bold,
    }
}

/// Validates inbound content and turns it into Blocks.
///
/// Rejects image entries (images are inserted separately, carrying their
/// data-URI). An empty list is valid and yields an empty document.
pub fn ingest(inbound: &[InboundBlock], formatting: &FormattingModel) -> Result<Vec<Block>, AppError> {
    if let Some(index) = inbound.iter().position(|b| b.kind == BlockType::Image) {
        return Err(AppError::Validation(format!(
            "block {index}: image blocks cannot be ingested as text; upload them as images"
        )));
    }

    let blocks = inbound
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut block = Block::new(entry.kind, entry.text.trim(), style_for(entry.kind, formatting));
            block.page_break_before = entry.kind == BlockType::Heading1 && index > 0;
            block
        })
        .collect();

    Ok(blocks)
}
