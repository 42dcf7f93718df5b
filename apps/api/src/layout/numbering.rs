//! List markers for numbered and bullet blocks.
//!
//! Markers are never stored on a block. They are derived twice:
//! - before pagination, for measurement, by counting consecutive numbered blocks in
//!   the flat document order (`flat_list_indices`);
//! - after pagination, for display, by counting within each page (`page_list_indices`).
//!
//! The two agree except when a numbered run straddles a page boundary: the first
//! item on the new page is measured as "n." but displayed as "1.". The width
//! difference is at most a couple of glyphs and is accepted.

use crate::models::{Block, BlockType};

/// 1-based position of each numbered block within its run of consecutive numbered
/// blocks, counting over the whole document. `None` for every other block.
pub fn flat_list_indices(blocks: &[Block]) -> Vec<Option<u32>> {
    run_indices(blocks.iter())
}

/// Same counting as `flat_list_indices`, restarted at the top of every page.
pub fn page_list_indices(page: &[Block]) -> Vec<Option<u32>> {
    run_indices(page.iter())
}

fn run_indices<'a>(blocks: impl Iterator<Item = &'a Block>) -> Vec<Option<u32>> {
    let mut count = 0u32;
    blocks
        .map(|block| {
            if block.kind == BlockType::Numbered {
                count += 1;
                Some(count)
            } else {
                count = 0;
                None
            }
        })
        .collect()
}

/// Text exactly as rendered: bullets get "• ", numbered items "<n>. ".
pub fn display_text(block: &Block, list_index: Option<u32>) -> String {
    match block.kind {
        BlockType::Bullet => format!("• {}", block.text),
        BlockType::Numbered => format!("{}. {}", list_index.unwrap_or(1), block.text),
        _ => block.text.clone(),
    }
}
