//! Paginator — partitions measured blocks into fixed-height pages.
//!
//! Single forward pass, greedy bin-packing with two overrides:
//! - `page_break_before` closes the current page (unless it is still empty, so a
//!   break on the first block never produces a leading blank page);
//! - a block taller than the budget is isolated on a page of its own and is never split.
//!
//! Pages are contiguous index ranges into the block slice, so concatenating
//! every page reproduces the input exactly.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::models::Block;

/// One page of output: a contiguous run of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Indices into the block list this page was computed from.
    pub blocks: Range<usize>,
    /// Sum of the measured heights on this page.
    pub height_px: f32,
    /// True when the page holds a single block taller than the budget.
    pub oversized: bool,
}

impl Page {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn slice<'a>(&self, blocks: &'a [Block]) -> &'a [Block] {
        &blocks[self.blocks.clone()]
    }
}

#[derive(Default)]
struct Accumulator {
    start: usize,
    len: usize,
    height: f32,
}

impl Accumulator {
    fn flush_into(&mut self, pages: &mut Vec<Page>) {
        if self.len > 0 {
            pages.push(Page {
                blocks: self.start..self.start + self.len,
                height_px: self.height,
                oversized: false,
            });
        }
        self.start += self.len;
        self.len = 0;
        self.height = 0.0;
    }

    /// Restarts the accumulator at `index` (used after an isolated page).
    fn reset_at(&mut self, index: usize) {
        self.start = index;
        self.len = 0;
        self.height = 0.0;
    }
}

/// Partitions `blocks` into pages of at most `budget_px` measured height.
///
/// `heights[i]` is the measured height of `blocks[i]`. `None` (or a missing entry)
/// means the measurement surface could not produce a height; that block still
/// lands on a page but contributes nothing to the running height.
///
/// Total over well-formed input: never panics, never drops or reorders blocks,
/// and returns no pages for an empty document.
pub fn paginate(blocks: &[Block], heights: &[Option<f32>], budget_px: f32) -> Vec<Page> {
    debug_assert_eq!(blocks.len(), heights.len(), "one height per block");
    debug_assert!(budget_px > 0.0, "page budget must be positive");

    let mut pages = Vec::new();
    let mut acc = Accumulator::default();

    for (index, block) in blocks.iter().enumerate() {
        let height = heights
            .get(index)
            .copied()
            .flatten()
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(0.0);

        if block.page_break_before {
            acc.flush_into(&mut pages);
        }

        if height > budget_px {
            acc.flush_into(&mut pages);
            pages.push(Page {
                blocks: index..index + 1,
                height_px: height,
                oversized: true,
            });
            acc.reset_at(index + 1);
            continue;
        }

        if acc.len > 0 && acc.height + height > budget_px {
            acc.flush_into(&mut pages);
        }

        acc.len += 1;
        acc.height += height;
    }

    acc.flush_into(&mut pages);
    pages
}
