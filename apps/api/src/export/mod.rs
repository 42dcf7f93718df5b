//! Export manifest — the paginated document in the units document encoders want.
//!
//! Encoders (DOCX, PDF) are external. They receive one export page per
//! pagination page and must not re-paginate: the first block of every page
//! after the first carries `page_break_before`, so an encoder that only
//! understands paragraph-level breaks still reproduces the same boundaries.
//!
//! # Conversions
//! - font size: half-points, `round(px × 0.75 × 2)`
//! - line spacing: 240ths of a line, `round(multiplier × 240)`
//! - paragraph spacing: twips of the block's own font size (`em × pt × 20`)
//! - margins: twips (1in = 1440, 1cm = 567)
//! - images: 600px wide, height keeping the aspect ratio

use data_url::DataUrl;
use serde::Serialize;
use uuid::Uuid;

use crate::layout::measure::{block_spacing_em, image_dimensions};
use crate::layout::PaginatedLayout;
use crate::models::units::{pt_to_twips, px_to_pt, PAGE_HEIGHT_IN, PAGE_WIDTH_IN, TWIPS_PER_IN};
use crate::models::{Block, BlockType, FormattingModel, TextAlign};

const IMAGE_TARGET_WIDTH_PX: u32 = 600;
const LINE_SPACING_UNIT: f32 = 240.0;
/// Page border: single line, 3pt, 24pt from the page edge.
const BORDER_SIZE_EIGHTHS_PT: u32 = 24;
const BORDER_SPACE_PT: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTarget {
    pub mime_type: String,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockType,
    /// Raw text. List markers come from `list`, not from the text.
    pub text: String,
    pub heading_level: Option<u8>,
    pub list: Option<ListKind>,
    pub font_family: String,
    pub font_half_points: u32,
    /// Hex colour without the leading '#'.
    pub color: String,
    pub bold: bool,
    pub spacing_before_twips: u32,
    pub spacing_after_twips: u32,
    pub page_break_before: bool,
    /// Target size for image blocks; `None` for text or undecodable images,
    /// which encoders skip.
    pub image: Option<ImageTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPage {
    pub number: usize,
    pub oversized: bool,
    pub blocks: Vec<ExportBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetup {
    pub width_twips: u32,
    pub height_twips: u32,
    pub margin_twips: u32,
    pub text_align: TextAlign,
    pub line_spacing: u32,
    pub borders: Option<PageBorders>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBorders {
    pub size_eighths_pt: u32,
    pub space_pt: u32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderFooter {
    pub header: String,
    pub footer: String,
    pub show_page_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub document_id: Uuid,
    pub version: u64,
    pub page_setup: PageSetup,
    pub header_footer: HeaderFooter,
    pub pages: Vec<ExportPage>,
}

/// Builds the manifest for `blocks` as paginated by `layout`.
///
/// `layout` must have been computed from exactly these blocks and formatting.
pub fn build_manifest(
    document_id: Uuid,
    version: u64,
    blocks: &[Block],
    formatting: &FormattingModel,
    layout: &PaginatedLayout,
) -> ExportManifest {
    let pages = layout
        .pages
        .iter()
        .enumerate()
        .map(|(page_index, page)| ExportPage {
            number: page_index + 1,
            oversized: page.oversized,
            blocks: page
                .slice(blocks)
                .iter()
                .enumerate()
                .map(|(i, block)| {
                    let starts_page = i == 0 && page_index > 0;
                    export_block(block, block.page_break_before || starts_page)
                })
                .collect(),
        })
        .collect();

    ExportManifest {
        document_id,
        version,
        page_setup: PageSetup {
            width_twips: (PAGE_WIDTH_IN * TWIPS_PER_IN).round() as u32,
            height_twips: (PAGE_HEIGHT_IN * TWIPS_PER_IN).round() as u32,
            margin_twips: formatting.margin.to_twips().round() as u32,
            text_align: formatting.text_align,
            line_spacing: (formatting.line_spacing * LINE_SPACING_UNIT).round() as u32,
            borders: formatting.show_borders.then(|| PageBorders {
                size_eighths_pt: BORDER_SIZE_EIGHTHS_PT,
                space_pt: BORDER_SPACE_PT,
                color: "000000".to_string(),
            }),
        },
        header_footer: HeaderFooter {
            header: formatting.header.clone(),
            footer: formatting.footer.clone(),
            show_page_numbers: formatting.show_page_numbers,
        },
        pages,
    }
}

fn export_block(block: &Block, page_break_before: bool) -> ExportBlock {
    let font_pt = px_to_pt(block.style.font_size.to_px());
    let (before_em, after_em) = block_spacing_em(block.kind);

    ExportBlock {
        id: block.id.clone(),
        kind: block.kind,
        text: block.text.clone(),
        heading_level: block.kind.heading_level(),
        list: match block.kind {
            BlockType::Bullet => Some(ListKind::Bullet),
            BlockType::Numbered => Some(ListKind::Numbered),
            _ => None,
        },
        font_family: block.style.font_family.clone(),
        font_half_points: (font_pt * 2.0).round() as u32,
        color: block.style.color.trim_start_matches('#').to_string(),
        bold: block.style.bold,
        spacing_before_twips: pt_to_twips(font_pt * before_em).round() as u32,
        spacing_after_twips: pt_to_twips(font_pt * after_em).round() as u32,
        page_break_before,
        image: if block.kind == BlockType::Image {
            image_target(&block.text)
        } else {
            None
        },
    }
}

fn image_target(src: &str) -> Option<ImageTarget> {
    let (w, h) = image_dimensions(src)?;
    if w == 0 {
        return None;
    }
    let url = DataUrl::process(src).ok()?;
    let mime = url.mime_type();
    let height = (h as f32 / w as f32 * IMAGE_TARGET_WIDTH_PX as f32).round() as u32;

    Some(ImageTarget {
        mime_type: format!("{}/{}", mime.type_, mime.subtype),
        width_px: IMAGE_TARGET_WIDTH_PX,
        height_px: height,
    })
}
