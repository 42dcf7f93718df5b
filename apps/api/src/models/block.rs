use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::units::Length;

/// Closed set of block kinds. Fixed at creation; only text and style change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "bullet")]
    Bullet,
    #[serde(rename = "numbered")]
    Numbered,
    #[serde(rename = "image")]
    Image,
}

impl BlockType {
    pub fn is_heading(self) -> bool {
        matches!(
            self,
            BlockType::Heading1 | BlockType::Heading2 | BlockType::Heading3
        )
    }

    /// Body blocks follow the document-wide font family and size.
    pub fn is_body_text(self) -> bool {
        matches!(
            self,
            BlockType::Paragraph | BlockType::Bullet | BlockType::Numbered
        )
    }

    pub fn heading_level(self) -> Option<u8> {
        match self {
            BlockType::Heading1 => Some(1),
            BlockType::Heading2 => Some(2),
            BlockType::Heading3 => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
    pub font_size: Length,
    pub font_family: String,
    /// CSS hex colour, e.g. `#1f2937`.
    pub color: String,
    pub bold: bool,
}

/// Partial style update from the editing surface. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStylePatch {
    pub font_size: Option<Length>,
    pub font_family: Option<String>,
    pub color: Option<String>,
    pub bold: Option<bool>,
}

impl BlockStyle {
    pub fn apply(&mut self, patch: &BlockStylePatch) {
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
        if let Some(family) = &patch.font_family {
            self.font_family = family.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(bold) = patch.bold {
            self.bold = bold;
        }
    }
}

/// One content unit of a document.
///
/// For `BlockType::Image` the `text` is a data-URI (or an opaque content reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub text: String,
    pub style: BlockStyle,
    #[serde(default)]
    pub page_break_before: bool,
}

impl Block {
    pub fn new(kind: BlockType, text: impl Into<String>, style: BlockStyle) -> Self {
        Self {
            id: generate_block_id(),
            kind,
            text: text.into(),
            style,
            page_break_before: false,
        }
    }
}

pub fn generate_block_id() -> String {
    format!("block_{}", Uuid::new_v4().simple())
}

/// Removes a leading list marker ("• " or "12. ") that the editing surface echoes back
/// with edited text. Markers are derived at display time and never stored.
pub fn strip_list_marker(text: &str) -> &str {
    if let Some(rest) = text.strip_prefix("• ") {
        return rest;
    }
    let digits = text.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = text[digits..].strip_prefix(". ") {
            return rest;
        }
    }
    text
}
