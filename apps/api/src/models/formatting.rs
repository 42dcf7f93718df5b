use serde::{Deserialize, Serialize};

use crate::models::units::{Length, Unit, UnitError, DPI, PAGE_HEIGHT_IN, PAGE_WIDTH_IN};

/// Theme identifier → default text colour. Unknown themes use the first entry.
pub const THEME_DEFAULT_COLORS: &[(&str, &str)] = &[
    ("default", "#1f2937"),
    ("charcoal", "#e2e8f0"),
    ("paper", "#4a4a4a"),
];

pub fn theme_default_color(theme: &str) -> &'static str {
    THEME_DEFAULT_COLORS
        .iter()
        .find(|(name, _)| *name == theme)
        .map(|(_, color)| *color)
        .unwrap_or(THEME_DEFAULT_COLORS[0].1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
}

/// Document-wide layout parameters.
///
/// Owned by the document session. The auto-fit controller is the only layout
/// component allowed to write to it, and only to `font_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingModel {
    pub font_family: String,
    pub font_size: Length,
    pub line_spacing: f32,
    pub text_align: TextAlign,
    #[serde(with = "margin_serde")]
    pub margin: Length,
    pub theme: String,
    pub header: String,
    pub footer: String,
    pub show_page_numbers: bool,
    pub show_borders: bool,
}

impl Default for FormattingModel {
    fn default() -> Self {
        Self {
            font_family: "Times New Roman".to_string(),
            font_size: Length::px(12.0),
            line_spacing: 1.5,
            text_align: TextAlign::Justify,
            margin: Length::inches(1.0),
            theme: "default".to_string(),
            header: String::new(),
            footer: "Page".to_string(),
            show_page_numbers: true,
            show_borders: false,
        }
    }
}

/// Largest font size accepted anywhere in a document (2in).
pub const MAX_FONT_SIZE_PX: f32 = 192.0;

/// Rejects font sizes the layout engine cannot sensibly wrap.
pub fn check_font_size(size: &Length) -> Result<(), String> {
    let px = size.to_px();
    if !(px.is_finite() && px > 0.0 && px <= MAX_FONT_SIZE_PX) {
        return Err(format!(
            "fontSize must be greater than 0 and at most {MAX_FONT_SIZE_PX}px, got {size}"
        ));
    }
    Ok(())
}

impl FormattingModel {
    pub fn font_size_px(&self) -> f32 {
        self.font_size.to_px()
    }

    pub fn theme_color(&self) -> &'static str {
        theme_default_color(&self.theme)
    }

    /// Usable text width on a page: page width minus left and right margins.
    pub fn content_width_px(&self) -> f32 {
        PAGE_WIDTH_IN * DPI - 2.0 * self.margin.to_px()
    }

    /// Usable vertical space per page: page height minus top and bottom margins.
    pub fn page_content_budget_px(&self) -> f32 {
        PAGE_HEIGHT_IN * DPI - 2.0 * self.margin.to_px()
    }

    /// Checks the invariants the layout engine relies on.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.line_spacing.is_finite() && self.line_spacing > 0.0) {
            return Err(format!(
                "lineSpacing must be a positive number, got {}",
                self.line_spacing
            ));
        }
        if self.content_width_px() <= 0.0 || self.page_content_budget_px() <= 0.0 {
            return Err(format!(
                "margin {} leaves no room for content on a {PAGE_WIDTH_IN}in x {PAGE_HEIGHT_IN}in page",
                self.margin
            ));
        }
        if self.font_family.trim().is_empty() {
            return Err("fontFamily cannot be empty".to_string());
        }
        check_font_size(&self.font_size)
    }
}

/// Global formatting change requested by the user. Each present field replaces the current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingPatch {
    pub font_family: Option<String>,
    pub font_size: Option<Length>,
    pub line_spacing: Option<f32>,
    pub text_align: Option<TextAlign>,
    pub margin: Option<String>,
    pub theme: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub show_page_numbers: Option<bool>,
    pub show_borders: Option<bool>,
}

impl FormattingPatch {
    pub fn parsed_margin(&self) -> Result<Option<Length>, UnitError> {
        self.margin
            .as_deref()
            .map(|m| Length::parse_with_default(m, Unit::In))
            .transpose()
    }
}

/// Margins accept bare numbers as inches, unlike other lengths.
mod margin_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::units::{Length, Unit};

    pub fn serialize<S: Serializer>(value: &Length, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Length, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Length::parse_with_default(&raw, Unit::In).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_is_letter_with_one_inch_margins() {
        let formatting = FormattingModel::default();
        assert!((formatting.content_width_px() - 624.0).abs() < 1e-3);
        assert!((formatting.page_content_budget_px() - 864.0).abs() < 1e-3);
    }

    #[test]
    fn test_font_size_is_bounded() {
        let mut formatting = FormattingModel::default();
        formatting.font_size = "10000000000000px".parse().unwrap();
        assert!(formatting.validate().unwrap_err().contains("fontSize"));

        formatting.font_size = Length::px(MAX_FONT_SIZE_PX);
        assert!(formatting.validate().is_ok());
        assert!(check_font_size(&"145pt".parse().unwrap()).is_err());
    }

    #[test]
    fn test_unknown_theme_falls_back_to_default_color() {
        assert_eq!(theme_default_color("charcoal"), "#e2e8f0");
        assert_eq!(theme_default_color("neon"), "#1f2937");
    }

    #[test]
    fn test_bare_margin_is_inches() {
        let json = serde_json::json!({
            "fontFamily": "Arial",
            "fontSize": "14px",
            "lineSpacing": 1.2,
            "textAlign": "left",
            "margin": "0.5",
            "theme": "paper",
            "header": "",
            "footer": "",
            "showPageNumbers": false,
            "showBorders": true
        });
        let formatting: FormattingModel = serde_json::from_value(json).unwrap();
        assert_eq!(formatting.margin, Length::inches(0.5));
        assert_eq!(formatting.text_align, TextAlign::Left);
    }

    #[test]
    fn test_validate_rejects_margin_larger_than_page() {
        let formatting = FormattingModel {
            margin: Length::inches(5.0),
            ..Default::default()
        };
        assert!(formatting.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_line_spacing() {
        let formatting = FormattingModel {
            line_spacing: 0.0,
            ..Default::default()
        };
        assert!(formatting.validate().is_err());
        assert!(FormattingModel::default().validate().is_ok());
    }
}
