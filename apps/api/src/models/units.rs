//! Linear dimensions with an explicit unit suffix ("1in", "2cm", "12px").
//!
//! Everything the layout engine does happens in CSS pixels at a fixed 96 px/in.
//! Export adapters ask for twips instead (1in = 1440, 1cm = 567, 1pt = 20).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// US Letter, portrait.
pub const PAGE_WIDTH_IN: f32 = 8.5;
pub const PAGE_HEIGHT_IN: f32 = 11.0;
/// Reference resolution for every px conversion.
pub const DPI: f32 = 96.0;

const CM_PER_IN: f32 = 2.54;
const PT_PER_IN: f32 = 72.0;
pub const TWIPS_PER_IN: f32 = 1440.0;
const TWIPS_PER_CM: f32 = 567.0;
const TWIPS_PER_PT: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("'{0}' is not a number with a unit")]
    NotANumber(String),

    #[error("unknown unit '{unit}' in '{input}'")]
    UnknownUnit { input: String, unit: String },

    #[error("'{0}' must be positive")]
    NotPositive(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Px,
    Pt,
    In,
    Cm,
    Mm,
}

impl Unit {
    fn suffix(self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::In => "in",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
        }
    }

    fn px_per_unit(self) -> f32 {
        match self {
            Unit::Px => 1.0,
            Unit::Pt => DPI / PT_PER_IN,
            Unit::In => DPI,
            Unit::Cm => DPI / CM_PER_IN,
            Unit::Mm => DPI / CM_PER_IN / 10.0,
        }
    }
}

/// A positive quantity plus its unit. Serialized as the original string form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Length {
    pub value: f32,
    pub unit: Unit,
}

impl Length {
    pub fn px(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Px,
        }
    }

    pub fn inches(value: f32) -> Self {
        Self {
            value,
            unit: Unit::In,
        }
    }

    /// Parses `s`, reading a bare number as `default_unit`.
    ///
    /// Margins written as "1" mean one inch, font sizes written as "12" mean 12px.
    pub fn parse_with_default(s: &str, default_unit: Unit) -> Result<Self, UnitError> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
            .unwrap_or(trimmed.len());
        let (number, suffix) = trimmed.split_at(split);

        let value: f32 = number
            .parse()
            .map_err(|_| UnitError::NotANumber(s.to_string()))?;
        if !value.is_finite() {
            return Err(UnitError::NotANumber(s.to_string()));
        }

        let unit = match suffix.trim().to_ascii_lowercase().as_str() {
            "" => default_unit,
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "in" => Unit::In,
            "cm" => Unit::Cm,
            "mm" => Unit::Mm,
            other => {
                return Err(UnitError::UnknownUnit {
                    input: s.to_string(),
                    unit: other.to_string(),
                })
            }
        };

        if value <= 0.0 {
            return Err(UnitError::NotPositive(s.to_string()));
        }

        Ok(Self { value, unit })
    }

    pub fn to_px(self) -> f32 {
        self.value * self.unit.px_per_unit()
    }

    pub fn to_inches(self) -> f32 {
        self.to_px() / DPI
    }

    /// Twips for DOCX page setup. Centimetres use Word's 567/cm rather than 1440/2.54.
    pub fn to_twips(self) -> f32 {
        match self.unit {
            Unit::In => self.value * TWIPS_PER_IN,
            Unit::Cm => self.value * TWIPS_PER_CM,
            Unit::Mm => self.value * TWIPS_PER_CM / 10.0,
            Unit::Pt => self.value * TWIPS_PER_PT,
            Unit::Px => self.to_inches() * TWIPS_PER_IN,
        }
    }
}

impl FromStr for Length {
    type Err = UnitError;

    /// Bare numbers are px.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_default(s, Unit::Px)
    }
}

impl TryFrom<String> for Length {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Length> for String {
    fn from(value: Length) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Converts CSS px to typographic points (0.75pt per px).
pub fn px_to_pt(px: f32) -> f32 {
    px * PT_PER_IN / DPI
}

pub fn pt_to_twips(pt: f32) -> f32 {
    pt * TWIPS_PER_PT
}
