//! Static glyph-width tables used by the metrics measurement surface.
//!
//! Widths are in em units (relative to font size), taken from the standard AFM
//! metrics of the core PostScript faces that browsers substitute for the common
//! document fonts. Kerning and ligatures are ignored; the error this introduces
//! is well under one line per paragraph at report sizes.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font classes
// ────────────────────────────────────────────────────────────────────────────

/// Generic face class a CSS font-family name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontClass {
    /// Times New Roman, Georgia, Garamond, Cambria...
    Serif,
    /// Arial, Helvetica, Verdana, Calibri, Inter...
    SansSerif,
    /// Courier New, Consolas, Menlo...
    Monospace,
}

const SANS_NAMES: &[&str] = &[
    "arial",
    "helvetica",
    "verdana",
    "calibri",
    "inter",
    "roboto",
    "open sans",
    "lato",
    "segoe ui",
    "tahoma",
    "trebuchet ms",
    "sans-serif",
];

const MONO_NAMES: &[&str] = &[
    "courier",
    "courier new",
    "consolas",
    "menlo",
    "monaco",
    "monospace",
];

impl FontClass {
    /// Resolves a CSS font-family value. The first family in a fallback list wins;
    /// unknown names fall back to serif, the browser default for documents.
    pub fn from_css_name(name: &str) -> Self {
        let first = name
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_ascii_lowercase();

        if MONO_NAMES.contains(&first.as_str()) {
            FontClass::Monospace
        } else if SANS_NAMES.contains(&first.as_str()) {
            FontClass::SansSerif
        } else {
            FontClass::Serif
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Bold faces run roughly 6% wider than their regular cuts.
const BOLD_WIDTH_FACTOR: f32 = 1.06;

/// Static character-width table for a face class.
///
/// `widths[i]` = width of ASCII character `(i + 32)` in em, 0x20 (space) through 0x7E (~).
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    pub class: FontClass,
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (bullets, accents, CJK...).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Width of `s` in em at regular weight.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Number of lines `s` occupies when greedily word-wrapped to `max_width_em`.
    ///
    /// Explicit newlines start a new line. A word wider than the line is broken
    /// across as many lines as it needs, as CSS `overflow-wrap: break-word` does.
    /// Empty text still occupies one line.
    pub fn wrapped_lines(&self, s: &str, max_width_em: f32, bold: bool) -> u32 {
        let scale = if bold { BOLD_WIDTH_FACTOR } else { 1.0 };
        let space_w = self.space_width * scale;

        s.split('\n')
            .map(|paragraph| {
                let mut lines = 1u32;
                let mut current = 0.0_f32;
                let mut first = true;

                for word in paragraph.split_whitespace() {
                    let word_w = self.measure_str(word) * scale;
                    let gap = if first { 0.0 } else { space_w };

                    if !first && current + gap + word_w > max_width_em {
                        lines = lines.saturating_add(1);
                        current = 0.0;
                    } else {
                        current += gap;
                    }

                    if word_w > max_width_em && max_width_em > 0.0 {
                        // `as` saturates, so an absurd ratio pins at u32::MAX.
                        let extra = ((word_w / max_width_em).ceil() - 1.0).max(0.0) as u32;
                        lines = lines.saturating_add(extra);
                        current = (word_w - extra as f32 * max_width_em).max(0.0);
                    } else {
                        current += word_w;
                    }
                    first = false;
                }
                lines
            })
            .fold(0u32, u32::saturating_add)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

/// Times-Roman AFM widths.
static SERIF_TABLE: FontMetricTable = FontMetricTable {
    class: FontClass::Serif,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.250, 0.333, 0.408, 0.500, 0.500, 0.833, 0.778, 0.180, 0.333, 0.333, 0.500, 0.564, 0.250, 0.333, 0.250, 0.278,
        // 0     1     2     3     4     5     6     7     8     9
        0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500,
        // :     ;     <     =     >     ?     @
        0.278, 0.278, 0.564, 0.564, 0.564, 0.444, 0.921,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.722, 0.667, 0.667, 0.722, 0.611, 0.556, 0.722, 0.722, 0.333, 0.389, 0.722, 0.611, 0.889,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.722, 0.722, 0.556, 0.722, 0.667, 0.556, 0.611, 0.722, 0.722, 0.944, 0.722, 0.722, 0.611,
        // [     \     ]     ^     _     `
        0.333, 0.278, 0.333, 0.469, 0.500, 0.333,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.444, 0.500, 0.444, 0.500, 0.444, 0.333, 0.500, 0.500, 0.278, 0.278, 0.500, 0.278, 0.778,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.500, 0.500, 0.500, 0.500, 0.333, 0.389, 0.278, 0.500, 0.500, 0.722, 0.500, 0.500, 0.444,
        // {     |     }     ~
        0.480, 0.200, 0.480, 0.541,
    ],
    average_char_width: 0.47,
    space_width: 0.250,
};

/// Helvetica AFM widths (metric-compatible with Arial).
static SANS_TABLE: FontMetricTable = FontMetricTable {
    class: FontClass::SansSerif,
    #[rustfmt::skip]
    widths: [
        // sp    !     "     #     $     %     &     '     (     )     *     +     ,     -     .     /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0     1     2     3     4     5     6     7     8     9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :     ;     <     =     >     ?     @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A     B     C     D     E     F     G     H     I     J     K     L     M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N     O     P     Q     R     S     T     U     V     W     X     Y     Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [     \     ]     ^     _     `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a     b     c     d     e     f     g     h     i     j     k     l     m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n     o     p     q     r     s     t     u     v     w     x     y     z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {     |     }     ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.53,
    space_width: 0.278,
};

/// Courier: every glyph is 0.6em.
static MONO_TABLE: FontMetricTable = FontMetricTable {
    class: FontClass::Monospace,
    widths: [0.600; 95],
    average_char_width: 0.600,
    space_width: 0.600,
};

/// Returns the static metric table for a face class.
pub fn get_metrics(class: FontClass) -> &'static FontMetricTable {
    match class {
        FontClass::Serif => &SERIF_TABLE,
        FontClass::SansSerif => &SANS_TABLE,
        FontClass::Monospace => &MONO_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
