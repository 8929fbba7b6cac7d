//! Text width measurement for the overlay font.
//!
//! The measurement pass compares how wide the overlay font renders a run
//! with how wide the run is on the page, and scales the node to match.
//! Measurers are stateful like a canvas context: the font is set once and
//! reused for consecutive nodes with the same size and family.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Measures rendered text width in pixels.
pub trait TextMeasurer {
    /// Select the font used by subsequent [`measure`](Self::measure) calls.
    fn set_font(&mut self, font_size: f32, font_family: &str);

    /// Width of `text` in the current font.
    fn measure(&mut self, text: &str) -> f32;
}

/// Measurer that assumes every character advances by a fixed fraction of
/// the font size.
#[derive(Debug, Clone)]
pub struct FixedAdvanceMeasurer {
    advance_ratio: f32,
    font_size: f32,
}

impl FixedAdvanceMeasurer {
    /// Create a measurer advancing `advance_ratio` em per character.
    pub fn new(advance_ratio: f32) -> Self {
        Self {
            advance_ratio,
            font_size: 0.0,
        }
    }
}

impl Default for FixedAdvanceMeasurer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TextMeasurer for FixedAdvanceMeasurer {
    fn set_font(&mut self, font_size: f32, _font_family: &str) {
        self.font_size = font_size;
    }

    fn measure(&mut self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * self.advance_ratio
    }
}

/// Measurer backed by the horizontal advances of a TrueType/OpenType face.
///
/// The face is read once, when the measurer is created, into a table of
/// advances for every character its Unicode cmaps cover. A single face
/// serves every font family; characters without a glyph or advance count as
/// half an em.
#[derive(Debug, Clone)]
pub struct FontFaceMeasurer {
    advances: HashMap<char, f32>,
    units_per_em: f32,
    font_size: f32,
}

impl FontFaceMeasurer {
    /// Parse `data` as a font file and use face `face_index` from it.
    pub fn new(data: &[u8], face_index: u32) -> Result<Self> {
        let face = ttf_parser::Face::parse(data, face_index)
            .map_err(|e| Error::Font(format!("cannot parse face {}: {}", face_index, e)))?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 {
            return Err(Error::Font("face reports zero units per em".to_string()));
        }

        let mut advances = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|t| t.is_unicode()) {
                subtable.codepoints(|cp| {
                    let Some(c) = char::from_u32(cp) else {
                        return;
                    };
                    if advances.contains_key(&c) {
                        return;
                    }
                    if let Some(advance) = face.glyph_index(c).and_then(|g| face.glyph_hor_advance(g)) {
                        advances.insert(c, f32::from(advance));
                    }
                });
            }
        }
        log::debug!("Loaded advances for {} characters", advances.len());

        Ok(Self {
            advances,
            units_per_em: f32::from(units_per_em),
            font_size: 0.0,
        })
    }
}

impl TextMeasurer for FontFaceMeasurer {
    fn set_font(&mut self, font_size: f32, _font_family: &str) {
        self.font_size = font_size;
    }

    fn measure(&mut self, text: &str) -> f32 {
        let half_em = self.units_per_em / 2.0;
        let units: f32 = text
            .chars()
            .map(|c| self.advances.get(&c).copied().unwrap_or(half_em))
            .sum();
        units * self.font_size / self.units_per_em
    }
}
