//! Font registry and text measurement.

use crate::shapes::TextObject;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Horizontal shear applied to synthesized italics (x offset per pixel above the baseline).
pub const ITALIC_SHEAR: f32 = 0.2;

/// Font registration errors.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("Invalid font data for family {0}")]
    InvalidFont(String),
}

/// Fonts available to the engine, keyed by family name (case-insensitive).
///
/// The first registered family doubles as the fallback for unknown families.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: HashMap<String, FontArc>,
    fallback: Option<String>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a TrueType/OpenType font under `family`, replacing any previous face.
    pub fn register(&mut self, family: &str, data: Vec<u8>) -> Result<(), FontError> {
        let font = FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFont(family.to_string()))?;
        let key = family.trim().to_lowercase();
        if self.fallback.is_none() {
            self.fallback = Some(key.clone());
        }
        self.faces.insert(key, font);
        log::info!("Registered font family {}", family);
        Ok(())
    }

    /// Look up a family, falling back to the first registered font.
    pub fn resolve(&self, family: &str) -> Option<&FontArc> {
        self.faces
            .get(&family.trim().to_lowercase())
            .or_else(|| self.fallback.as_ref().and_then(|key| self.faces.get(key)))
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Registered family keys, sorted.
    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> = self.faces.keys().cloned().collect();
        families.sort();
        families
    }

    /// Measure (width, height) of a text object.
    ///
    /// Returns `None` when no font can render the text's family; callers
    /// fall back to [`TextObject::approximate_size`].
    pub fn measure(&self, text: &TextObject) -> Option<(f64, f64)> {
        let font = self.resolve(&text.font_family)?;
        let widths = line_widths(font, text);
        let width = widths.iter().copied().fold(0.0_f32, f32::max) as f64;
        Some((width + extra_width(text) as f64, text.line_count() as f64 * text.line_height()))
    }
}

/// Advance width of every line of `text`, including kerning.
pub(crate) fn line_widths(font: &FontArc, text: &TextObject) -> Vec<f32> {
    let size = text.font_size.max(0.0) as f32;
    let scaled = font.as_scaled(PxScale::from(size));
    text.content
        .split('\n')
        .map(|line| {
            let mut width = 0.0;
            let mut previous = None;
            for ch in line.chars() {
                let glyph = scaled.glyph_id(ch);
                if let Some(prev) = previous {
                    width += scaled.kern(prev, glyph);
                }
                width += scaled.h_advance(glyph);
                previous = Some(glyph);
            }
            width
        })
        .collect()
}

/// Pixels added by synthesized bold and italic.
pub(crate) fn extra_width(text: &TextObject) -> f32 {
    let size = text.font_size.max(0.0) as f32;
    let mut extra = 0.0;
    if text.is_bold() {
        extra += bold_offset(size) as f32;
    }
    if text.is_italic() {
        extra += size * ITALIC_SHEAR;
    }
    extra
}

/// Number of extra one-pixel passes used to embolden glyphs.
pub(crate) fn bold_offset(size: f32) -> u32 {
    (size / 16.0).ceil().max(1.0) as u32
}
