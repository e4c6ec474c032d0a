//! Font-backed text measurement and glyph rasterization.
//!
//! [`FontFace`] wraps an `ab_glyph` font. It is both the [`TextMeasurer`]
//! that wraps text boxes and the [`GlyphPainter`] that draws them, so line
//! breaks in the editor and in rendered pages come from the same advances.
//! A serif face is embedded and used by default.

use crate::raster::{GlyphMask, GlyphPainter};
use crate::renderer::{RenderResult, RendererError};
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use inkleaf_core::text::TextMeasurer;
use std::sync::LazyLock;

static SERIF_TTF: &[u8] = include_bytes!("../assets/fonts/DejaVuSerif.ttf");

static SERIF: LazyLock<Option<FontArc>> = LazyLock::new(|| match FontArc::try_from_slice(SERIF_TTF) {
    Ok(font) => Some(font),
    Err(e) => {
        log::error!("Failed to load embedded serif font: {}", e);
        None
    }
});

/// A font used to measure and draw text boxes.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("units_per_em", &self.font.units_per_em()).finish()
    }
}

impl FontFace {
    /// The embedded serif face (DejaVu Serif).
    pub fn serif() -> Option<Self> {
        SERIF.clone().map(|font| Self { font })
    }

    /// Load a TrueType or OpenType font.
    pub fn from_vec(data: Vec<u8>) -> RenderResult<Self> {
        let font = FontArc::try_from_vec(data).map_err(|e| RendererError::Decode(format!("font: {}", e)))?;
        Ok(Self { font })
    }

    /// Scale at which one em is `font_px` pixels.
    fn scale(&self, font_px: f64) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(font_px as f32 * self.font.height_unscaled() / units_per_em)
    }

    fn advance(&self, text: &str, font_px: f64) -> f32 {
        let scaled = self.font.as_scaled(self.scale(font_px));
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }
}

impl TextMeasurer for FontFace {
    fn line_height(&self, font_px: f64) -> f64 {
        let scaled = self.font.as_scaled(self.scale(font_px));
        (scaled.height() + scaled.line_gap()) as f64
    }

    fn measure_width(&self, text: &str, font_px: f64) -> f64 {
        self.advance(text, font_px) as f64
    }
}

impl GlyphPainter for FontFace {
    fn paint_line(&self, text: &str, font_px: f64, line_height: f64) -> Option<GlyphMask> {
        if text.trim().is_empty() || font_px <= 0.0 || line_height <= 0.0 {
            return None;
        }
        let scale = self.scale(font_px);
        let scaled = self.font.as_scaled(scale);
        // Overhang of the last glyph can reach past its advance.
        let width = (self.advance(text, font_px) + font_px as f32 * 0.25).ceil().max(1.0) as u32;
        let height = line_height.ceil().max(1.0) as u32;
        let baseline = (line_height as f32 - scaled.height()) / 2.0 + scaled.ascent();

        let mut coverage = vec![0u8; width as usize * height as usize];
        let mut x = 0.0;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = prev {
                x += scaled.kern(prev, id);
            }
            let glyph = id.with_scale_and_position(scale, point(x, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, c| {
                    let px = bounds.min.x as i64 + gx as i64;
                    let py = bounds.min.y as i64 + gy as i64;
                    if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                        return;
                    }
                    let slot = &mut coverage[py as usize * width as usize + px as usize];
                    *slot = (*slot).max((c.clamp(0.0, 1.0) * 255.0).round() as u8);
                });
            }
            x += scaled.h_advance(id);
            prev = Some(id);
        }
        Some(GlyphMask { width, height, coverage })
    }
}
