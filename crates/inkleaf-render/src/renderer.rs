//! Renderer trait abstraction.

use crate::config::RenderConfig;
use crate::scene::PageScene;
use inkleaf_core::model::Page;
use inkleaf_core::text::TextMeasurer;
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid render target: {0}")]
    InvalidTarget(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Source document error: {0}")]
    Source(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Result of rasterizing a page - contains the raw RGBA pixel data and
/// dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PngRenderResult {
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba_data: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl PngRenderResult {
    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.rgba_data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Convert a stored ARGB value to a color.
pub fn argb_color(argb: u32) -> Color {
    Color::from_rgba8((argb >> 16) as u8, (argb >> 8) as u8, argb as u8, (argb >> 24) as u8)
}

/// Context for rendering one page at one size.
pub struct RenderContext<'a> {
    /// Target size in pixels.
    pub width: u32,
    pub height: u32,
    /// Pixels per dp.
    pub density: f64,
    pub config: &'a RenderConfig,
    /// Wraps text the same way the editor measures it.
    pub measurer: &'a dyn TextMeasurer,
}

impl<'a> RenderContext<'a> {
    /// Context for `page` rendered `width` pixels wide.
    pub fn for_page(page: &Page, width: u32, config: &'a RenderConfig, measurer: &'a dyn TextMeasurer) -> Self {
        let (width, height) = config.page_size(page.aspect_ratio, width);
        Self { width, height, density: config.density(width), config, measurer }
    }

    /// Convert dp to pixels.
    pub fn dp(&self, value: f64) -> f64 {
        value * self.density
    }
}

/// Trait for rasterization backends.
///
/// Every output path (thumbnail, export, live preview) goes through the same
/// [`PageScene`], so backends only decide how to turn draw ops into pixels.
pub trait Renderer: Send + Sync {
    fn render(&self, scene: &PageScene) -> RenderResult<PngRenderResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkleaf_core::model::PaperStyle;
    use inkleaf_core::text::ApproxTextMeasurer;

    #[test]
    fn test_context_for_page() {
        let config = RenderConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let mut page = Page::new(1, PaperStyle::Blank);
        page.aspect_ratio = 0.5;

        let ctx = RenderContext::for_page(&page, 720, &config, &measurer);
        assert_eq!((ctx.width, ctx.height), (720, 1440));
        assert_eq!(ctx.dp(32.0), 64.0);
    }

    #[test]
    fn test_argb_color() {
        let rgba = argb_color(0x80112233).to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b, rgba.a), (0x11, 0x22, 0x33, 0x80));
    }

    #[test]
    fn test_pixel_bounds() {
        let result = PngRenderResult { rgba_data: vec![1, 2, 3, 4], width: 1, height: 1 };
        assert_eq!(result.pixel(0, 0), Some([1, 2, 3, 4]));
        assert_eq!(result.pixel(1, 0), None);
    }
}
