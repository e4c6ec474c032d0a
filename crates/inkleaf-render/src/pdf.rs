//! Source PDF pages.
//!
//! Imported PDFs become page backgrounds. Turning a PDF page into pixels is
//! behind [`PdfPageSource`]. With the `pdfium` feature, `PdfiumPageSource`
//! draws the real page content. Without it, [`LopdfPageSource`] reads page
//! sizes with lopdf and renders a blank sheet of the right proportions.

use crate::renderer::{RenderResult, RendererError};
use image::{Rgba, RgbaImage};
use lopdf::Document;

/// Size of a PDF page in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPageSize {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PdfPageSize {
    /// Letter, used when a page has no readable media box.
    pub const LETTER: PdfPageSize = PdfPageSize { width_pt: 612.0, height_pt: 792.0 };

    pub fn aspect_ratio(&self) -> f64 {
        self.width_pt / self.height_pt
    }

    /// Pixel size with the longest side at most `max_side`. Pages are never
    /// scaled up.
    pub fn fit(&self, max_side: u32) -> (u32, u32) {
        let longest = self.width_pt.max(self.height_pt);
        let scale = if longest > 0.0 { (max_side as f64 / longest).min(1.0) } else { 1.0 };
        let width = (self.width_pt * scale).round().max(1.0) as u32;
        let height = (self.height_pt * scale).round().max(1.0) as u32;
        (width, height)
    }
}

/// Reads and rasterizes pages of PDF documents.
pub trait PdfPageSource: Send + Sync {
    /// Sizes of every page of `pdf`.
    fn page_sizes(&self, pdf: &[u8]) -> RenderResult<Vec<PdfPageSize>>;

    /// Render page `page_index` of `pdf` at exactly `width` x `height`.
    fn render_page(&self, pdf: &[u8], page_index: u32, width: u32, height: u32) -> RenderResult<RgbaImage>;
}

/// Page source backed by lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfPageSource;

impl LopdfPageSource {
    pub fn new() -> Self {
        Self
    }
}

fn parse_error(e: lopdf::Error) -> RendererError {
    RendererError::Source(format!("PDF parse error: {}", e))
}

impl PdfPageSource for LopdfPageSource {
    fn page_sizes(&self, pdf: &[u8]) -> RenderResult<Vec<PdfPageSize>> {
        let doc = Document::load_mem(pdf).map_err(parse_error)?;
        let mut sizes = Vec::new();
        for (_, object_id) in doc.get_pages() {
            let dict = doc.get_dictionary(object_id).map_err(parse_error)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PdfPageSize { width_pt: (x1 - x0).abs() as f64, height_pt: (y1 - y0).abs() as f64 })
                })
                .filter(|size| size.width_pt > 0.0 && size.height_pt > 0.0)
                .unwrap_or(PdfPageSize::LETTER);
            sizes.push(size);
        }
        if sizes.is_empty() {
            return Err(RendererError::Source("document has no pages".to_string()));
        }
        Ok(sizes)
    }

    fn render_page(&self, pdf: &[u8], page_index: u32, width: u32, height: u32) -> RenderResult<RgbaImage> {
        let page_count = self.page_sizes(pdf)?.len() as u32;
        if page_index >= page_count {
            return Err(RendererError::Source(format!(
                "page {} out of range (page_count={})",
                page_index, page_count
            )));
        }
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidTarget(format!("{}x{}", width, height)));
        }

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        if width >= 4 && height >= 4 {
            let border = Rgba([220, 220, 220, 255]);
            for x in 0..width {
                image.put_pixel(x, 0, border);
                image.put_pixel(x, height - 1, border);
            }
            for y in 0..height {
                image.put_pixel(0, y, border);
                image.put_pixel(width - 1, y, border);
            }
        }
        Ok(image)
    }
}

/// Composite `image` over white, leaving an opaque bitmap.
pub fn flatten_on_white(image: &RgbaImage) -> RgbaImage {
    let mut flat = image.clone();
    for pixel in flat.pixels_mut() {
        let alpha = pixel.0[3] as u32;
        for channel in &mut pixel.0[..3] {
            *channel = ((*channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
        pixel.0[3] = 255;
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_pdf;
    use crate::renderer::PngRenderResult;

    fn pdf(width: u32, height: u32) -> Vec<u8> {
        let raster = PngRenderResult { rgba_data: vec![255; (width * height * 4) as usize], width, height };
        encode_pdf(&raster).unwrap()
    }

    #[test]
    fn test_fit() {
        let a4 = PdfPageSize { width_pt: 595.0, height_pt: 842.0 };
        assert_eq!(a4.fit(1600), (595, 842));
        let poster = PdfPageSize { width_pt: 3200.0, height_pt: 1600.0 };
        assert_eq!(poster.fit(1600), (1600, 800));
        assert_eq!(poster.aspect_ratio(), 2.0);
    }

    #[test]
    fn test_page_sizes() {
        let sizes = LopdfPageSource::new().page_sizes(&pdf(300, 400)).unwrap();
        assert_eq!(sizes, vec![PdfPageSize { width_pt: 300.0, height_pt: 400.0 }]);
    }

    #[test]
    fn test_invalid_pdf() {
        let source = LopdfPageSource::new();
        assert!(matches!(source.page_sizes(b"not a pdf"), Err(RendererError::Source(_))));
    }

    #[test]
    fn test_render_page() {
        let source = LopdfPageSource::new();
        let bytes = pdf(30, 40);
        let image = source.render_page(&bytes, 0, 15, 20).unwrap();
        assert_eq!(image.dimensions(), (15, 20));
        assert_eq!(image.get_pixel(7, 10).0, [255, 255, 255, 255]);
        assert!(source.render_page(&bytes, 1, 15, 20).is_err());
    }

    #[test]
    fn test_flatten_on_white() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let flat = flatten_on_white(&image);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(flat.get_pixel(1, 0).0, [0, 0, 0, 255]);
    }
}
