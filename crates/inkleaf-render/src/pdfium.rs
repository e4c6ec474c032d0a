//! PDF page source backed by PDFium.
//!
//! Renders the real page content of imported PDFs. Page sizes still come
//! from lopdf, which needs no native library.

use crate::pdf::{LopdfPageSource, PdfPageSize, PdfPageSource};
use crate::renderer::{RenderResult, RendererError};
use image::RgbaImage;
use pdfium_render::prelude::*;

/// Page source that draws pages with PDFium.
pub struct PdfiumPageSource {
    pdfium: Pdfium,
    sizes: LopdfPageSource,
}

impl PdfiumPageSource {
    /// Bind PDFium, looking next to the executable, then in the working
    /// directory, then in the system library paths.
    pub fn bind() -> RenderResult<Self> {
        let exe_dir = std::env::current_exe().ok().and_then(|p| p.parent().map(|p| p.to_path_buf()));
        if let Some(dir) = &exe_dir {
            if let Ok(bindings) = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
                return Ok(Self::with_bindings(bindings));
            }
        }
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| RendererError::Source(format!("failed to bind pdfium: {}", e)))?;
        Ok(Self::with_bindings(bindings))
    }

    fn with_bindings(bindings: Box<dyn PdfiumLibraryBindings>) -> Self {
        Self { pdfium: Pdfium::new(bindings), sizes: LopdfPageSource::new() }
    }
}

fn pdfium_error(e: PdfiumError) -> RendererError {
    RendererError::Source(format!("pdfium: {}", e))
}

impl PdfPageSource for PdfiumPageSource {
    fn page_sizes(&self, pdf: &[u8]) -> RenderResult<Vec<PdfPageSize>> {
        self.sizes.page_sizes(pdf)
    }

    fn render_page(&self, pdf: &[u8], page_index: u32, width: u32, height: u32) -> RenderResult<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidTarget(format!("{}x{}", width, height)));
        }
        let document = self.pdfium.load_pdf_from_byte_slice(pdf, None).map_err(pdfium_error)?;
        let page_count = document.pages().len() as u32;
        let index = u16::try_from(page_index).ok().filter(|_| page_index < page_count).ok_or_else(|| {
            RendererError::Source(format!("page {} out of range (page_count={})", page_index, page_count))
        })?;
        let page = document.pages().get(index).map_err(pdfium_error)?;

        let config = PdfRenderConfig::new().set_target_width(width as i32).set_target_height(height as i32);
        let bitmap = page.render_with_config(&config).map_err(pdfium_error)?;
        let (bitmap_width, bitmap_height) = (bitmap.width() as u32, bitmap.height() as u32);
        let image = RgbaImage::from_raw(bitmap_width, bitmap_height, bitmap.as_rgba_bytes().to_vec())
            .ok_or_else(|| RendererError::Decode("pdfium bitmap size mismatch".to_string()))?;

        if image.dimensions() == (width, height) {
            Ok(image)
        } else {
            log::debug!("Resizing pdfium page from {}x{} to {}x{}", bitmap_width, bitmap_height, width, height);
            Ok(image::imageops::resize(&image, width, height, image::imageops::FilterType::Triangle))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_pdf;
    use crate::renderer::PngRenderResult;

    #[test]
    fn test_renders_page_content() {
        let source = match PdfiumPageSource::bind() {
            Ok(source) => source,
            Err(e) => {
                eprintln!("skipping, {}", e);
                return;
            }
        };
        let mut rgba = Vec::new();
        for _ in 0..(40 * 40) {
            rgba.extend_from_slice(&[200, 0, 0, 255]);
        }
        let bytes = encode_pdf(&PngRenderResult { rgba_data: rgba, width: 40, height: 40 }).unwrap();

        let image = source.render_page(&bytes, 0, 20, 20).unwrap();
        assert_eq!(image.dimensions(), (20, 20));
        let center = image.get_pixel(10, 10).0;
        assert!(center[0] > 150 && center[1] < 60, "{center:?}");
        assert!(source.render_page(&bytes, 1, 20, 20).is_err());
        assert_eq!(source.page_sizes(&bytes).unwrap().len(), 1);
    }
}
