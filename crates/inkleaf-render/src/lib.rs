//! Inkleaf Render Library
//!
//! Page rasterization plus the import and export pipeline built on it.
//! Pages are first lowered to a [`PageScene`] of draw operations in pixel
//! space, then painted by a [`Renderer`]. The default [`CpuRenderer`]
//! paints into an RGBA buffer without a GPU and sets text in an embedded
//! serif [`FontFace`].

mod cache;
mod config;
mod encode;
mod font;
mod library;
mod paper;
mod pdf;
#[cfg(feature = "pdfium")]
mod pdfium;
mod raster;
mod renderer;
mod scene;

pub use cache::{BitmapCache, decode_bitmap};
pub use config::{LibraryConfig, RenderConfig};
pub use encode::{encode_pdf, encode_png};
pub use font::FontFace;
pub use library::Library;
pub use paper::paper_ops;
pub use pdf::{LopdfPageSource, PdfPageSize, PdfPageSource, flatten_on_white};
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumPageSource;
pub use raster::{CpuRenderer, GlyphMask, GlyphPainter};
pub use renderer::{PngRenderResult, RenderContext, RenderResult, Renderer, RendererError, argb_color};
pub use scene::{BitmapSource, Layer, NoBitmaps, PageScene, SceneOp, build_page_scene};
