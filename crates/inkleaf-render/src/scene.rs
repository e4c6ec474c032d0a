//! Page scene building.
//!
//! A [`PageScene`] is the ordered list of draw operations for one page at
//! one pixel size: background (bitmap or paper), then images, then strokes,
//! then text. Thumbnails, exports and previews all draw from it, so the
//! coordinate mapping lives in exactly one place.

use crate::paper::paper_ops;
use crate::renderer::{RenderContext, argb_color};
use image::RgbaImage;
use inkleaf_core::geometry::{CanvasMetrics, denormalize};
use inkleaf_core::model::{Page, TextItem, Tool};
use kurbo::{Point, Rect};
use peniko::{Color, Mix};
use std::sync::Arc;

/// Provides decoded bitmaps by asset path.
pub trait BitmapSource {
    /// The decoded bitmap at `path`, or `None` if it is missing or unreadable.
    fn bitmap(&self, path: &str) -> Option<Arc<RgbaImage>>;
}

/// A source without any bitmaps.
pub struct NoBitmaps;

impl BitmapSource for NoBitmaps {
    fn bitmap(&self, _path: &str) -> Option<Arc<RgbaImage>> {
        None
    }
}

/// Draw order layer of an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Images,
    Strokes,
    Text,
}

/// One draw operation in pixel space.
#[derive(Debug, Clone)]
pub enum SceneOp {
    /// Bitmap stretched over the whole page.
    Background { image: Arc<RgbaImage> },
    /// Straight paper line.
    Line { from: Point, to: Point, width: f64, color: Color },
    /// Paper dot.
    Dot { center: Point, radius: f64, color: Color },
    /// Bitmap in `rect`, rotated about its center by `rotation` degrees.
    Image { image: Arc<RgbaImage>, rect: Rect, rotation: f64 },
    /// Polyline with round caps and joins.
    Stroke { points: Vec<Point>, width: f64, color: Color, mix: Mix },
    /// Wrapped text. Lines start at the top-left of `rect`; the box is
    /// rotated about its center and clipped to `rect` when `clip` is set.
    Text { rect: Rect, rotation: f64, lines: Vec<String>, font_px: f64, line_height: f64, color: Color, clip: bool },
}

impl SceneOp {
    pub fn layer(&self) -> Layer {
        match self {
            SceneOp::Background { .. } | SceneOp::Line { .. } | SceneOp::Dot { .. } => Layer::Background,
            SceneOp::Image { .. } => Layer::Images,
            SceneOp::Stroke { .. } => Layer::Strokes,
            SceneOp::Text { .. } => Layer::Text,
        }
    }
}

/// Draw list of one page.
#[derive(Debug, Clone)]
pub struct PageScene {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<SceneOp>,
}

/// Build the scene for `page` at the size of `ctx`.
pub fn build_page_scene(page: &Page, ctx: &RenderContext<'_>, bitmaps: &dyn BitmapSource) -> PageScene {
    let canvas = CanvasMetrics::new(ctx.width as f64, ctx.height as f64, ctx.density);
    let mut ops = Vec::new();

    let background_path = page.background_path.as_deref().filter(|p| !p.trim().is_empty());
    match background_path.and_then(|path| bitmaps.bitmap(path)) {
        Some(image) => ops.push(SceneOp::Background { image }),
        None => {
            if let Some(path) = background_path {
                log::debug!("Background {} unavailable, drawing paper", path);
            }
            ops.extend(paper_ops(page.paper_style, ctx));
        }
    }

    for item in &page.image_items {
        match bitmaps.bitmap(&item.path) {
            Some(image) => ops.push(SceneOp::Image { image, rect: item.rect().to_pixels(&canvas), rotation: item.rotation }),
            None => log::debug!("Skipping missing image {}", item.path),
        }
    }

    for stroke in page.strokes.iter().filter(|s| s.is_renderable()) {
        let mix = match stroke.tool {
            Tool::Highlighter => Mix::Multiply,
            _ => Mix::Normal,
        };
        ops.push(SceneOp::Stroke {
            points: stroke.points.iter().map(|p| denormalize(*p, &canvas)).collect(),
            width: ctx.dp(stroke.width_dp),
            color: argb_color(stroke.color),
            mix,
        });
    }

    for item in &page.text_items {
        ops.push(text_op(item, ctx));
    }

    PageScene { width: ctx.width, height: ctx.height, ops }
}

fn text_op(item: &TextItem, ctx: &RenderContext<'_>) -> SceneOp {
    let font_px = ctx.dp(item.font_size_sp);
    let box_width = (item.width * ctx.width as f64).max(1.0);
    let box_height = item.height * ctx.height as f64;
    let x = item.x * ctx.width as f64;
    let y = item.y * ctx.height as f64;
    let content = if item.text.is_empty() { " " } else { item.text.as_str() };
    let layout = ctx.measurer.layout(content, font_px, box_width);
    SceneOp::Text {
        rect: Rect::new(x, y, x + box_width, y + box_height),
        rotation: item.rotation,
        lines: layout.lines,
        font_px,
        line_height: layout.line_height,
        color: argb_color(item.color),
        clip: box_height > 0.0,
    }
}
