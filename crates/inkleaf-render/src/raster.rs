//! CPU rasterizer.
//!
//! Draws a [`PageScene`] into an RGBA buffer on a white page. Coverage is
//! computed analytically from the distance to each segment, which gives
//! round caps and joins for free. Highlighter strokes use multiply blending
//! so overlapping ink darkens instead of washing out.

use crate::font::FontFace;
use crate::renderer::{PngRenderResult, RenderResult, Renderer, RendererError};
use crate::scene::{PageScene, SceneOp};
use image::{Rgba, RgbaImage};
use inkleaf_core::geometry::distance_point_to_segment;
use kurbo::{Affine, Point, Rect};
use peniko::{Color, Mix};

/// Coverage mask of one rendered line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    /// Row-major coverage, 0 to 255.
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    fn coverage_at(&self, x: f64, y: f64) -> f64 {
        if x < 0.0 || y < 0.0 {
            return 0.0;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.coverage.get(index).map_or(0.0, |c| *c as f64 / 255.0)
    }
}

/// Rasterizes glyphs for text boxes.
///
/// Wrapping is already done when the scene is built, so a painter only ever
/// sees single lines.
pub trait GlyphPainter: Send + Sync {
    /// Coverage of `text` set at `font_px`, `line_height` pixels tall, with
    /// the first glyph at x = 0.
    fn paint_line(&self, text: &str, font_px: f64, line_height: f64) -> Option<GlyphMask>;
}

/// Software renderer for thumbnails and exports.
pub struct CpuRenderer {
    glyphs: Option<Box<dyn GlyphPainter>>,
}

impl Default for CpuRenderer {
    fn default() -> Self {
        match FontFace::serif() {
            Some(face) => Self::with_glyph_painter(face),
            None => Self::without_glyphs(),
        }
    }
}

impl CpuRenderer {
    /// A renderer that sets text in the embedded serif face.
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that skips text boxes.
    pub fn without_glyphs() -> Self {
        Self { glyphs: None }
    }

    pub fn with_glyph_painter(painter: impl GlyphPainter + 'static) -> Self {
        Self { glyphs: Some(Box::new(painter)) }
    }

    pub fn has_glyphs(&self) -> bool {
        self.glyphs.is_some()
    }

    /// Rasterize `scene` into an image.
    pub fn render_image(&self, scene: &PageScene) -> RenderResult<RgbaImage> {
        if scene.width == 0 || scene.height == 0 {
            return Err(RendererError::InvalidTarget(format!("{}x{}", scene.width, scene.height)));
        }
        let mut target = RgbaImage::from_pixel(scene.width, scene.height, Rgba([255, 255, 255, 255]));
        let page = Rect::new(0.0, 0.0, scene.width as f64, scene.height as f64);

        for op in &scene.ops {
            match op {
                SceneOp::Background { image } => draw_bitmap(&mut target, image, page, 0.0),
                SceneOp::Line { from, to, width, color } => {
                    stroke_polyline(&mut target, &[*from, *to], *width, *color, Mix::Normal)
                }
                SceneOp::Dot { center, radius, color } => {
                    stroke_polyline(&mut target, &[*center], radius * 2.0, *color, Mix::Normal)
                }
                SceneOp::Image { image, rect, rotation } => draw_bitmap(&mut target, image, *rect, *rotation),
                SceneOp::Stroke { points, width, color, mix } => stroke_polyline(&mut target, points, *width, *color, *mix),
                SceneOp::Text { rect, rotation, lines, font_px, line_height, color, clip } => {
                    let text = TextBox { rect: *rect, rotation: *rotation, font_px: *font_px, line_height: *line_height, clip: *clip };
                    self.draw_text(&mut target, &text, lines, *color)
                }
            }
        }
        Ok(target)
    }

    fn draw_text(&self, target: &mut RgbaImage, text: &TextBox, lines: &[String], color: Color) {
        let Some(painter) = &self.glyphs else {
            log::debug!("No glyph painter, skipping text box at {:?}", text.rect.origin());
            return;
        };
        if lines.is_empty() || text.line_height <= 0.0 {
            return;
        }
        let masks: Vec<Option<GlyphMask>> =
            lines.iter().map(|line| painter.paint_line(line, text.font_px, text.line_height)).collect();
        let content_height = if text.clip { text.rect.height() } else { lines.len() as f64 * text.line_height };
        let local = Rect::new(0.0, 0.0, text.rect.width(), content_height);
        let transform = rotation_about(text.rect.center(), text.rotation) * Affine::translate(text.rect.origin().to_vec2());
        let inverse = transform.inverse();
        let color = rgba(color);

        let Some((x0, y0, x1, y1)) = pixel_span(transform.transform_rect_bbox(local), target) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = inverse * pixel_center(x, y);
                if p.x < 0.0 || p.y < 0.0 || p.x >= local.x1 || p.y >= local.y1 {
                    continue;
                }
                let line = (p.y / text.line_height) as usize;
                let Some(Some(mask)) = masks.get(line) else {
                    continue;
                };
                let coverage = mask.coverage_at(p.x, p.y - line as f64 * text.line_height);
                blend(target.get_pixel_mut(x, y), color, coverage, Mix::Normal);
            }
        }
    }
}

impl Renderer for CpuRenderer {
    fn render(&self, scene: &PageScene) -> RenderResult<PngRenderResult> {
        let image = self.render_image(scene)?;
        let (width, height) = image.dimensions();
        Ok(PngRenderResult { rgba_data: image.into_raw(), width, height })
    }
}

struct TextBox {
    rect: Rect,
    rotation: f64,
    font_px: f64,
    line_height: f64,
    clip: bool,
}

fn rgba(color: Color) -> [u8; 4] {
    let c = color.to_rgba8();
    [c.r, c.g, c.b, c.a]
}

fn pixel_center(x: u32, y: u32) -> Point {
    Point::new(x as f64 + 0.5, y as f64 + 0.5)
}

/// Rotation by `degrees` about `center`.
fn rotation_about(center: Point, degrees: f64) -> Affine {
    if degrees == 0.0 {
        return Affine::IDENTITY;
    }
    Affine::translate(center.to_vec2()) * Affine::rotate(degrees.to_radians()) * Affine::translate(-center.to_vec2())
}

/// Pixel index range `(x0, y0, x1, y1)` covering `rect`, clipped to the
/// target. End bounds are exclusive.
fn pixel_span(rect: Rect, target: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x0.floor().max(0.0);
    let y0 = rect.y0.floor().max(0.0);
    let x1 = rect.x1.ceil().min(target.width() as f64);
    let y1 = rect.y1.ceil().min(target.height() as f64);
    if !(x0 < x1 && y0 < y1) {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Composite `color` with `coverage` onto an opaque pixel.
fn blend(pixel: &mut Rgba<u8>, color: [u8; 4], coverage: f64, mix: Mix) {
    let alpha = color[3] as f64 / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    for i in 0..3 {
        let dst = pixel.0[i] as f64;
        let src = color[i] as f64;
        let mixed = match mix {
            Mix::Multiply => src * dst / 255.0,
            _ => src,
        };
        pixel.0[i] = (dst + (mixed - dst) * alpha).round().clamp(0.0, 255.0) as u8;
    }
    let dst_alpha = pixel.0[3] as f64;
    pixel.0[3] = (dst_alpha + (255.0 - dst_alpha) * alpha).round() as u8;
}

/// Stroke a polyline with round caps and joins. A single point draws a dot.
fn stroke_polyline(target: &mut RgbaImage, points: &[Point], width: f64, color: Color, mix: Mix) {
    let Some(first) = points.first() else {
        return;
    };
    let half = (width / 2.0).max(0.5);
    let pad = half + 1.0;
    let bounds = points.iter().fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
    let Some((x0, y0, x1, y1)) = pixel_span(bounds.inflate(pad, pad), target) else {
        return;
    };

    // Max coverage over all segments, so joins are not blended twice.
    let span_width = (x1 - x0) as usize;
    let mut coverage = vec![0.0f64; span_width * (y1 - y0) as usize];
    let segments: Vec<(Point, Point)> = if points.len() == 1 {
        vec![(*first, *first)]
    } else {
        points.windows(2).map(|w| (w[0], w[1])).collect()
    };
    for (a, b) in segments {
        let Some((sx0, sy0, sx1, sy1)) = pixel_span(Rect::from_points(a, b).inflate(pad, pad), target) else {
            continue;
        };
        for y in sy0..sy1 {
            for x in sx0..sx1 {
                let d = distance_point_to_segment(pixel_center(x, y), a, b);
                let c = (half + 0.5 - d).clamp(0.0, 1.0);
                let slot = &mut coverage[(y - y0) as usize * span_width + (x - x0) as usize];
                if c > *slot {
                    *slot = c;
                }
            }
        }
    }

    let color = rgba(color);
    for y in y0..y1 {
        for x in x0..x1 {
            let c = coverage[(y - y0) as usize * span_width + (x - x0) as usize];
            if c > 0.0 {
                blend(target.get_pixel_mut(x, y), color, c, mix);
            }
        }
    }
}

/// Draw `image` scaled into `rect`, rotated about its center.
fn draw_bitmap(target: &mut RgbaImage, image: &RgbaImage, rect: Rect, rotation: f64) {
    let (iw, ih) = (image.width() as f64, image.height() as f64);
    if iw == 0.0 || ih == 0.0 || rect.width() <= 0.0 || rect.height() <= 0.0 {
        return;
    }
    let transform = rotation_about(rect.center(), rotation)
        * Affine::translate(rect.origin().to_vec2())
        * Affine::scale_non_uniform(rect.width() / iw, rect.height() / ih);
    let inverse = transform.inverse();
    let Some((x0, y0, x1, y1)) = pixel_span(transform.transform_rect_bbox(Rect::new(0.0, 0.0, iw, ih)), target) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let src = inverse * pixel_center(x, y);
            if src.x < 0.0 || src.y < 0.0 || src.x >= iw || src.y >= ih {
                continue;
            }
            let texel = image.get_pixel(src.x as u32, src.y as u32).0;
            blend(target.get_pixel_mut(x, y), texel, 1.0, Mix::Normal);
        }
    }
}
