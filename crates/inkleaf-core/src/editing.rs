//! Stroke and item editing operations.
//!
//! These are plain functions over page content; the editor session decides
//! when they run and how they are grouped into undo steps.

use crate::config::EditorConfig;
use crate::geometry::{CanvasMetrics, clamp_unit, denormalize, distance_point_to_segment};
use crate::model::{ImageItem, Page, Stroke, TextItem, Tool};
use crate::new_id;
use crate::selection::SelectionIds;
use crate::text::{TextMeasurer, text_height_normalized};
use kurbo::{Point, Vec2};

/// Clamp an item origin so a span of `size` stays on the page.
fn clamp_origin(value: f64, size: f64) -> f64 {
    value.clamp(0.0, (1.0 - size).max(0.0))
}

/// Scale the alpha channel of an ARGB color.
pub fn with_alpha_factor(color: u32, factor: f64) -> u32 {
    let alpha = ((color >> 24) as f64 * factor.clamp(0.0, 1.0)).round() as u32;
    (alpha << 24) | (color & 0x00FF_FFFF)
}

/// Points of a stroke being drawn.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    points: Vec<Point>,
}

impl StrokeCapture {
    /// Start a new capture at `point`, dropping any previous one.
    pub fn begin(&mut self, point: Point) {
        self.points.clear();
        self.points.push(point);
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    /// Points captured so far, for live drawing.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn cancel(&mut self) {
        self.points.clear();
    }

    /// Finish the capture. Returns the stroke if it has at least two points.
    ///
    /// Highlighter strokes get their reduced alpha baked into the color.
    pub fn finish(&mut self, tool: Tool, color: u32, width_dp: f64, config: &EditorConfig) -> Option<Stroke> {
        let points = std::mem::take(&mut self.points);
        if points.len() < 2 || !tool.draws_ink() {
            return None;
        }
        let color = match tool {
            Tool::Highlighter => with_alpha_factor(color, config.highlighter_alpha),
            _ => color,
        };
        Some(Stroke::new(tool, color, width_dp, points))
    }
}

/// Erase the parts of `stroke` under a circle in pixel space.
///
/// Points within the circle are removed. A segment that passes through the
/// circle while both of its endpoints lie outside loses both endpoints too.
/// Segments next to a removed point are left to the point rule, so erasing
/// the middle point of a straight five-point stroke keeps `[p0, p1]` and
/// `[p3, p4]` rather than cutting the neighbours as well.
/// The remaining points are split into runs; runs shorter than two points are
/// dropped and each surviving run becomes a stroke with a new id. A stroke
/// the circle does not touch is returned unchanged.
pub fn erase_stroke(stroke: &Stroke, eraser: Point, radius_px: f64, canvas: &CanvasMetrics) -> Vec<Stroke> {
    if stroke.points.is_empty() {
        return Vec::new();
    }
    let pixels: Vec<Point> = stroke.points.iter().map(|p| denormalize(*p, canvas)).collect();
    let hit: Vec<bool> = pixels.iter().map(|p| p.distance(eraser) <= radius_px).collect();
    let mut keep: Vec<bool> = hit.iter().map(|h| !h).collect();

    for (i, segment) in pixels.windows(2).enumerate() {
        if hit[i] || hit[i + 1] {
            continue;
        }
        if distance_point_to_segment(eraser, segment[0], segment[1]) <= radius_px {
            keep[i] = false;
            keep[i + 1] = false;
        }
    }
    if keep.iter().all(|k| *k) {
        return vec![stroke.clone()];
    }

    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    for (point, kept) in stroke.points.iter().zip(&keep) {
        if *kept {
            current.push(*point);
        } else if current.len() >= 2 {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }

    runs.into_iter()
        .map(|points| Stroke { id: new_id(), points, ..stroke.clone() })
        .collect()
}

/// Erase at a normalized position across all strokes.
///
/// Returns `true` if the stroke list changed. Nothing happens on an empty
/// page or before the canvas has a size.
pub fn erase_strokes_at(position: Point, strokes: &mut Vec<Stroke>, radius_px: f64, canvas: &CanvasMetrics) -> bool {
    if strokes.is_empty() || canvas.is_empty() {
        return false;
    }
    let eraser = denormalize(position, canvas);
    let updated: Vec<Stroke> = strokes
        .iter()
        .flat_map(|stroke| erase_stroke(stroke, eraser, radius_px, canvas))
        .collect();
    if updated == *strokes {
        return false;
    }
    *strokes = updated;
    true
}

/// Move the selected content by a normalized delta.
///
/// Stroke points are clamped to the page individually. Boxes keep their size
/// and are clamped as a whole.
pub fn apply_delta_to_selection(page: &mut Page, selection: &SelectionIds, delta: Vec2) {
    for stroke in page.strokes.iter_mut().filter(|s| selection.strokes.contains(&s.id)) {
        for point in &mut stroke.points {
            *point = clamp_unit(*point + delta);
        }
    }
    for item in page.text_items.iter_mut().filter(|t| selection.texts.contains(&t.id)) {
        item.x = clamp_origin(item.x + delta.x, item.width);
        item.y = clamp_origin(item.y + delta.y, item.height);
    }
    for item in page.image_items.iter_mut().filter(|i| selection.images.contains(&i.id)) {
        item.x = clamp_origin(item.x + delta.x, item.width);
        item.y = clamp_origin(item.y + delta.y, item.height);
    }
}

/// Append offset copies of the selected content with new ids.
///
/// Returns the ids of the copies.
pub fn duplicate_selection(page: &mut Page, selection: &SelectionIds, offset: f64) -> SelectionIds {
    let shift = Vec2::new(offset, offset);
    let mut copies = SelectionIds::default();

    let strokes: Vec<Stroke> = page
        .strokes
        .iter()
        .filter(|s| selection.strokes.contains(&s.id))
        .map(|s| Stroke {
            id: new_id(),
            points: s.points.iter().map(|p| clamp_unit(*p + shift)).collect(),
            ..s.clone()
        })
        .collect();
    let texts: Vec<TextItem> = page
        .text_items
        .iter()
        .filter(|t| selection.texts.contains(&t.id))
        .map(|t| TextItem {
            id: new_id(),
            x: clamp_origin(t.x + offset, t.width),
            y: clamp_origin(t.y + offset, t.height),
            ..t.clone()
        })
        .collect();
    let images: Vec<ImageItem> = page
        .image_items
        .iter()
        .filter(|i| selection.images.contains(&i.id))
        .map(|i| ImageItem {
            id: new_id(),
            x: clamp_origin(i.x + offset, i.width),
            y: clamp_origin(i.y + offset, i.height),
            ..i.clone()
        })
        .collect();

    copies.strokes.extend(strokes.iter().map(|s| s.id.clone()));
    copies.texts.extend(texts.iter().map(|t| t.id.clone()));
    copies.images.extend(images.iter().map(|i| i.id.clone()));
    page.strokes.extend(strokes);
    page.text_items.extend(texts);
    page.image_items.extend(images);
    copies
}

/// Remove the selected content.
pub fn delete_selection(page: &mut Page, selection: &SelectionIds) {
    page.strokes.retain(|s| !selection.strokes.contains(&s.id));
    page.text_items.retain(|t| !selection.texts.contains(&t.id));
    page.image_items.retain(|i| !selection.images.contains(&i.id));
}

/// Text measurement inputs shared by text operations.
#[derive(Clone, Copy)]
pub struct TextContext<'a> {
    pub config: &'a EditorConfig,
    pub measurer: &'a dyn TextMeasurer,
    pub canvas: Option<&'a CanvasMetrics>,
}

impl TextContext<'_> {
    fn height(&self, text: &str, font_size_sp: f64, width: f64) -> f64 {
        text_height_normalized(self.measurer, text, font_size_sp, width, self.canvas)
    }
}

/// A new text box with its top-left corner at `at`.
pub fn create_text_item(at: Point, text: &str, font_size_sp: f64, color: u32, ctx: &TextContext<'_>) -> TextItem {
    let font_size_sp = ctx.config.clamp_text_size(font_size_sp);
    let width = ctx.config.default_text_width;
    let height = ctx.height(text, font_size_sp, width);
    TextItem {
        id: new_id(),
        text: text.to_string(),
        x: clamp_origin(at.x, width),
        y: clamp_origin(at.y, height),
        width,
        height,
        font_size_sp,
        color,
        rotation: 0.0,
    }
}

/// Replace the content and style of a text box, keeping its width.
pub fn edit_text_item(item: &mut TextItem, text: &str, font_size_sp: f64, color: u32, ctx: &TextContext<'_>) {
    let font_size_sp = ctx.config.clamp_text_size(font_size_sp);
    item.text = text.to_string();
    item.font_size_sp = font_size_sp;
    item.color = color;
    item.height = ctx.height(text, font_size_sp, item.width);
    item.y = clamp_origin(item.y, item.height);
}

/// Re-measure every text box after the canvas size changed.
///
/// Returns `true` if any height moved by more than 0.001.
pub fn remeasure_text_items(items: &mut [TextItem], ctx: &TextContext<'_>) -> bool {
    let mut changed = false;
    for item in items.iter_mut() {
        let height = ctx.height(&item.text, item.font_size_sp, item.width);
        if (height - item.height).abs() > 0.001 {
            item.height = height;
            item.y = clamp_origin(item.y, height);
            changed = true;
        }
    }
    changed
}

/// A centered image box for a bitmap of the given intrinsic size.
///
/// Unknown sizes (zero height) are treated as square.
pub fn create_image_item(path: &str, intrinsic_width: u32, intrinsic_height: u32, config: &EditorConfig) -> ImageItem {
    let ratio = if intrinsic_height > 0 && intrinsic_width > 0 {
        intrinsic_width as f64 / intrinsic_height as f64
    } else {
        1.0
    };
    let mut width = config.image_insert_width;
    let mut height = width / ratio;
    if height > config.image_insert_max_height {
        height = config.image_insert_max_height;
        width = height * ratio;
    }
    ImageItem {
        id: new_id(),
        path: path.to_string(),
        x: ((1.0 - width) / 2.0).clamp(0.0, 1.0),
        y: ((1.0 - height) / 2.0).clamp(0.0, 1.0),
        width: width.min(1.0),
        height: height.min(1.0),
        rotation: 0.0,
    }
}
