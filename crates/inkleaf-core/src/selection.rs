//! Selection, transform handles and resize/rotate manipulation.
//!
//! Selections are sets of ids. Resizing and rotating are only offered for a
//! single text box or a single image. Mixed selections and selections with
//! ink can only be moved, duplicated or deleted.

use crate::config::EditorConfig;
use crate::geometry::{CanvasMetrics, NormalizedRect, point_in_polygon};
use crate::model::Page;
use crate::snap::{SnapCandidate, SnapGuides, find_snap_candidate};
use crate::text::{TextMeasurer, text_height_normalized};
use kurbo::Point;
use std::collections::HashSet;

/// Ids of the selected page content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionIds {
    pub strokes: HashSet<String>,
    pub texts: HashSet<String>,
    pub images: HashSet<String>,
}

impl SelectionIds {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.texts.is_empty() && self.images.is_empty()
    }

    /// Total number of selected objects.
    pub fn len(&self) -> usize {
        self.strokes.len() + self.texts.len() + self.images.len()
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.texts.clear();
        self.images.clear();
    }

    /// Selection holding one text box.
    pub fn text(id: impl Into<String>) -> Self {
        Self { texts: HashSet::from([id.into()]), ..Self::default() }
    }

    /// Selection holding one image.
    pub fn image(id: impl Into<String>) -> Self {
        Self { images: HashSet::from([id.into()]), ..Self::default() }
    }

    /// Drop ids that no longer exist on `page`.
    pub fn retain_existing(&mut self, page: &Page) {
        self.strokes.retain(|id| page.strokes.iter().any(|s| &s.id == id));
        self.texts.retain(|id| page.text_items.iter().any(|t| &t.id == id));
        self.images.retain(|id| page.image_items.iter().any(|i| &i.id == id));
    }
}

/// Select everything the lasso polygon touches.
///
/// A stroke is selected when any of its points is inside. Text boxes and
/// images are tested with five samples: their four corners and center, so a
/// lasso drawn across the middle of a box without enclosing any sample does
/// not select it.
pub fn select_within_lasso(lasso: &[Point], page: &Page) -> SelectionIds {
    let mut selection = SelectionIds::default();
    if lasso.len() < 3 {
        return selection;
    }
    let hit = |rect: NormalizedRect| rect.sample_points().iter().any(|p| point_in_polygon(*p, lasso));

    for stroke in &page.strokes {
        if stroke.points.iter().any(|p| point_in_polygon(*p, lasso)) {
            selection.strokes.insert(stroke.id.clone());
        }
    }
    for item in &page.text_items {
        if hit(item.rect()) {
            selection.texts.insert(item.id.clone());
        }
    }
    for item in &page.image_items {
        if hit(item.rect()) {
            selection.images.insert(item.id.clone());
        }
    }
    selection
}

/// Union bounds of the selected content, clamped to the page.
pub fn selection_bounds(page: &Page, selection: &SelectionIds) -> Option<NormalizedRect> {
    let mut bounds = NormalizedRect::new(1.0, 1.0, 0.0, 0.0);
    let mut any = false;

    for stroke in page.strokes.iter().filter(|s| selection.strokes.contains(&s.id)) {
        for point in &stroke.points {
            bounds.include_point(*point);
            any = true;
        }
    }
    for item in page.text_items.iter().filter(|t| selection.texts.contains(&t.id)) {
        bounds.include_rect(&item.rect());
        any = true;
    }
    for item in page.image_items.iter().filter(|i| selection.images.contains(&i.id)) {
        bounds.include_rect(&item.rect());
        any = true;
    }

    any.then(|| bounds.clamped())
}

/// Kind of object a transform applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Text,
    Image,
}

/// The single object that resize/rotate handles act on.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformTarget {
    pub kind: TransformKind,
    pub id: String,
    pub bounds: NormalizedRect,
    /// Degrees.
    pub rotation: f64,
}

/// Resolve the transform target of a selection, if it has one.
pub fn transform_target(selection: &SelectionIds, page: &Page) -> Option<TransformTarget> {
    if !selection.strokes.is_empty() {
        return None;
    }
    if selection.texts.len() == 1 && selection.images.is_empty() {
        let id = selection.texts.iter().next()?;
        let item = page.text_item(id)?;
        return Some(TransformTarget {
            kind: TransformKind::Text,
            id: item.id.clone(),
            bounds: item.rect(),
            rotation: item.rotation,
        });
    }
    if selection.images.len() == 1 && selection.texts.is_empty() {
        let id = selection.images.iter().next()?;
        let item = page.image_item(id)?;
        return Some(TransformTarget {
            kind: TransformKind::Image,
            id: item.id.clone(),
            bounds: item.rect(),
            rotation: item.rotation,
        });
    }
    None
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn moves_left(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::BottomLeft)
    }

    fn moves_top(self) -> bool {
        matches!(self, Corner::TopLeft | Corner::TopRight)
    }
}

/// A transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformHandle {
    /// Corner handle, resizes from the opposite corner.
    Corner(Corner),
    /// Rotation handle above the top edge.
    Rotate,
}

impl TransformHandle {
    /// Hit-test order.
    pub const ALL: [TransformHandle; 5] = [
        TransformHandle::Corner(Corner::TopLeft),
        TransformHandle::Corner(Corner::TopRight),
        TransformHandle::Corner(Corner::BottomLeft),
        TransformHandle::Corner(Corner::BottomRight),
        TransformHandle::Rotate,
    ];
}

/// A handle with its pixel position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    pub position: Point,
    pub kind: TransformHandle,
}

impl Handle {
    /// Check if a pixel position hits this handle.
    pub fn hit_test(&self, point: Point, radius: f64) -> bool {
        self.position.distance(point) <= radius
    }
}

/// Pixel positions of the handles around `bounds`.
pub fn handle_positions(bounds: &NormalizedRect, canvas: &CanvasMetrics, rotate_offset_px: f64) -> [Handle; 5] {
    let rect = bounds.to_pixels(canvas);
    let position = |kind: TransformHandle| match kind {
        TransformHandle::Corner(Corner::TopLeft) => Point::new(rect.x0, rect.y0),
        TransformHandle::Corner(Corner::TopRight) => Point::new(rect.x1, rect.y0),
        TransformHandle::Corner(Corner::BottomLeft) => Point::new(rect.x0, rect.y1),
        TransformHandle::Corner(Corner::BottomRight) => Point::new(rect.x1, rect.y1),
        TransformHandle::Rotate => Point::new((rect.x0 + rect.x1) / 2.0, rect.y0 - rotate_offset_px),
    };
    TransformHandle::ALL.map(|kind| Handle { position: position(kind), kind })
}

/// The first handle of `target` within `radius_px` of a pixel position.
pub fn hit_test_handles(
    target: &TransformTarget,
    pixel: Point,
    canvas: &CanvasMetrics,
    radius_px: f64,
    rotate_offset_px: f64,
) -> Option<TransformHandle> {
    handle_positions(&target.bounds, canvas, rotate_offset_px)
        .into_iter()
        .find(|handle| handle.hit_test(pixel, radius_px))
        .map(|handle| handle.kind)
}

/// Id of the first text box containing `point`.
pub fn find_text_hit<'a>(page: &'a Page, point: Point) -> Option<&'a str> {
    page.text_items
        .iter()
        .find(|item| item.rect().contains(point))
        .map(|item| item.id.as_str())
}

/// Everything a transform step needs besides the page.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub config: &'a EditorConfig,
    pub measurer: &'a dyn TextMeasurer,
    pub canvas: Option<&'a CanvasMetrics>,
}

impl TransformContext<'_> {
    fn snap(&self, value: f64) -> Option<SnapCandidate> {
        find_snap_candidate(value, &self.config.snap_guides, self.config.snap_threshold)
    }
}

/// Result of one transform step.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    /// The target with its new bounds or rotation.
    pub target: TransformTarget,
    pub guides: SnapGuides,
}

/// Apply a handle drag to the page.
///
/// `start` is the target captured when the drag began: the anchor corner and
/// the original size always come from it, so the result depends only on the
/// current pointer position. Returns `None` if the target no longer exists.
pub fn apply_transform(
    handle: TransformHandle,
    position: Point,
    start: &TransformTarget,
    page: &mut Page,
    ctx: &TransformContext<'_>,
) -> Option<TransformOutcome> {
    match handle {
        TransformHandle::Rotate => rotate(position, start, page),
        TransformHandle::Corner(corner) => match start.kind {
            TransformKind::Text => resize_text(corner, position, start, page, ctx),
            TransformKind::Image => resize_image(corner, position, start, page, ctx),
        },
    }
}

fn rotate(position: Point, start: &TransformTarget, page: &mut Page) -> Option<TransformOutcome> {
    let center = start.bounds.center();
    // Handle sits above the box, so pointing straight up is 0 degrees.
    let rotation = (position.y - center.y).atan2(position.x - center.x).to_degrees() + 90.0;
    match start.kind {
        TransformKind::Text => {
            page.text_items.iter_mut().find(|t| t.id == start.id)?.rotation = rotation;
        }
        TransformKind::Image => {
            page.image_items.iter_mut().find(|i| i.id == start.id)?.rotation = rotation;
        }
    }
    Some(TransformOutcome {
        target: TransformTarget { rotation, ..start.clone() },
        guides: SnapGuides::none(),
    })
}

/// Shift a span of `size` starting at `start` so it lies inside `[0,1]`.
fn shift_into_page(start: f64, size: f64) -> (f64, f64) {
    let mut lo = start;
    let mut hi = start + size;
    if lo < 0.0 {
        lo = 0.0;
        hi = size;
    }
    if hi > 1.0 {
        hi = 1.0;
        lo = 1.0 - size;
    }
    (lo, hi)
}

fn resize_text(
    corner: Corner,
    position: Point,
    start: &TransformTarget,
    page: &mut Page,
    ctx: &TransformContext<'_>,
) -> Option<TransformOutcome> {
    let min_size = ctx.config.min_transform_size;
    let index = page.text_items.iter().position(|t| t.id == start.id)?;
    let (text, font_size_sp) = {
        let item = &page.text_items[index];
        (item.text.clone(), item.font_size_sp)
    };
    let measure = |width: f64| {
        text_height_normalized(ctx.measurer, &text, font_size_sp, width, ctx.canvas).max(min_size)
    };

    let moves_left = corner.moves_left();
    let moves_top = corner.moves_top();
    let bounds = start.bounds;
    let mut guides = SnapGuides::none();

    let (mut left, mut right) = if moves_left {
        (position.x, bounds.right)
    } else {
        (bounds.left, position.x)
    };
    let mut width = (right - left).clamp(min_size, 1.0);
    if moves_left {
        left = right - width;
    } else {
        right = left + width;
    }
    (left, right) = shift_into_page(left, width);

    // Text boxes take the height their content needs at the new width.
    let mut height = measure(width);
    let (mut top, mut bottom) = if moves_top {
        (position.y, position.y + height)
    } else {
        (position.y - height, position.y)
    };
    if height > 1.0 {
        height = 1.0;
        top = 0.0;
        bottom = 1.0;
    } else {
        (top, bottom) = shift_into_page(top, height);
    }

    let moving_x = if moves_left { left } else { right };
    if let Some(snap) = ctx.snap(moving_x) {
        if moves_left {
            left += snap.offset;
        } else {
            right += snap.offset;
        }
        width = (right - left).clamp(min_size, 1.0);
        if moves_left {
            left = right - width;
        } else {
            right = left + width;
        }
        height = measure(width);
        if moves_top {
            bottom = top + height;
        } else {
            top = bottom - height;
        }
        guides.verticals = vec![snap.guide];
    }

    let moving_y = if moves_top { top } else { bottom };
    if let Some(snap) = ctx.snap(moving_y) {
        if moves_top {
            top += snap.offset;
            bottom = top + height;
        } else {
            bottom += snap.offset;
            top = bottom - height;
        }
        guides.horizontals = vec![snap.guide];
    }

    (top, bottom) = shift_into_page(top, height);
    left = left.clamp(0.0, (1.0 - width).max(0.0));
    right = left + width;

    let item = &mut page.text_items[index];
    item.x = left;
    item.y = top;
    item.width = width;
    item.height = height;
    item.rotation = start.rotation;

    Some(TransformOutcome {
        target: TransformTarget { bounds: NormalizedRect::new(left, top, right, bottom), ..start.clone() },
        guides,
    })
}

/// Place a span of `size` against `anchor`, growing away from it.
fn span_from_anchor(anchor: f64, size: f64, grows_backward: bool) -> (f64, f64) {
    if grows_backward { (anchor - size, anchor) } else { (anchor, anchor + size) }
}

fn resize_image(
    corner: Corner,
    position: Point,
    start: &TransformTarget,
    page: &mut Page,
    ctx: &TransformContext<'_>,
) -> Option<TransformOutcome> {
    let min_size = ctx.config.min_transform_size;
    let index = page.image_items.iter().position(|i| i.id == start.id)?;

    let moves_left = corner.moves_left();
    let moves_top = corner.moves_top();
    let bounds = start.bounds;
    let start_width = bounds.width().max(min_size);
    let start_height = bounds.height().max(min_size);
    let ratio = start_width / start_height;
    let anchor_x = if moves_left { bounds.right } else { bounds.left };
    let anchor_y = if moves_top { bounds.bottom } else { bounds.top };

    // Uniform scale driven by whichever axis was dragged further.
    let scale_x = (position.x - anchor_x).abs() / start_width;
    let scale_y = (position.y - anchor_y).abs() / start_height;
    let min_scale = (min_size / start_width).max(min_size / start_height);
    let max_scale = (1.0 / start_width).min(1.0 / start_height);
    let scale = scale_x.max(scale_y).max(min_scale).min(max_scale);
    let mut width = (start_width * scale).max(min_size);
    let mut height = (start_height * scale).max(min_size);

    let (mut left, mut right) = span_from_anchor(anchor_x, width, moves_left);
    let (mut top, mut bottom) = span_from_anchor(anchor_y, height, moves_top);
    let mut guides = SnapGuides::none();

    let snap_x = ctx.snap(if moves_left { left } else { right });
    let snap_y = ctx.snap(if moves_top { top } else { bottom });
    let use_x = match (snap_x, snap_y) {
        (Some(x), Some(y)) => x.offset.abs() <= y.offset.abs(),
        (Some(_), None) => true,
        _ => false,
    };

    let snapped = match (use_x, snap_x, snap_y) {
        (true, Some(snap), _) => {
            let edge = (if moves_left { left } else { right }) + snap.offset;
            width = (edge - anchor_x).abs().max(min_size);
            height = width / ratio;
            guides.verticals = vec![snap.guide];
            true
        }
        (false, _, Some(snap)) => {
            let edge = (if moves_top { top } else { bottom }) + snap.offset;
            height = (edge - anchor_y).abs().max(min_size);
            width = height * ratio;
            guides.horizontals = vec![snap.guide];
            true
        }
        _ => false,
    };
    if snapped {
        // Never let the snapped size outgrow the page.
        let fit = (1.0 / width).min(1.0 / height);
        if fit < 1.0 {
            width *= fit;
            height *= fit;
        }
        (left, right) = span_from_anchor(anchor_x, width, moves_left);
        (top, bottom) = span_from_anchor(anchor_y, height, moves_top);
    }

    (left, right) = shift_into_page(left, width);
    (top, bottom) = shift_into_page(top, height);

    let item = &mut page.image_items[index];
    item.x = left;
    item.y = top;
    item.width = right - left;
    item.height = bottom - top;
    item.rotation = start.rotation;

    Some(TransformOutcome {
        target: TransformTarget { bounds: NormalizedRect::new(left, top, right, bottom), ..start.clone() },
        guides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageItem, PaperStyle, Stroke, TextItem, Tool};
    use crate::text::ApproxTextMeasurer;

    fn text_item(id: &str, x: f64, y: f64, w: f64, h: f64) -> TextItem {
        TextItem {
            id: id.into(),
            text: "note".into(),
            x,
            y,
            width: w,
            height: h,
            font_size_sp: 20.0,
            color: 0xFF000000,
            rotation: 0.0,
        }
    }

    fn image_item(id: &str, x: f64, y: f64, w: f64, h: f64) -> ImageItem {
        ImageItem { id: id.into(), path: "a.png".into(), x, y, width: w, height: h, rotation: 0.0 }
    }

    fn polygon_around(center: Point, radius: f64) -> Vec<Point> {
        (0..12)
            .map(|i| {
                let a = i as f64 / 12.0 * std::f64::consts::TAU;
                Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect()
    }

    #[test]
    fn test_lasso_selects_by_center_sample() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("t", 0.4, 0.4, 0.2, 0.2));
        let lasso = polygon_around(Point::new(0.5, 0.5), 0.05);
        let selection = select_within_lasso(&lasso, &page);
        assert!(selection.texts.contains("t"));
    }

    #[test]
    fn test_lasso_misses_box_without_samples_inside() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("t", 0.4, 0.4, 0.2, 0.2));
        // Covers the top edge between the corners but not the center.
        let lasso = polygon_around(Point::new(0.5, 0.4), 0.05);
        assert!(select_within_lasso(&lasso, &page).is_empty());
    }

    #[test]
    fn test_lasso_needs_three_points() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("t", 0.4, 0.4, 0.2, 0.2));
        let lasso = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(select_within_lasso(&lasso, &page).is_empty());
    }

    #[test]
    fn test_lasso_selects_strokes_by_any_point() {
        let mut page = Page::new(1, PaperStyle::Blank);
        let inside = Stroke::new(Tool::Pen, 0, 2.0, vec![Point::new(0.0, 0.0), Point::new(0.5, 0.5)]);
        let outside = Stroke::new(Tool::Pen, 0, 2.0, vec![Point::new(0.0, 0.0), Point::new(0.1, 0.1)]);
        let inside_id = inside.id.clone();
        page.strokes = vec![inside, outside];
        let selection = select_within_lasso(&polygon_around(Point::new(0.5, 0.5), 0.1), &page);
        assert_eq!(selection.strokes, HashSet::from([inside_id]));
    }

    #[test]
    fn test_selection_bounds_union_and_clamp() {
        let mut page = Page::new(1, PaperStyle::Blank);
        let stroke = Stroke::new(Tool::Pen, 0, 2.0, vec![Point::new(0.125, 0.25), Point::new(0.375, 0.3)]);
        let mut selection = SelectionIds::image("i");
        selection.strokes.insert(stroke.id.clone());
        page.strokes.push(stroke);
        page.image_items.push(image_item("i", 0.5, 0.75, 0.25, 0.5));

        let bounds = selection_bounds(&page, &selection).unwrap();
        assert_eq!(bounds, NormalizedRect::new(0.125, 0.25, 0.75, 1.0));
        assert!(selection_bounds(&page, &SelectionIds::default()).is_none());
    }

    #[test]
    fn test_transform_target_rules() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("t", 0.125, 0.125, 0.25, 0.125));
        page.image_items.push(image_item("i", 0.5, 0.5, 0.2, 0.2));

        let target = transform_target(&SelectionIds::text("t"), &page).unwrap();
        assert_eq!(target.kind, TransformKind::Text);
        assert_eq!(target.bounds, NormalizedRect::new(0.125, 0.125, 0.375, 0.25));

        let mut mixed = SelectionIds::text("t");
        mixed.images.insert("i".into());
        assert!(transform_target(&mixed, &page).is_none());

        let mut with_ink = SelectionIds::image("i");
        with_ink.strokes.insert("s".into());
        assert!(transform_target(&with_ink, &page).is_none());

        assert!(transform_target(&SelectionIds::image("gone"), &page).is_none());
    }

    #[test]
    fn test_handle_hit_order() {
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        let target = TransformTarget {
            kind: TransformKind::Image,
            id: "i".into(),
            bounds: NormalizedRect::new(0.2, 0.2, 0.4, 0.4),
            rotation: 0.0,
        };
        let hit = |x, y| hit_test_handles(&target, Point::new(x, y), &canvas, 18.0, 28.0);
        assert_eq!(hit(205.0, 205.0), Some(TransformHandle::Corner(Corner::TopLeft)));
        assert_eq!(hit(400.0, 390.0), Some(TransformHandle::Corner(Corner::BottomRight)));
        assert_eq!(hit(300.0, 172.0), Some(TransformHandle::Rotate));
        assert_eq!(hit(300.0, 300.0), None);
    }

    fn context<'a>(config: &'a EditorConfig, measurer: &'a ApproxTextMeasurer, canvas: &'a CanvasMetrics) -> TransformContext<'a> {
        TransformContext { config, measurer, canvas: Some(canvas) }
    }

    #[test]
    fn test_rotate_handle_angle() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.image_items.push(image_item("i", 0.4, 0.4, 0.2, 0.2));
        let target = transform_target(&SelectionIds::image("i"), &page).unwrap();
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        let ctx = context(&config, &measurer, &canvas);

        // Straight right of the center is a quarter turn.
        let outcome = apply_transform(TransformHandle::Rotate, Point::new(0.9, 0.5), &target, &mut page, &ctx).unwrap();
        assert!((outcome.target.rotation - 90.0).abs() < 1e-9);
        assert!((page.image_items[0].rotation - 90.0).abs() < 1e-9);

        let outcome = apply_transform(TransformHandle::Rotate, Point::new(0.5, 0.1), &target, &mut page, &ctx).unwrap();
        assert!(outcome.target.rotation.abs() < 1e-9);
    }

    #[test]
    fn test_image_resize_preserves_ratio() {
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(1000.0, 1400.0, 2.0);
        let ctx = context(&config, &measurer, &canvas);
        let ratio = 0.3 / 0.2;

        let drags = [
            (Corner::BottomRight, Point::new(0.83, 0.61)),
            (Corner::BottomRight, Point::new(0.993, 0.2)),
            (Corner::TopLeft, Point::new(0.05, 0.12)),
            (Corner::TopRight, Point::new(0.49, 0.33)),
            (Corner::BottomLeft, Point::new(0.0, 1.0)),
            (Corner::TopLeft, Point::new(0.299, 0.31)),
            (Corner::BottomRight, Point::new(0.31, 0.31)),
        ];
        for (corner, position) in drags {
            let mut page = Page::new(1, PaperStyle::Blank);
            page.image_items.push(image_item("i", 0.3, 0.3, 0.3, 0.2));
            let target = transform_target(&SelectionIds::image("i"), &page).unwrap();
            apply_transform(TransformHandle::Corner(corner), position, &target, &mut page, &ctx).unwrap();

            let item = &page.image_items[0];
            assert!((item.width / item.height - ratio).abs() < 1e-9, "{corner:?} {position:?}: {item:?}");
            assert!(item.x >= -1e-12 && item.y >= -1e-12);
            assert!(item.x + item.width <= 1.0 + 1e-12 && item.y + item.height <= 1.0 + 1e-12);
            assert!(item.width >= config.min_transform_size - 1e-12);
        }
    }

    #[test]
    fn test_image_resize_snaps_edge() {
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        let ctx = context(&config, &measurer, &canvas);

        let mut page = Page::new(1, PaperStyle::Blank);
        page.image_items.push(image_item("i", 0.2, 0.2, 0.2, 0.2));
        let target = transform_target(&SelectionIds::image("i"), &page).unwrap();
        let outcome = apply_transform(
            TransformHandle::Corner(Corner::BottomRight),
            Point::new(0.49, 0.3),
            &target,
            &mut page,
            &ctx,
        )
        .unwrap();
        assert_eq!(outcome.guides.verticals, vec![0.5]);
        let item = &page.image_items[0];
        assert!((item.x + item.width - 0.5).abs() < 1e-9);
        assert!((item.width - item.height).abs() < 1e-9);
        assert_eq!((item.x, item.y), (0.2, 0.2));
    }

    #[test]
    fn test_text_resize_tracks_content_height() {
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        let ctx = context(&config, &measurer, &canvas);

        let mut page = Page::new(1, PaperStyle::Blank);
        let mut item = text_item("t", 0.1, 0.1, 0.45, 0.05);
        item.text = "a long line of handwritten looking text ".repeat(4);
        page.text_items.push(item);
        let target = transform_target(&SelectionIds::text("t"), &page).unwrap();

        let outcome = apply_transform(
            TransformHandle::Corner(Corner::BottomRight),
            Point::new(0.3, 0.98),
            &target,
            &mut page,
            &ctx,
        )
        .unwrap();
        let item = &page.text_items[0];
        assert!((item.width - 0.2).abs() < 1e-9);
        let expected = text_height_normalized(&measurer, &item.text, 20.0, item.width, Some(&canvas));
        assert!((item.height - expected.max(config.min_transform_size)).abs() < 1e-9);
        assert!(item.y + item.height <= 1.0 + 1e-12);
        assert_eq!(outcome.target.bounds.left, 0.1);
    }

    #[test]
    fn test_text_resize_respects_min_width_and_page() {
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        let ctx = context(&config, &measurer, &canvas);

        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("t", 0.5, 0.5, 0.3, 0.1));
        let target = transform_target(&SelectionIds::text("t"), &page).unwrap();

        // Drag the left edge past the right one.
        apply_transform(TransformHandle::Corner(Corner::TopLeft), Point::new(0.95, 0.2), &target, &mut page, &ctx)
            .unwrap();
        let item = &page.text_items[0];
        assert!((item.width - config.min_transform_size).abs() < 1e-9);
        assert!((item.x + item.width - 0.8).abs() < 1e-9);
        assert!(item.y >= 0.0 && item.y + item.height <= 1.0);
    }

    #[test]
    fn test_transform_of_missing_item() {
        let config = EditorConfig::default();
        let measurer = ApproxTextMeasurer::default();
        let canvas = CanvasMetrics::new(100.0, 100.0, 1.0);
        let ctx = context(&config, &measurer, &canvas);
        let mut page = Page::new(1, PaperStyle::Blank);
        let target = TransformTarget {
            kind: TransformKind::Text,
            id: "gone".into(),
            bounds: NormalizedRect::new(0.1, 0.1, 0.2, 0.2),
            rotation: 0.0,
        };
        let handle = TransformHandle::Corner(Corner::TopLeft);
        assert!(apply_transform(handle, Point::new(0.0, 0.0), &target, &mut page, &ctx).is_none());
    }

    #[test]
    fn test_find_text_hit() {
        let mut page = Page::new(1, PaperStyle::Blank);
        page.text_items.push(text_item("a", 0.1, 0.1, 0.2, 0.1));
        page.text_items.push(text_item("b", 0.15, 0.15, 0.2, 0.1));
        assert_eq!(find_text_hit(&page, Point::new(0.16, 0.16)), Some("a"));
        assert_eq!(find_text_hit(&page, Point::new(0.34, 0.24)), Some("b"));
        assert_eq!(find_text_hit(&page, Point::new(0.9, 0.9)), None);
    }
}
