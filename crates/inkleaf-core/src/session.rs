//! The editing session for one page.
//!
//! [`EditorSession`] owns the page being edited and turns pointer input and
//! commands into page mutations, undo steps and save requests. It performs
//! no I/O: every committed change is queued as a [`SessionEvent`] which the
//! host drains with [`EditorSession::take_events`] and hands to storage.

use crate::config::EditorConfig;
use crate::editing::{
    self, StrokeCapture, TextContext, create_image_item, create_text_item, edit_text_item,
    erase_strokes_at, remeasure_text_items,
};
use crate::geometry::{CanvasMetrics, NormalizedRect, clamp_unit, normalize};
use crate::history::{EditHistory, PageSnapshot};
use crate::model::{Page, PaperStyle, Tool};
use crate::now_millis;
use crate::selection::{
    SelectionIds, TransformContext, TransformHandle, TransformTarget, apply_transform, find_text_hit,
    hit_test_handles, select_within_lasso, selection_bounds, transform_target,
};
use crate::snap::{SnapGuides, snap_delta_for_bounds};
use crate::text::{ApproxTextMeasurer, TextMeasurer};
use kurbo::{Point, Vec2};

/// Something the host has to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The page changed and should be saved. Carries a full snapshot.
    PageChanged(Page),
}

/// What a tap asks the host to do.
#[derive(Debug, Clone, PartialEq)]
pub enum TapOutcome {
    /// Open the text editor for an existing text box.
    EditText(String),
    /// Open the text editor for a new box at this normalized position.
    PlaceText(Point),
    /// Nothing for the host to do.
    Handled,
}

/// Gesture in progress.
#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Drawing,
    Erasing {
        before: PageSnapshot,
    },
    Lasso(Vec<Point>),
    Moving {
        before: PageSnapshot,
        last_px: Point,
    },
    Transforming {
        handle: TransformHandle,
        start: TransformTarget,
        before: PageSnapshot,
    },
}

/// Selection ids plus the geometry derived from them.
#[derive(Debug, Clone, Default)]
struct SelectionState {
    ids: SelectionIds,
    bounds: Option<NormalizedRect>,
    target: Option<TransformTarget>,
}

/// Editing state for a single page.
pub struct EditorSession {
    page: Page,
    config: EditorConfig,
    measurer: Box<dyn TextMeasurer>,
    canvas: Option<CanvasMetrics>,
    tool: Tool,
    color: u32,
    width_dp: f64,
    selection: SelectionState,
    capture: StrokeCapture,
    gesture: Gesture,
    guides: SnapGuides,
    history: EditHistory,
    events: Vec<SessionEvent>,
}

impl EditorSession {
    /// Create a session for `page` using the approximate text measurer.
    pub fn new(page: Page, config: EditorConfig) -> Self {
        Self::with_measurer(page, config, Box::new(ApproxTextMeasurer::default()))
    }

    /// Create a session with a custom text measurer.
    pub fn with_measurer(page: Page, config: EditorConfig, measurer: Box<dyn TextMeasurer>) -> Self {
        let history = EditHistory::with_limit(config.history_limit);
        let width_dp = config.default_tool_width_dp;
        Self {
            page,
            config,
            measurer,
            canvas: None,
            tool: Tool::Pen,
            color: crate::config::DEFAULT_INK,
            width_dp,
            selection: SelectionState::default(),
            capture: StrokeCapture::default(),
            gesture: Gesture::Idle,
            guides: SnapGuides::none(),
            history,
            events: Vec::new(),
        }
    }

    // --- Accessors ---

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn width_dp(&self) -> f64 {
        self.width_dp
    }

    pub fn canvas(&self) -> Option<&CanvasMetrics> {
        self.canvas.as_ref()
    }

    pub fn selection(&self) -> &SelectionIds {
        &self.selection.ids
    }

    pub fn selection_bounds(&self) -> Option<NormalizedRect> {
        self.selection.bounds
    }

    pub fn transform_target(&self) -> Option<&TransformTarget> {
        self.selection.target.as_ref()
    }

    /// Guides to draw while a move or transform snaps.
    pub fn snap_guides(&self) -> &SnapGuides {
        &self.guides
    }

    /// Points of the stroke being drawn.
    pub fn live_stroke(&self) -> &[Point] {
        self.capture.points()
    }

    /// Polygon of the lasso being drawn.
    pub fn live_lasso(&self) -> &[Point] {
        match &self.gesture {
            Gesture::Lasso(points) => points,
            _ => &[],
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drain queued events.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Tool settings ---

    /// Switch tools. Any selection is dropped unless switching to the lasso.
    pub fn set_tool(&mut self, tool: Tool) {
        if tool == self.tool {
            return;
        }
        self.cancel_gesture();
        self.tool = tool;
        if tool != Tool::Lasso {
            self.clear_selection();
        }
    }

    pub fn set_color(&mut self, color: u32) {
        self.color = color;
    }

    /// Set the tool width, clamped to the configured range.
    pub fn set_width(&mut self, width_dp: f64) {
        self.width_dp = self.config.clamp_tool_width(width_dp);
    }

    /// Update the canvas size.
    ///
    /// Text heights depend on the pixel layout, so every text box is
    /// re-measured. That adjustment is saved but is not an undo step.
    pub fn set_canvas(&mut self, canvas: CanvasMetrics) {
        if self.canvas == Some(canvas) {
            return;
        }
        self.canvas = Some(canvas);
        let ctx = TextContext { config: &self.config, measurer: self.measurer.as_ref(), canvas: self.canvas.as_ref() };
        if remeasure_text_items(&mut self.page.text_items, &ctx) {
            log::debug!("Re-measured text on page {}", self.page.id);
            self.clear_selection();
            self.queue_save();
        }
    }

    /// Replace the edited page. Selection, gesture and history are reset.
    pub fn load_page(&mut self, page: Page) {
        self.cancel_gesture();
        self.page = page;
        self.clear_selection();
        self.history.clear();
        if let Some(canvas) = self.canvas.take() {
            self.set_canvas(canvas);
        }
    }

    // --- Pointer dispatch ---

    /// Start a drag at a pixel position. A drag still in progress is closed
    /// first, keeping what it applied.
    pub fn pointer_down(&mut self, pixel: Point) {
        let Some(position) = self.to_page(pixel) else {
            return;
        };
        self.cancel_gesture();
        match self.tool {
            Tool::Pen | Tool::Highlighter => {
                self.capture.begin(position);
                self.gesture = Gesture::Drawing;
            }
            Tool::Eraser => {
                self.begin_erase();
                self.erase_at(position);
            }
            Tool::Lasso => {
                if let Some(handle) = self.hit_handle(pixel) {
                    self.begin_transform(handle);
                } else if self.selection.bounds.is_some_and(|b| b.contains(position)) {
                    self.begin_move(pixel);
                } else {
                    self.gesture = Gesture::Lasso(vec![position]);
                }
            }
            Tool::Text | Tool::Image => {}
        }
    }

    /// Continue a drag.
    pub fn pointer_move(&mut self, pixel: Point) {
        let Some(position) = self.to_page(pixel) else {
            return;
        };
        match &mut self.gesture {
            Gesture::Drawing => self.capture.push(position),
            Gesture::Erasing { .. } => self.erase_at(position),
            Gesture::Lasso(points) => points.push(position),
            Gesture::Moving { last_px, .. } => {
                let delta_px = pixel - *last_px;
                *last_px = pixel;
                self.move_selection(delta_px);
            }
            Gesture::Transforming { handle, .. } => {
                let handle = *handle;
                self.update_transform(handle, position);
            }
            Gesture::Idle => {}
        }
    }

    /// Finish a drag.
    pub fn pointer_up(&mut self) {
        match &self.gesture {
            Gesture::Drawing => self.commit_stroke(),
            Gesture::Erasing { .. } => self.end_erase(),
            Gesture::Lasso(_) => {
                if let Gesture::Lasso(points) = std::mem::take(&mut self.gesture) {
                    self.select_lasso(&points);
                }
            }
            Gesture::Moving { .. } => self.end_move(),
            Gesture::Transforming { .. } => self.end_transform(),
            Gesture::Idle => {}
        }
    }

    /// Abort a drag. Moves and transforms keep what was applied so far.
    pub fn pointer_cancel(&mut self) {
        match &self.gesture {
            Gesture::Moving { .. } => self.end_move(),
            Gesture::Transforming { .. } => self.end_transform(),
            Gesture::Erasing { .. } => self.end_erase(),
            _ => self.cancel_gesture(),
        }
    }

    /// Handle a tap at a pixel position.
    pub fn tap(&mut self, pixel: Point) -> TapOutcome {
        let Some(position) = self.to_page(pixel) else {
            return TapOutcome::Handled;
        };
        match self.tool {
            Tool::Text => match find_text_hit(&self.page, position) {
                Some(id) => TapOutcome::EditText(id.to_string()),
                None => TapOutcome::PlaceText(position),
            },
            Tool::Image | Tool::Lasso => {
                self.clear_selection();
                TapOutcome::Handled
            }
            _ => TapOutcome::Handled,
        }
    }

    // --- Ink ---

    /// Commit the captured stroke. Captures shorter than two points are
    /// dropped.
    pub fn commit_stroke(&mut self) {
        self.gesture = Gesture::Idle;
        let Some(stroke) = self.capture.finish(self.tool, self.color, self.width_dp, &self.config) else {
            return;
        };
        self.clear_selection();
        self.commit(|page| page.strokes.push(stroke));
    }

    /// Start an erase drag. The whole drag becomes one undo step.
    pub fn begin_erase(&mut self) {
        self.gesture = Gesture::Erasing { before: PageSnapshot::capture(&self.page) };
    }

    /// Erase under the eraser at a normalized position.
    pub fn erase_at(&mut self, position: Point) {
        let Some(canvas) = self.canvas.filter(|c| !c.is_empty()) else {
            return;
        };
        let radius_px = canvas.dp(self.width_dp) * self.config.eraser_radius_factor;
        // Outside a drag each erase is its own step.
        let before = match self.gesture {
            Gesture::Erasing { .. } => None,
            _ => Some(PageSnapshot::capture(&self.page)),
        };
        if erase_strokes_at(position, &mut self.page.strokes, radius_px, &canvas) {
            self.clear_selection();
            if let Some(before) = before {
                self.record_from(before);
            }
        }
    }

    pub fn end_erase(&mut self) {
        if let Gesture::Erasing { before } = std::mem::take(&mut self.gesture) {
            self.record_from(before);
        }
    }

    // --- Selection ---

    /// Select everything inside a lasso polygon. An empty result clears
    /// the selection.
    pub fn select_lasso(&mut self, lasso: &[Point]) {
        self.gesture = Gesture::Idle;
        let ids = select_within_lasso(lasso, &self.page);
        self.set_selection(ids);
    }

    /// Replace the selection. Unknown ids are dropped.
    pub fn set_selection(&mut self, mut ids: SelectionIds) {
        ids.retain_existing(&self.page);
        if ids.is_empty() {
            self.clear_selection();
            return;
        }
        self.selection.ids = ids;
        self.refresh_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection = SelectionState::default();
        self.guides = SnapGuides::none();
    }

    // --- Move ---

    /// Start moving the selection from a pixel position.
    pub fn begin_move(&mut self, pixel: Point) {
        if self.selection.ids.is_empty() {
            return;
        }
        self.guides = SnapGuides::none();
        self.gesture = Gesture::Moving { before: PageSnapshot::capture(&self.page), last_px: pixel };
    }

    /// Move the selection by a pixel delta, snapping its bounds to guides.
    pub fn move_selection(&mut self, delta_px: Vec2) {
        let Some(canvas) = self.canvas.filter(|c| !c.is_empty()) else {
            return;
        };
        if self.selection.ids.is_empty() {
            return;
        }
        let delta = Vec2::new(delta_px.x / canvas.width, delta_px.y / canvas.height);
        let (delta, guides) = match &self.selection.bounds {
            Some(bounds) => snap_delta_for_bounds(bounds, delta, &self.config.snap_guides, self.config.snap_threshold),
            None => (delta, SnapGuides::none()),
        };
        editing::apply_delta_to_selection(&mut self.page, &self.selection.ids, delta);
        self.refresh_selection();
        self.guides = guides;
    }

    pub fn end_move(&mut self) {
        if let Gesture::Moving { before, .. } = std::mem::take(&mut self.gesture) {
            self.record_from(before);
        }
        self.guides = SnapGuides::none();
    }

    // --- Transform ---

    /// Start dragging a handle of the current transform target.
    pub fn begin_transform(&mut self, handle: TransformHandle) {
        let Some(start) = self.selection.target.clone() else {
            return;
        };
        self.guides = SnapGuides::none();
        self.gesture = Gesture::Transforming { handle, start, before: PageSnapshot::capture(&self.page) };
    }

    /// Move the dragged handle to a normalized position.
    pub fn update_transform(&mut self, handle: TransformHandle, position: Point) {
        let Gesture::Transforming { start, .. } = &self.gesture else {
            return;
        };
        let ctx = TransformContext { config: &self.config, measurer: self.measurer.as_ref(), canvas: self.canvas.as_ref() };
        let Some(outcome) = apply_transform(handle, position, start, &mut self.page, &ctx) else {
            return;
        };
        self.selection.bounds = selection_bounds(&self.page, &self.selection.ids);
        self.selection.target = Some(outcome.target);
        self.guides = outcome.guides;
    }

    pub fn end_transform(&mut self) {
        if let Gesture::Transforming { before, .. } = std::mem::take(&mut self.gesture) {
            self.record_from(before);
        }
        self.guides = SnapGuides::none();
    }

    // --- Commands on the selection ---

    /// Duplicate the selection with the configured offset. The selection
    /// is cleared afterwards.
    pub fn duplicate_selection(&mut self) {
        if self.selection.ids.is_empty() {
            return;
        }
        let ids = std::mem::take(&mut self.selection.ids);
        let offset = self.config.duplicate_offset;
        self.clear_selection();
        self.commit(|page| {
            editing::duplicate_selection(page, &ids, offset);
        });
    }

    pub fn delete_selection(&mut self) {
        if self.selection.ids.is_empty() {
            return;
        }
        let ids = std::mem::take(&mut self.selection.ids);
        self.clear_selection();
        self.commit(|page| editing::delete_selection(page, &ids));
    }

    // --- Text and images ---

    /// Add a text box at a normalized position. Blank text is ignored.
    pub fn add_text(&mut self, at: Point, text: &str, font_size_sp: f64, color: u32) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let ctx = TextContext { config: &self.config, measurer: self.measurer.as_ref(), canvas: self.canvas.as_ref() };
        let item = create_text_item(clamp_unit(at), text, font_size_sp, color, &ctx);
        let id = item.id.clone();
        self.clear_selection();
        self.commit(|page| page.text_items.push(item));
        Some(id)
    }

    /// Change an existing text box. Blank text or an unknown id is ignored.
    pub fn edit_text(&mut self, id: &str, text: &str, font_size_sp: f64, color: u32) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let Some(index) = self.page.text_items.iter().position(|t| t.id == id) else {
            return false;
        };
        let mut item = self.page.text_items[index].clone();
        let ctx = TextContext { config: &self.config, measurer: self.measurer.as_ref(), canvas: self.canvas.as_ref() };
        edit_text_item(&mut item, text, font_size_sp, color, &ctx);
        self.clear_selection();
        self.commit(|page| page.text_items[index] = item)
    }

    /// Place an imported image centered on the page. Returns its id.
    pub fn insert_image(&mut self, path: &str, intrinsic_width: u32, intrinsic_height: u32) -> String {
        let item = create_image_item(path, intrinsic_width, intrinsic_height, &self.config);
        let id = item.id.clone();
        self.clear_selection();
        self.commit(|page| page.image_items.push(item));
        id
    }

    // --- Page ---

    pub fn set_paper_style(&mut self, style: PaperStyle) {
        self.commit(|page| page.paper_style = style);
    }

    pub fn set_background(&mut self, path: Option<String>) {
        self.commit(|page| page.background_path = path);
    }

    // --- History ---

    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        if !self.history.undo(&mut self.page) {
            return false;
        }
        self.clear_selection();
        self.queue_save();
        true
    }

    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        if !self.history.redo(&mut self.page) {
            return false;
        }
        self.clear_selection();
        self.queue_save();
        true
    }

    // --- Internals ---

    fn to_page(&self, pixel: Point) -> Option<Point> {
        let canvas = self.canvas.filter(|c| !c.is_empty())?;
        Some(clamp_unit(normalize(pixel, &canvas)))
    }

    fn hit_handle(&self, pixel: Point) -> Option<TransformHandle> {
        let target = self.selection.target.as_ref()?;
        let canvas = self.canvas.as_ref()?;
        hit_test_handles(
            target,
            pixel,
            canvas,
            canvas.dp(self.config.handle_radius_dp),
            canvas.dp(self.config.rotate_handle_offset_dp),
        )
    }

    fn refresh_selection(&mut self) {
        self.selection.ids.retain_existing(&self.page);
        self.selection.bounds = selection_bounds(&self.page, &self.selection.ids);
        self.selection.target = transform_target(&self.selection.ids, &self.page);
    }

    fn cancel_gesture(&mut self) {
        self.capture.cancel();
        match std::mem::take(&mut self.gesture) {
            Gesture::Erasing { before } | Gesture::Moving { before, .. } | Gesture::Transforming { before, .. } => {
                self.record_from(before);
            }
            _ => {}
        }
        self.guides = SnapGuides::none();
    }

    /// Apply a mutation as one undo step and queue a save if it changed
    /// anything.
    fn commit<F>(&mut self, mutation: F) -> bool
    where
        F: FnOnce(&mut Page),
    {
        let changed = self.history.record_change(&mut self.page, mutation);
        if changed {
            self.queue_save();
        }
        changed
    }

    /// Record the change since `before` as one undo step.
    fn record_from(&mut self, before: PageSnapshot) {
        let after = PageSnapshot::capture(&self.page);
        if self.history.record(before, after) {
            self.queue_save();
        }
    }

    fn queue_save(&mut self) {
        self.page.updated_at = now_millis().max(self.page.updated_at + 1);
        self.events.push(SessionEvent::PageChanged(self.page.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stroke, TextItem};
    use crate::selection::Corner;

    fn canvas() -> CanvasMetrics {
        CanvasMetrics::new(1000.0, 1000.0, 1.0)
    }

    fn session() -> EditorSession {
        let mut session = EditorSession::new(Page::new(1, PaperStyle::Blank), EditorConfig::default());
        session.set_canvas(canvas());
        session
    }

    fn horizontal_stroke(y: f64) -> Stroke {
        let points = (0..=10).map(|i| Point::new(0.1 + 0.08 * i as f64, y)).collect();
        Stroke::new(Tool::Pen, 0xFF000000, 3.5, points)
    }

    fn saves(session: &mut EditorSession) -> usize {
        session.take_events().len()
    }

    #[test]
    fn test_draw_stroke_commits_once() {
        let mut s = session();
        s.pointer_down(Point::new(100.0, 100.0));
        s.pointer_move(Point::new(200.0, 150.0));
        s.pointer_move(Point::new(300.0, 200.0));
        assert_eq!(s.live_stroke().len(), 3);
        s.pointer_up();

        assert_eq!(s.page().strokes.len(), 1);
        assert_eq!(s.page().strokes[0].points[0], Point::new(0.1, 0.1));
        assert!(s.can_undo());
        let events = s.take_events();
        assert_eq!(events.len(), 1);
        let SessionEvent::PageChanged(saved) = &events[0];
        assert_eq!(saved.strokes.len(), 1);
    }

    #[test]
    fn test_single_point_stroke_dropped() {
        let mut s = session();
        s.pointer_down(Point::new(100.0, 100.0));
        s.pointer_up();
        assert!(s.page().strokes.is_empty());
        assert!(!s.can_undo());
        assert_eq!(saves(&mut s), 0);
    }

    #[test]
    fn test_pointer_ignored_without_canvas() {
        let mut s = EditorSession::new(Page::new(1, PaperStyle::Blank), EditorConfig::default());
        s.pointer_down(Point::new(10.0, 10.0));
        s.pointer_move(Point::new(20.0, 20.0));
        s.pointer_up();
        assert!(s.page().strokes.is_empty());
    }

    #[test]
    fn test_highlighter_alpha_baked() {
        let mut s = session();
        s.set_tool(Tool::Highlighter);
        s.set_color(0xFF112233);
        s.pointer_down(Point::new(100.0, 100.0));
        s.pointer_move(Point::new(200.0, 100.0));
        s.pointer_up();
        assert_eq!(s.page().strokes[0].color, 0x66112233);
    }

    #[test]
    fn test_erase_drag_is_one_undo_step() {
        let mut s = session();
        let stroke = horizontal_stroke(0.5);
        s.commit(|p| p.strokes.push(stroke.clone()));
        s.take_events();

        s.set_tool(Tool::Eraser);
        s.pointer_down(Point::new(260.0, 500.0));
        s.pointer_move(Point::new(500.0, 500.0));
        s.pointer_move(Point::new(740.0, 500.0));
        s.pointer_up();

        assert!(s.page().strokes.len() > 1);
        assert_eq!(saves(&mut s), 1);
        assert_eq!(s.history.undo_len(), 2);
        assert!(s.undo());
        assert_eq!(s.page().strokes, vec![stroke]);
    }

    #[test]
    fn test_missed_pointer_up_keeps_erase_step() {
        let mut s = session();
        let stroke = horizontal_stroke(0.5);
        s.commit(|p| p.strokes.push(stroke.clone()));
        s.take_events();

        s.set_tool(Tool::Eraser);
        s.pointer_down(Point::new(500.0, 500.0));
        let erased = s.page().strokes.clone();
        assert_ne!(erased, vec![stroke.clone()]);
        // No pointer_up before the next drag starts.
        s.pointer_down(Point::new(500.0, 900.0));
        s.pointer_up();

        assert_eq!(saves(&mut s), 1);
        assert_eq!(s.history.undo_len(), 2);
        assert!(s.undo());
        assert_eq!(s.page().strokes, vec![stroke]);
    }

    #[test]
    fn test_missed_pointer_up_keeps_move_step() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        let strokes = s.page().strokes.iter().map(|st| st.id.clone()).collect();
        s.set_tool(Tool::Lasso);
        s.set_selection(SelectionIds { strokes, ..SelectionIds::default() });
        s.take_events();

        s.pointer_down(Point::new(500.0, 500.0));
        s.pointer_move(Point::new(500.0, 600.0));
        s.pointer_down(Point::new(50.0, 50.0));

        assert_eq!(saves(&mut s), 1);
        assert_eq!(s.history.undo_len(), 2);
        assert!((s.page().strokes[0].points[0].y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_add_text_before_canvas_fits_page() {
        let mut s = EditorSession::new(Page::new(1, PaperStyle::Blank), EditorConfig::default());
        let id = s.add_text(Point::new(0.5, 0.5), "a\nb\nc\nd\ne\nf\ng\nh", 30.0, 0xFF000000).unwrap();
        let item = s.page().text_item(&id).unwrap();
        assert!(item.y >= 0.0);
        assert!(item.y + item.height <= 1.0 + 1e-12, "{item:?}");
    }

    #[test]
    fn test_erase_outside_drag_is_own_step() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        s.set_width(3.5);
        s.erase_at(Point::new(0.5, 0.5));
        assert_eq!(s.history.undo_len(), 2);
    }

    #[test]
    fn test_erase_undo_restores_original() {
        let mut s = session();
        let stroke = horizontal_stroke(0.5);
        s.commit(|p| p.strokes.push(stroke.clone()));

        s.set_tool(Tool::Eraser);
        s.pointer_down(Point::new(500.0, 500.0));
        s.pointer_up();
        assert!(s.page().strokes.iter().all(|st| st.id != stroke.id));

        assert!(s.undo());
        assert_eq!(s.page().strokes, vec![stroke]);
    }

    #[test]
    fn test_erase_miss_records_nothing() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        s.take_events();
        s.set_tool(Tool::Eraser);
        s.pointer_down(Point::new(500.0, 900.0));
        s.pointer_up();
        assert_eq!(saves(&mut s), 0);
        assert_eq!(s.history.undo_len(), 1);
    }

    #[test]
    fn test_lasso_select_and_move_undo() {
        let mut s = session();
        let text = TextItem {
            id: "t1".into(),
            text: "hello".into(),
            x: 0.25,
            y: 0.25,
            width: 0.25,
            height: 0.125,
            font_size_sp: 20.0,
            color: 0xFF000000,
            rotation: 0.0,
        };
        s.commit(|p| p.text_items.push(text.clone()));
        s.set_tool(Tool::Lasso);

        s.pointer_down(Point::new(200.0, 200.0));
        s.pointer_move(Point::new(600.0, 200.0));
        s.pointer_move(Point::new(600.0, 450.0));
        s.pointer_move(Point::new(200.0, 450.0));
        s.pointer_up();
        assert!(s.selection().texts.contains("t1"));
        assert!(s.transform_target().is_some());
        s.take_events();

        // Drag from the middle of the box moves it.
        s.pointer_down(Point::new(375.0, 312.0));
        s.pointer_move(Point::new(475.0, 312.0));
        s.pointer_up();
        let moved = &s.page().text_items[0];
        assert!((moved.x - 0.35).abs() < 1e-9);
        assert_eq!(saves(&mut s), 1);

        assert!(s.undo());
        assert_eq!(s.page().text_items[0], text);
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_empty_lasso_clears_selection() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        let id = s.page().strokes[0].id.clone();
        s.set_tool(Tool::Lasso);
        s.set_selection(SelectionIds { strokes: [id].into(), ..SelectionIds::default() });
        assert!(!s.selection().is_empty());
        s.select_lasso(&[Point::new(0.0, 0.0), Point::new(0.05, 0.0), Point::new(0.0, 0.05)]);
        assert!(s.selection().is_empty());
        assert!(s.selection_bounds().is_none());
    }

    #[test]
    fn test_tool_change_clears_selection() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        let id = s.page().strokes[0].id.clone();
        s.set_tool(Tool::Lasso);
        s.set_selection(SelectionIds { strokes: [id].into(), ..SelectionIds::default() });
        s.set_tool(Tool::Pen);
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_transform_resize_is_one_step() {
        let mut s = session();
        s.set_tool(Tool::Lasso);
        let id = s.insert_image("a.png", 100, 100);
        s.set_selection(SelectionIds::image(id.clone()));
        s.take_events();
        let start = s.transform_target().cloned().unwrap();

        s.begin_transform(TransformHandle::Corner(Corner::BottomRight));
        let far = Point::new(start.bounds.right + 0.05, start.bounds.bottom + 0.05);
        s.update_transform(TransformHandle::Corner(Corner::BottomRight), far);
        s.end_transform();

        assert_eq!(saves(&mut s), 1);
        assert_ne!(s.page().image_item(&id).unwrap().rect(), start.bounds);
        assert!(s.undo());
        assert_eq!(s.page().image_item(&id).unwrap().rect(), start.bounds);
    }

    #[test]
    fn test_insert_image_centered() {
        let mut s = session();
        let id = s.insert_image("a.png", 200, 100);
        assert_eq!(saves(&mut s), 1);
        let item = s.page().image_item(&id).unwrap();
        assert!((item.width - 0.6).abs() < 1e-12);
        assert!((item.height - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_and_delete() {
        let mut s = session();
        s.commit(|p| p.strokes.push(horizontal_stroke(0.5)));
        let id = s.page().strokes[0].id.clone();
        s.set_tool(Tool::Lasso);
        s.set_selection(SelectionIds { strokes: [id.clone()].into(), ..SelectionIds::default() });
        s.duplicate_selection();
        assert_eq!(s.page().strokes.len(), 2);
        assert!(s.selection().is_empty());

        s.set_selection(SelectionIds { strokes: [id].into(), ..SelectionIds::default() });
        s.delete_selection();
        assert_eq!(s.page().strokes.len(), 1);
        assert!(s.undo());
        assert_eq!(s.page().strokes.len(), 2);
    }

    #[test]
    fn test_text_tap_outcomes() {
        let mut s = session();
        s.set_tool(Tool::Text);
        assert_eq!(s.tap(Point::new(100.0, 200.0)), TapOutcome::PlaceText(Point::new(0.1, 0.2)));

        let id = s.add_text(Point::new(0.1, 0.2), "note", 20.0, 0xFF000000).unwrap();
        assert_eq!(s.tap(Point::new(110.0, 210.0)), TapOutcome::EditText(id.clone()));

        assert!(s.add_text(Point::new(0.1, 0.2), "   ", 20.0, 0xFF000000).is_none());
        assert!(!s.edit_text(&id, "", 20.0, 0xFF000000));
        assert!(s.edit_text(&id, "changed", 24.0, 0xFF000000));
        assert_eq!(s.page().text_item(&id).unwrap().text, "changed");
    }

    #[test]
    fn test_no_op_commands_queue_nothing() {
        let mut s = session();
        s.set_paper_style(PaperStyle::Blank);
        s.set_background(None);
        s.duplicate_selection();
        s.delete_selection();
        assert!(!s.undo());
        assert!(!s.redo());
        assert_eq!(saves(&mut s), 0);
    }

    #[test]
    fn test_paper_style_undo_redo_saves() {
        let mut s = session();
        s.set_paper_style(PaperStyle::Grid);
        assert!(s.undo());
        assert_eq!(s.page().paper_style, PaperStyle::Blank);
        assert!(s.redo());
        assert_eq!(s.page().paper_style, PaperStyle::Grid);
        assert_eq!(saves(&mut s), 3);
    }

    #[test]
    fn test_canvas_resize_remeasures_without_history() {
        let mut s = EditorSession::new(Page::new(1, PaperStyle::Blank), EditorConfig::default());
        s.add_text(Point::new(0.1, 0.1), "a b c d e f g h i j k l m n o p", 20.0, 0xFF000000);
        let before = s.page().text_items[0].height;
        s.take_events();
        let undo_len = s.history.undo_len();

        s.set_canvas(CanvasMetrics::new(300.0, 400.0, 1.0));
        assert_ne!(s.page().text_items[0].height, before);
        assert_eq!(s.history.undo_len(), undo_len);
        assert_eq!(saves(&mut s), 1);

        s.set_canvas(CanvasMetrics::new(300.0, 400.0, 1.0));
        assert_eq!(saves(&mut s), 0);
    }

    #[test]
    fn test_load_page_clears_history() {
        let mut s = session();
        s.set_paper_style(PaperStyle::Dot);
        s.load_page(Page::new(2, PaperStyle::Lined));
        assert!(!s.can_undo());
        assert_eq!(s.page().index, 2);
    }

    #[test]
    fn test_updated_at_increases() {
        let mut s = session();
        s.set_paper_style(PaperStyle::Dot);
        let first = s.page().updated_at;
        s.set_paper_style(PaperStyle::Grid);
        assert!(s.page().updated_at > first);
    }
}
