//! Snapshot-based undo/redo for a single page.

use crate::model::{ImageItem, Page, PaperStyle, Stroke, TextItem};

/// The undoable state of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub strokes: Vec<Stroke>,
    pub text_items: Vec<TextItem>,
    pub image_items: Vec<ImageItem>,
    pub paper_style: PaperStyle,
    pub background_path: Option<String>,
}

impl PageSnapshot {
    /// Capture the undoable state of `page`.
    pub fn capture(page: &Page) -> Self {
        Self {
            strokes: page.strokes.clone(),
            text_items: page.text_items.clone(),
            image_items: page.image_items.clone(),
            paper_style: page.paper_style,
            background_path: page.background_path.clone(),
        }
    }

    /// Write this state back into `page`.
    pub fn restore(&self, page: &mut Page) {
        page.strokes = self.strokes.clone();
        page.text_items = self.text_items.clone();
        page.image_items = self.image_items.clone();
        page.paper_style = self.paper_style;
        page.background_path = self.background_path.clone();
    }
}

/// One undo step.
#[derive(Debug, Clone, PartialEq)]
pub struct EditAction {
    pub before: PageSnapshot,
    pub after: PageSnapshot,
}

/// Undo and redo stacks for the page being edited.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    undo_stack: Vec<EditAction>,
    redo_stack: Vec<EditAction>,
    /// Max undo entries kept, oldest dropped first.
    limit: Option<usize>,
}

impl EditHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History keeping at most `limit` undo steps.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self { limit, ..Self::default() }
    }

    /// Run `mutation` on `page` as one undo step.
    ///
    /// The step is recorded only if the mutation changed the undoable state.
    /// Returns whether it did.
    pub fn record_change<F>(&mut self, page: &mut Page, mutation: F) -> bool
    where
        F: FnOnce(&mut Page),
    {
        let before = PageSnapshot::capture(page);
        mutation(page);
        let after = PageSnapshot::capture(page);
        self.record(before, after)
    }

    /// Record a step whose `before` state was captured earlier, e.g. at the
    /// start of a drag. Returns `false` if nothing changed.
    pub fn record(&mut self, before: PageSnapshot, after: PageSnapshot) -> bool {
        if before == after {
            return false;
        }
        self.undo_stack.push(EditAction { before, after });
        self.redo_stack.clear();
        if let Some(limit) = self.limit {
            let excess = self.undo_stack.len().saturating_sub(limit);
            self.undo_stack.drain(..excess);
        }
        true
    }

    /// Undo the last step.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self, page: &mut Page) -> bool {
        let Some(action) = self.undo_stack.pop() else {
            return false;
        };
        action.before.restore(page);
        self.redo_stack.push(action);
        true
    }

    /// Redo the last undone step.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self, page: &mut Page) -> bool {
        let Some(action) = self.redo_stack.pop() else {
            return false;
        };
        action.after.restore(page);
        self.undo_stack.push(action);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all history, e.g. when switching pages.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
}
