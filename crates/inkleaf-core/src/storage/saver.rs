//! Background persistence of edited pages.
//!
//! Every committed edit produces a full page snapshot. [`PageSaver`] writes
//! those snapshots on the executor's I/O thread, which runs jobs in order,
//! so the newest snapshot of a page is always the last one written. A
//! snapshot that a newer one has already superseded by the time its job
//! runs is skipped.

use crate::executor::{BackgroundExecutor, TaskHandle};
use crate::model::Page;
use crate::session::SessionEvent;
use crate::storage::{Storage, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Outcome of one queued save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// A newer snapshot of the same page was queued.
    Superseded,
}

/// Saves page snapshots of one notebook in the background.
pub struct PageSaver<S: Storage + 'static> {
    /// Storage backend.
    storage: Arc<S>,
    executor: Arc<BackgroundExecutor>,
    notebook_id: String,
    /// Latest revision submitted per page id.
    latest: Arc<Mutex<HashMap<String, u64>>>,
    /// Revision counter across all pages.
    submitted: u64,
    /// Highest revision written or skipped.
    completed: Arc<AtomicU64>,
}

impl<S: Storage + 'static> PageSaver<S> {
    /// Create a saver for the pages of `notebook_id`.
    pub fn new(storage: Arc<S>, executor: Arc<BackgroundExecutor>, notebook_id: impl Into<String>) -> Self {
        Self {
            storage,
            executor,
            notebook_id: notebook_id.into(),
            latest: Arc::new(Mutex::new(HashMap::new())),
            submitted: 0,
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn notebook_id(&self) -> &str {
        &self.notebook_id
    }

    /// Check if submitted snapshots are still waiting to be written.
    pub fn is_dirty(&self) -> bool {
        self.completed.load(Ordering::Acquire) < self.submitted
    }

    /// Queue a save of `page`.
    pub fn submit(&mut self, page: Page) -> TaskHandle<StorageResult<SaveOutcome>> {
        self.submitted += 1;
        let revision = self.submitted;
        if let Ok(mut latest) = self.latest.lock() {
            latest.insert(page.id.clone(), revision);
        }

        let storage = self.storage.clone();
        let latest = self.latest.clone();
        let completed = self.completed.clone();
        let notebook_id = self.notebook_id.clone();
        self.executor.spawn_io(move || {
            let current = latest.lock().ok().and_then(|l| l.get(&page.id).copied());
            let result = if current.is_some_and(|current| current > revision) {
                log::debug!("Skipping superseded save of page {} (revision {})", page.id, revision);
                Ok(SaveOutcome::Superseded)
            } else {
                pollster::block_on(storage.save_page(&notebook_id, &page)).map(|()| SaveOutcome::Written)
            };
            if let Err(e) = &result {
                log::error!("Failed to save page {}: {}", page.id, e);
            }
            completed.fetch_max(revision, Ordering::AcqRel);
            result
        })
    }

    /// Queue saves for every page change in `events`.
    pub fn handle_events(&mut self, events: Vec<SessionEvent>) -> Vec<TaskHandle<StorageResult<SaveOutcome>>> {
        events
            .into_iter()
            .map(|event| match event {
                SessionEvent::PageChanged(page) => self.submit(page),
            })
            .collect()
    }

    /// Block until every save queued so far has finished.
    /// Returns false if the executor has stopped.
    pub fn flush(&self) -> bool {
        self.executor.spawn_io(|| ()).wait().is_some()
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::executor::ExecutorConfig;
    use crate::model::PaperStyle;
    use crate::session::EditorSession;
    use crate::storage::MemoryStorage;
    use pollster::block_on;

    fn setup() -> (Arc<MemoryStorage>, Arc<BackgroundExecutor>, String) {
        let storage = Arc::new(MemoryStorage::new());
        let executor = Arc::new(BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap());
        let notebook = block_on(storage.create_notebook("N", None)).unwrap();
        (storage, executor, notebook.id)
    }

    #[test]
    fn test_saver_creation() {
        let (storage, executor, id) = setup();
        let saver = PageSaver::new(storage, executor, id.clone());
        assert!(!saver.is_dirty());
        assert_eq!(saver.notebook_id(), id);
    }

    #[test]
    fn test_last_snapshot_wins() {
        let (storage, executor, id) = setup();
        let mut saver = PageSaver::new(storage.clone(), executor, id.clone());
        let mut page = Page::new(1, PaperStyle::Blank);

        let mut handles = Vec::new();
        for style in [PaperStyle::Lined, PaperStyle::Grid, PaperStyle::Dot] {
            page.paper_style = style;
            handles.push(saver.submit(page.clone()));
        }
        assert!(saver.flush());
        assert!(!saver.is_dirty());

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.wait().unwrap().unwrap()).collect();
        assert_eq!(outcomes.last(), Some(&SaveOutcome::Written));
        let saved = block_on(storage.load_page(&id, &page.id)).unwrap().unwrap();
        assert_eq!(saved.paper_style, PaperStyle::Dot);
    }

    #[test]
    fn test_session_events_saved() {
        let (storage, executor, id) = setup();
        let mut saver = PageSaver::new(storage.clone(), executor, id.clone());
        let mut session = EditorSession::new(Page::new(1, PaperStyle::Blank), EditorConfig::default());
        session.set_paper_style(PaperStyle::Grid);
        session.set_paper_style(PaperStyle::Dot);

        let handles = saver.handle_events(session.take_events());
        assert_eq!(handles.len(), 2);
        saver.flush();
        let saved = block_on(storage.load_page(&id, &session.page().id)).unwrap().unwrap();
        assert_eq!(saved, *session.page());
    }

    #[test]
    fn test_flush_after_shutdown() {
        let storage = Arc::new(MemoryStorage::new());
        let mut executor = BackgroundExecutor::new(ExecutorConfig::new(1)).unwrap();
        executor.shutdown();
        let saver = PageSaver::new(storage, Arc::new(executor), "n");
        assert!(!saver.flush());
    }
}
