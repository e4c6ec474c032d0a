//! Inkleaf Core Library
//!
//! Page model, editing engine and persistence for handwritten notebooks.
//! Everything geometric lives in normalized page space where `(0,0)` is the
//! top-left corner of the page and `(1,1)` the bottom-right one.

pub mod config;
pub mod editing;
pub mod executor;
pub mod export;
pub mod geometry;
pub mod history;
pub mod model;
pub mod selection;
pub mod session;
pub mod snap;
pub mod storage;
pub mod text;

pub use config::{ConfigError, EditorConfig};
pub use executor::{BackgroundExecutor, ExecutorConfig, TaskHandle};
pub use export::{ExportHistory, ExportRecord, ExportTargetKind, ExportType};
pub use geometry::{CanvasMetrics, NormalizedRect};
pub use history::{EditHistory, PageSnapshot};
pub use model::{Folder, ImageItem, Notebook, Page, PaperStyle, Stroke, TextItem, Tool};
pub use selection::{SelectionIds, TransformHandle, TransformKind, TransformTarget};
pub use session::{EditorSession, SessionEvent, TapOutcome};
pub use snap::{SnapCandidate, SnapGuides};
pub use text::{ApproxTextMeasurer, TextMeasurer};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fresh object identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
