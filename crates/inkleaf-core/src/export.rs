//! Export records and the bounded export history.

use crate::model::{Notebook, Page};
use crate::{new_id, now_millis};
use serde_json::{Map, Value, json};

/// Most recent exports kept in the history.
pub const EXPORT_HISTORY_LIMIT: usize = 200;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportType {
    #[default]
    Png,
    Pdf,
}

impl ExportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportType::Png => "PNG",
            ExportType::Pdf => "PDF",
        }
    }

    /// Parse a stored name. Unknown names are PNG.
    pub fn parse(value: &str) -> Self {
        match value {
            "PDF" => ExportType::Pdf,
            _ => ExportType::Png,
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportType::Png => "png",
            ExportType::Pdf => "pdf",
        }
    }
}

/// Where an export was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportTargetKind {
    /// A file in the library's own export directory.
    #[default]
    File,
    /// A destination chosen by the caller.
    External,
}

impl ExportTargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportTargetKind::File => "FILE",
            ExportTargetKind::External => "EXTERNAL",
        }
    }

    /// Parse a stored name. `URI` is accepted as external; anything else
    /// unknown is a file.
    pub fn parse(value: &str) -> Self {
        match value {
            "EXTERNAL" | "URI" => ExportTargetKind::External,
            _ => ExportTargetKind::File,
        }
    }
}

/// One completed export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub id: String,
    pub notebook_id: String,
    /// Notebook title at the time of export.
    pub notebook_title: String,
    pub page_id: String,
    pub page_index: u32,
    pub export_type: ExportType,
    pub target_kind: ExportTargetKind,
    /// File path or external destination.
    pub target: String,
    pub created_at: i64,
}

impl ExportRecord {
    /// A record for an export of `page` finished now.
    pub fn new(
        page: &Page,
        notebook: &Notebook,
        export_type: ExportType,
        target_kind: ExportTargetKind,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            notebook_id: notebook.id.clone(),
            notebook_title: notebook.title.clone(),
            page_id: page.id.clone(),
            page_index: page.index,
            export_type,
            target_kind,
            target: target.into(),
            created_at: now_millis(),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| obj.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string();
        Self {
            id: obj
                .get("id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(new_id),
            notebook_id: text("notebookId"),
            notebook_title: text("notebookTitle"),
            page_id: text("pageId"),
            page_index: obj.get("pageIndex").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
            export_type: ExportType::parse(obj.get("exportType").and_then(|v| v.as_str()).unwrap_or("")),
            target_kind: ExportTargetKind::parse(obj.get("targetKind").and_then(|v| v.as_str()).unwrap_or("")),
            target: text("target"),
            created_at: obj.get("createdAt").and_then(|v| v.as_i64()).unwrap_or_else(now_millis),
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "id": self.id,
            "notebookId": self.notebook_id,
            "notebookTitle": self.notebook_title,
            "pageId": self.page_id,
            "pageIndex": self.page_index,
            "exportType": self.export_type.as_str(),
            "targetKind": self.target_kind.as_str(),
            "target": self.target,
            "createdAt": self.created_at,
        })
    }
}

/// Append-only log of the most recent exports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportHistory {
    /// Oldest first.
    records: Vec<ExportRecord>,
}

impl ExportHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored history. Unreadable content yields an empty history
    /// and records that are not objects are skipped.
    pub fn from_json(json: &str) -> Self {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Discarding unreadable export history: {}", e);
                return Self::default();
            }
        };
        let records = value
            .get("exports")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(ExportRecord::from_object)
                    .collect()
            })
            .unwrap_or_default();
        Self { records }
    }

    pub fn to_json(&self) -> String {
        let exports: Vec<Value> = self.records.iter().map(ExportRecord::to_value).collect();
        json!({ "exports": exports }).to_string()
    }

    /// Append a record, evicting the oldest beyond the limit.
    pub fn push(&mut self, record: ExportRecord) {
        self.records.push(record);
        let excess = self.records.len().saturating_sub(EXPORT_HISTORY_LIMIT);
        self.records.drain(..excess);
    }

    /// Records sorted by creation time, newest first.
    pub fn newest_first(&self) -> Vec<ExportRecord> {
        let mut records = self.records.clone();
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperStyle;

    fn record(created_at: i64) -> ExportRecord {
        let notebook = Notebook::new("Physics", 0xFF1C7C7D, None);
        let page = Page::new(3, PaperStyle::Grid);
        ExportRecord {
            created_at,
            ..ExportRecord::new(&page, &notebook, ExportType::Pdf, ExportTargetKind::File, "/tmp/page_3.pdf")
        }
    }

    #[test]
    fn test_record_fields() {
        let r = record(10);
        assert_eq!(r.notebook_title, "Physics");
        assert_eq!(r.page_index, 3);
        assert_eq!(r.export_type.extension(), "pdf");
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = ExportHistory::new();
        for i in 0..=EXPORT_HISTORY_LIMIT as i64 {
            history.push(record(i));
        }
        assert_eq!(history.len(), EXPORT_HISTORY_LIMIT);
        let newest = history.newest_first();
        assert_eq!(newest[0].created_at, EXPORT_HISTORY_LIMIT as i64);
        assert_eq!(newest.last().map(|r| r.created_at), Some(1));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut history = ExportHistory::new();
        history.push(record(1));
        let mut external = record(2);
        external.target_kind = ExportTargetKind::External;
        external.target = "content://exports/1".into();
        history.push(external);

        let parsed = ExportHistory::from_json(&history.to_json());
        assert_eq!(parsed, history);
    }

    #[test]
    fn test_unknown_kinds_fail_closed() {
        let json = r#"{"exports":[{"id":"a","exportType":"TIFF","targetKind":"CLOUD","createdAt":5},
            {"id":"b","exportType":"PDF","targetKind":"URI","createdAt":6}, 7]}"#;
        let history = ExportHistory::from_json(json);
        assert_eq!(history.len(), 2);
        let records = history.newest_first();
        assert_eq!(records[0].id, "b");
        assert_eq!(records[0].export_type, ExportType::Pdf);
        assert_eq!(records[0].target_kind, ExportTargetKind::External);
        assert_eq!(records[1].export_type, ExportType::Png);
        assert_eq!(records[1].target_kind, ExportTargetKind::File);
    }

    #[test]
    fn test_unreadable_history_is_empty() {
        assert!(ExportHistory::from_json("not json").is_empty());
        assert!(ExportHistory::from_json("{}").is_empty());
    }
}
