//! JSON format for pages, notebooks and the folder index.
//!
//! Reads are lenient: missing fields take defaults and malformed array
//! elements are skipped. Only a missing identity (`id`, `index`, ...) rejects
//! a record. Colors are written as signed 32-bit ARGB and accepted as either
//! signed or unsigned integers.

use super::{Folder, ImageItem, Notebook, Page, PaperStyle, Stroke, TextItem, Tool, DEFAULT_PAGE_RATIO};
use crate::config::DEFAULT_INK;
use crate::model::normalize_tags;
use crate::{new_id, now_millis};
use kurbo::Point;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Cover color used when a notebook record has none.
const DEFAULT_COVER: u32 = 0xFF1C7C7D;

/// Record format errors.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Expected a JSON object")]
    NotAnObject,
    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

fn parse_object(json: &str) -> FormatResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(json).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(FormatError::NotAnObject),
    }
}

fn to_string(value: Value) -> FormatResult<String> {
    serde_json::to_string(&value).map_err(|e| FormatError::InvalidJson(e.to_string()))
}

fn f64_or(obj: &Map<String, Value>, key: &str, default: f64) -> f64 {
    obj.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

fn str_or<'a>(obj: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    obj.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

/// Non-blank string field.
fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn color_or(obj: &Map<String, Value>, key: &str, default: u32) -> u32 {
    obj.get(key).and_then(|v| v.as_i64()).map(|v| v as u32).unwrap_or(default)
}

fn color_value(color: u32) -> Value {
    json!(color as i32)
}

fn required_str(obj: &Map<String, Value>, key: &'static str) -> FormatResult<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(FormatError::MissingField(key))
}

fn required_i64(obj: &Map<String, Value>, key: &'static str) -> FormatResult<i64> {
    obj.get(key).and_then(|v| v.as_i64()).ok_or(FormatError::MissingField(key))
}

/// Object elements of an optional array field.
fn objects<'a>(obj: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(key)
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_object())
}

fn stroke_from(obj: &Map<String, Value>) -> Stroke {
    let points = objects(obj, "points")
        .map(|p| Point::new(f64_or(p, "x", 0.0), f64_or(p, "y", 0.0)))
        .collect();
    Stroke {
        id: opt_str(obj, "id").unwrap_or_else(new_id),
        tool: Tool::parse(str_or(obj, "tool", "PEN")),
        color: color_or(obj, "color", DEFAULT_INK),
        width_dp: f64_or(obj, "widthDp", 2.5),
        points,
    }
}

fn text_from(obj: &Map<String, Value>) -> TextItem {
    TextItem {
        id: opt_str(obj, "id").unwrap_or_else(new_id),
        text: str_or(obj, "text", "").to_string(),
        x: f64_or(obj, "x", 0.1),
        y: f64_or(obj, "y", 0.1),
        width: f64_or(obj, "width", 0.4),
        height: f64_or(obj, "height", 0.1),
        font_size_sp: f64_or(obj, "fontSizeSp", 18.0),
        color: color_or(obj, "color", DEFAULT_INK),
        rotation: f64_or(obj, "rotation", 0.0),
    }
}

fn image_from(obj: &Map<String, Value>) -> ImageItem {
    ImageItem {
        id: opt_str(obj, "id").unwrap_or_else(new_id),
        path: str_or(obj, "path", "").to_string(),
        x: f64_or(obj, "x", 0.1),
        y: f64_or(obj, "y", 0.1),
        width: f64_or(obj, "width", 0.4),
        height: f64_or(obj, "height", 0.3),
        rotation: f64_or(obj, "rotation", 0.0),
    }
}

pub(crate) fn page_from_json(json: &str) -> FormatResult<Page> {
    let obj = parse_object(json)?;
    let id = required_str(&obj, "id")?;
    let index = obj
        .get("index")
        .and_then(|v| v.as_u64())
        .ok_or(FormatError::MissingField("index"))? as u32;

    let mut source_pdf_path = opt_str(&obj, "sourcePdfPath");
    let mut source_pdf_page_index = obj
        .get("sourcePdfPageIndex")
        .and_then(|v| v.as_i64())
        .filter(|i| *i >= 0)
        .map(|i| i as u32);
    if source_pdf_path.is_none() || source_pdf_page_index.is_none() {
        source_pdf_path = None;
        source_pdf_page_index = None;
    }

    Ok(Page {
        id,
        index,
        paper_style: PaperStyle::parse(str_or(&obj, "paperStyle", "BLANK")),
        strokes: objects(&obj, "strokes").map(stroke_from).collect(),
        text_items: objects(&obj, "textItems").map(text_from).collect(),
        image_items: objects(&obj, "imageItems").map(image_from).collect(),
        background_path: opt_str(&obj, "backgroundPath"),
        aspect_ratio: f64_or(&obj, "aspectRatio", DEFAULT_PAGE_RATIO),
        source_pdf_path,
        source_pdf_page_index,
        updated_at: obj.get("updatedAt").and_then(|v| v.as_i64()).unwrap_or_else(now_millis),
    })
}

pub(crate) fn page_to_json(page: &Page) -> FormatResult<String> {
    let strokes: Vec<Value> = page
        .strokes
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "tool": s.tool.as_str(),
                "color": color_value(s.color),
                "widthDp": s.width_dp,
                "points": s.points.iter().map(|p| json!({"x": p.x, "y": p.y})).collect::<Vec<_>>(),
            })
        })
        .collect();
    let texts: Vec<Value> = page
        .text_items
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "text": t.text,
                "x": t.x,
                "y": t.y,
                "width": t.width,
                "height": t.height,
                "fontSizeSp": t.font_size_sp,
                "color": color_value(t.color),
                "rotation": t.rotation,
            })
        })
        .collect();
    let images: Vec<Value> = page
        .image_items
        .iter()
        .map(|i| {
            json!({
                "id": i.id,
                "path": i.path,
                "x": i.x,
                "y": i.y,
                "width": i.width,
                "height": i.height,
                "rotation": i.rotation,
            })
        })
        .collect();

    to_string(json!({
        "id": page.id,
        "index": page.index,
        "paperStyle": page.paper_style.as_str(),
        "updatedAt": page.updated_at,
        "strokes": strokes,
        "textItems": texts,
        "imageItems": images,
        "backgroundPath": page.background_path,
        "aspectRatio": page.aspect_ratio,
        "sourcePdfPath": page.source_pdf_path,
        "sourcePdfPageIndex": page.source_pdf_page_index,
    }))
}

pub(crate) fn notebook_from_json(json: &str) -> FormatResult<Notebook> {
    let obj = parse_object(json)?;
    let tags: Vec<&str> = obj
        .get("tags")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .collect();
    Ok(Notebook {
        id: required_str(&obj, "id")?,
        title: required_str(&obj, "title")?,
        created_at: required_i64(&obj, "createdAt")?,
        updated_at: required_i64(&obj, "updatedAt")?,
        page_count: obj.get("pageCount").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        cover_color: color_or(&obj, "coverColor", DEFAULT_COVER),
        folder_id: opt_str(&obj, "folderId"),
        tags: normalize_tags(tags),
    })
}

pub(crate) fn notebook_to_json(notebook: &Notebook) -> FormatResult<String> {
    to_string(json!({
        "id": notebook.id,
        "title": notebook.title,
        "createdAt": notebook.created_at,
        "updatedAt": notebook.updated_at,
        "pageCount": notebook.page_count,
        "coverColor": color_value(notebook.cover_color),
        "folderId": notebook.folder_id,
        "tags": notebook.tags,
    }))
}

/// Parse the library index. Folder entries without an id or name are
/// skipped.
pub fn folders_from_json(json: &str) -> FormatResult<Vec<Folder>> {
    let obj = parse_object(json)?;
    let now = now_millis();
    Ok(objects(&obj, "folders")
        .filter_map(|f| {
            let id = opt_str(f, "id")?;
            let name = f.get("name").and_then(|v| v.as_str())?.to_string();
            Some(Folder {
                id,
                name,
                created_at: f.get("createdAt").and_then(|v| v.as_i64()).unwrap_or(now),
                updated_at: f.get("updatedAt").and_then(|v| v.as_i64()).unwrap_or(now),
            })
        })
        .collect())
}

/// Serialize the library index.
pub fn folders_to_json(folders: &[Folder]) -> FormatResult<String> {
    let folders: Vec<Value> = folders
        .iter()
        .map(|f| {
            json!({
                "id": f.id,
                "name": f.name,
                "createdAt": f.created_at,
                "updatedAt": f.updated_at,
            })
        })
        .collect();
    to_string(json!({ "folders": folders }))
}
