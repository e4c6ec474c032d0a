//! Notebook, page and page-content types.
//!
//! All positions and sizes are normalized to the page: `x`/`width` are
//! fractions of the page width, `y`/`height` fractions of its height.

mod format;

pub use format::{FormatError, FormatResult};

use crate::geometry::NormalizedRect;
use crate::{new_id, now_millis};
use kurbo::Point;

/// Page aspect ratio (width / height) used when none is known.
pub const DEFAULT_PAGE_RATIO: f64 = 0.72;

/// Editing tool. Only pen and highlighter produce persisted strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pen,
    Highlighter,
    Eraser,
    Lasso,
    Text,
    Image,
}

impl Tool {
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pen => "PEN",
            Tool::Highlighter => "HIGHLIGHTER",
            Tool::Eraser => "ERASER",
            Tool::Lasso => "LASSO",
            Tool::Text => "TEXT",
            Tool::Image => "IMAGE",
        }
    }

    /// Parse a stored tool name. Unknown names become [`Tool::Pen`].
    pub fn parse(value: &str) -> Self {
        match value {
            "HIGHLIGHTER" => Tool::Highlighter,
            "ERASER" => Tool::Eraser,
            "LASSO" => Tool::Lasso,
            "TEXT" => Tool::Text,
            "IMAGE" => Tool::Image,
            _ => Tool::Pen,
        }
    }

    /// Whether a drag with this tool lays down ink.
    pub fn draws_ink(self) -> bool {
        matches!(self, Tool::Pen | Tool::Highlighter)
    }
}

/// Background pattern of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaperStyle {
    #[default]
    Blank,
    Lined,
    Grid,
    Dot,
}

impl PaperStyle {
    pub const ALL: [PaperStyle; 4] = [PaperStyle::Blank, PaperStyle::Lined, PaperStyle::Grid, PaperStyle::Dot];

    pub fn as_str(self) -> &'static str {
        match self {
            PaperStyle::Blank => "BLANK",
            PaperStyle::Lined => "LINED",
            PaperStyle::Grid => "GRID",
            PaperStyle::Dot => "DOT",
        }
    }

    /// Parse a stored style name. Unknown names become [`PaperStyle::Blank`].
    pub fn parse(value: &str) -> Self {
        match value {
            "LINED" => PaperStyle::Lined,
            "GRID" => PaperStyle::Grid,
            "DOT" => PaperStyle::Dot,
            _ => PaperStyle::Blank,
        }
    }
}

/// A freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub id: String,
    pub tool: Tool,
    /// ARGB color. Highlighter strokes carry their reduced alpha here.
    pub color: u32,
    /// Nominal width in dp.
    pub width_dp: f64,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn new(tool: Tool, color: u32, width_dp: f64, points: Vec<Point>) -> Self {
        Self { id: new_id(), tool, color, width_dp, points }
    }

    /// A stroke needs two points to be drawn.
    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Bounding rectangle of the points, if any.
    pub fn bounds(&self) -> Option<NormalizedRect> {
        let first = self.points.first()?;
        let mut rect = NormalizedRect::new(first.x, first.y, first.x, first.y);
        for point in &self.points[1..] {
            rect.include_point(*point);
        }
        Some(rect)
    }
}

/// A wrapped text box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font_size_sp: f64,
    pub color: u32,
    /// Rotation about the box center, degrees.
    pub rotation: f64,
}

impl TextItem {
    pub fn rect(&self) -> NormalizedRect {
        NormalizedRect::from_item(self.x, self.y, self.width, self.height)
    }
}

/// A placed image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub id: String,
    /// Location of the bitmap asset.
    pub path: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation about the box center, degrees.
    pub rotation: f64,
}

impl ImageItem {
    pub fn rect(&self) -> NormalizedRect {
        NormalizedRect::from_item(self.x, self.y, self.width, self.height)
    }
}

/// One page of a notebook.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    /// 1-based position in the notebook.
    pub index: u32,
    pub paper_style: PaperStyle,
    pub strokes: Vec<Stroke>,
    pub text_items: Vec<TextItem>,
    pub image_items: Vec<ImageItem>,
    /// Bitmap drawn instead of the paper pattern, e.g. an imported PDF page.
    pub background_path: Option<String>,
    /// Width / height.
    pub aspect_ratio: f64,
    /// PDF the background was rendered from. Set together with
    /// `source_pdf_page_index`.
    pub source_pdf_path: Option<String>,
    pub source_pdf_page_index: Option<u32>,
    /// Last modification, epoch millis.
    pub updated_at: i64,
}

impl Page {
    /// A new empty page.
    pub fn new(index: u32, paper_style: PaperStyle) -> Self {
        Self {
            id: new_id(),
            index,
            paper_style,
            strokes: Vec::new(),
            text_items: Vec::new(),
            image_items: Vec::new(),
            background_path: None,
            aspect_ratio: DEFAULT_PAGE_RATIO,
            source_pdf_path: None,
            source_pdf_page_index: None,
            updated_at: now_millis(),
        }
    }

    /// The aspect ratio to render with; non-positive ratios fall back to
    /// the default.
    pub fn effective_ratio(&self) -> f64 {
        if self.aspect_ratio > 0.0 { self.aspect_ratio } else { DEFAULT_PAGE_RATIO }
    }

    /// Link the page to a page of a source PDF.
    pub fn link_source_pdf(&mut self, path: impl Into<String>, page_index: u32) {
        self.source_pdf_path = Some(path.into());
        self.source_pdf_page_index = Some(page_index);
    }

    /// The linked source PDF page, if both halves are present.
    pub fn source_pdf(&self) -> Option<(&str, u32)> {
        match (&self.source_pdf_path, self.source_pdf_page_index) {
            (Some(path), Some(index)) => Some((path.as_str(), index)),
            _ => None,
        }
    }

    pub fn text_item(&self, id: &str) -> Option<&TextItem> {
        self.text_items.iter().find(|item| item.id == id)
    }

    pub fn image_item(&self, id: &str) -> Option<&ImageItem> {
        self.image_items.iter().find(|item| item.id == id)
    }

    /// Whether any text item contains `needle` (already lowercased).
    pub fn contains_text(&self, needle: &str) -> bool {
        self.text_items.iter().any(|item| item.text.to_lowercase().contains(needle))
    }

    /// Serialize to the page JSON format.
    pub fn to_json(&self) -> FormatResult<String> {
        format::page_to_json(self)
    }

    /// Parse the page JSON format, applying defaults for missing fields.
    pub fn from_json(json: &str) -> FormatResult<Self> {
        format::page_from_json(json)
    }
}

/// A notebook: an ordered collection of pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub page_count: u32,
    /// ARGB cover color.
    pub cover_color: u32,
    pub folder_id: Option<String>,
    pub tags: Vec<String>,
}

impl Notebook {
    pub fn new(title: impl Into<String>, cover_color: u32, folder_id: Option<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            page_count: 0,
            cover_color,
            folder_id,
            tags: Vec::new(),
        }
    }

    /// Whether the title or a tag contains `needle` (already lowercased).
    pub fn matches_metadata(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }

    pub fn to_json(&self) -> FormatResult<String> {
        format::notebook_to_json(self)
    }

    pub fn from_json(json: &str) -> FormatResult<Self> {
        format::notebook_from_json(json)
    }
}

/// A named group of notebooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self { id: new_id(), name: name.into(), created_at: now, updated_at: now }
    }
}

/// Normalize a tag list: trim, drop blanks, drop duplicates keeping the
/// first occurrence.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

pub use format::{folders_from_json, folders_to_json};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_INK;

    #[test]
    fn test_tool_parse_unknown_is_pen() {
        assert_eq!(Tool::parse("HIGHLIGHTER"), Tool::Highlighter);
        assert_eq!(Tool::parse("crayon"), Tool::Pen);
    }

    #[test]
    fn test_paper_style_parse_unknown_is_blank() {
        for style in PaperStyle::ALL {
            assert_eq!(PaperStyle::parse(style.as_str()), style);
        }
        assert_eq!(PaperStyle::parse("HEXAGON"), PaperStyle::Blank);
    }

    #[test]
    fn test_stroke_bounds() {
        let stroke = Stroke::new(
            Tool::Pen,
            DEFAULT_INK,
            2.0,
            vec![Point::new(0.2, 0.5), Point::new(0.4, 0.1), Point::new(0.3, 0.3)],
        );
        let bounds = stroke.bounds().unwrap();
        assert_eq!(bounds, NormalizedRect::new(0.2, 0.1, 0.4, 0.5));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags([" math ", "", "ideas", "math", "  "]);
        assert_eq!(tags, vec!["math".to_string(), "ideas".to_string()]);
    }

    #[test]
    fn test_source_pdf_pair() {
        let mut page = Page::new(1, PaperStyle::Blank);
        assert!(page.source_pdf().is_none());
        page.link_source_pdf("/tmp/a.pdf", 2);
        assert_eq!(page.source_pdf(), Some(("/tmp/a.pdf", 2)));
    }

    #[test]
    fn test_effective_ratio() {
        let mut page = Page::new(1, PaperStyle::Lined);
        page.aspect_ratio = 0.0;
        assert_eq!(page.effective_ratio(), DEFAULT_PAGE_RATIO);
        page.aspect_ratio = 1.5;
        assert_eq!(page.effective_ratio(), 1.5);
    }
}
