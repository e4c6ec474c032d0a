//! Editor configuration.
//!
//! All interaction tunables live here so hosts can override them from a JSON
//! file. Every field has a default, so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Io { path: String, message: String },
    #[error("Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}

/// Default ink palette, ARGB.
pub const INK_PALETTE: [u32; 6] = [
    0xFF2E2B24, 0xFF1C7C7D, 0xFFE07A5F, 0xFF3D405B, 0xFF81B29A, 0xFFF2CC8F,
];

/// Default ink color, ARGB.
pub const DEFAULT_INK: u32 = INK_PALETTE[0];

/// Tunables for the page editing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Max normalized distance at which an edge snaps to a guide.
    pub snap_threshold: f64,
    /// Normalized guide positions, shared by both axes.
    pub snap_guides: Vec<f64>,
    /// Smallest width/height a transform may produce.
    pub min_transform_size: f64,
    /// Offset applied to both axes of duplicated content.
    pub duplicate_offset: f64,
    /// Eraser radius, as a multiple of the tool width in pixels.
    pub eraser_radius_factor: f64,
    /// Initial width of new text boxes.
    pub default_text_width: f64,
    pub default_text_size_sp: f64,
    pub min_text_size_sp: f64,
    pub max_text_size_sp: f64,
    /// Initial width of inserted images.
    pub image_insert_width: f64,
    /// Max height of inserted images; the width shrinks to keep the ratio.
    pub image_insert_max_height: f64,
    /// Touch radius of transform handles, dp.
    pub handle_radius_dp: f64,
    /// Distance of the rotate handle above the selection, dp.
    pub rotate_handle_offset_dp: f64,
    /// Alpha multiplier baked into highlighter strokes.
    pub highlighter_alpha: f64,
    pub default_tool_width_dp: f64,
    pub min_tool_width_dp: f64,
    pub max_tool_width_dp: f64,
    /// Max undo entries kept per page. `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: 0.015,
            snap_guides: vec![0.0, 0.5, 1.0],
            min_transform_size: 0.06,
            duplicate_offset: 0.03,
            eraser_radius_factor: 1.4,
            default_text_width: 0.45,
            default_text_size_sp: 20.0,
            min_text_size_sp: 12.0,
            max_text_size_sp: 36.0,
            image_insert_width: 0.6,
            image_insert_max_height: 0.7,
            handle_radius_dp: 18.0,
            rotate_handle_offset_dp: 28.0,
            highlighter_alpha: 0.4,
            default_tool_width_dp: 3.5,
            min_tool_width_dp: 1.5,
            max_tool_width_dp: 12.0,
            history_limit: None,
        }
    }
}

impl EditorConfig {
    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamp a font size into the allowed range.
    pub fn clamp_text_size(&self, size_sp: f64) -> f64 {
        size_sp.clamp(self.min_text_size_sp, self.max_text_size_sp)
    }

    /// Clamp a tool width into the allowed range.
    pub fn clamp_tool_width(&self, width_dp: f64) -> f64 {
        width_dp.clamp(self.min_tool_width_dp, self.max_tool_width_dp)
    }
}
