//! Rasterizer and library configuration.

use inkleaf_core::config::{ConfigError, EditorConfig};
use inkleaf_core::executor::ExecutorConfig;
use inkleaf_core::storage::default_root;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Constants of the page rasterizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Pixel width of exported pages.
    pub export_width: u32,
    /// Ratio used when a page has none.
    pub default_aspect_ratio: f64,
    /// Page width in dp; density is pixel width over this.
    pub reference_width_dp: f64,
    pub paper_spacing_dp: f64,
    /// Distance of the lined-paper margin from the left edge.
    pub paper_margin_dp: f64,
    pub paper_line_width_dp: f64,
    pub margin_line_width_dp: f64,
    pub dot_radius_dp: f64,
    /// Paper lines and dots, ARGB.
    pub soft_color: u32,
    /// Lined-paper margin, ARGB.
    pub margin_color: u32,
    /// Decoded bitmaps kept in memory.
    pub bitmap_cache_bytes: usize,
    /// Longest side of rendered PDF pages.
    pub pdf_max_side: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            export_width: 1600,
            default_aspect_ratio: 0.72,
            reference_width_dp: 360.0,
            paper_spacing_dp: 32.0,
            paper_margin_dp: 44.0,
            paper_line_width_dp: 1.0,
            margin_line_width_dp: 1.5,
            dot_radius_dp: 1.4,
            soft_color: 0xFFDDD6C8,
            margin_color: 0xA0B4AD9F,
            bitmap_cache_bytes: 64 * 1024 * 1024,
            pdf_max_side: 1600,
        }
    }
}

impl RenderConfig {
    /// Ratio to render `aspect_ratio` with.
    pub fn effective_ratio(&self, aspect_ratio: f64) -> f64 {
        if aspect_ratio > 0.0 { aspect_ratio } else { self.default_aspect_ratio }
    }

    /// Pixel size of a page `width` pixels wide.
    pub fn page_size(&self, aspect_ratio: f64, width: u32) -> (u32, u32) {
        let width = width.max(1);
        let height = (width as f64 / self.effective_ratio(aspect_ratio)).round().max(1.0);
        (width, height as u32)
    }

    /// Pixels per dp at `width`.
    pub fn density(&self, width: u32) -> f64 {
        width as f64 / self.reference_width_dp
    }
}

/// Everything needed to open a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LibraryConfig {
    /// Storage root directory.
    pub root: PathBuf,
    pub editor: EditorConfig,
    pub render: RenderConfig,
    /// Rasterization workers.
    pub cpu_threads: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_root().unwrap_or_else(|_| PathBuf::from("inkleaf")),
            editor: EditorConfig::default(),
            render: RenderConfig::default(),
            cpu_threads: ExecutorConfig::default().cpu_threads,
        }
    }
}

impl LibraryConfig {
    /// Config for a library rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Default config file location.
    pub fn default_location() -> Option<PathBuf> {
        default_root().ok().map(|root| root.join("config.json"))
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(self.cpu_threads)
    }
}
