//! Storage abstraction for persistence.
//!
//! Backends implement record-level reads and writes. The notebook, folder,
//! page and export rules built on top of them are provided methods so every
//! backend behaves the same.

mod file;
mod memory;
mod saver;

pub use file::{FileStorage, default_root};
pub use memory::MemoryStorage;
pub use saver::{PageSaver, SaveOutcome};

use crate::export::{ExportHistory, ExportRecord};
use crate::model::{DEFAULT_PAGE_RATIO, Folder, Notebook, Page, PaperStyle, normalize_tags};
use crate::{new_id, now_millis};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Cover colors picked at random for new notebooks.
pub const COVER_PALETTE: [u32; 5] = [0xFF1C7C7D, 0xFFE07A5F, 0xFF3D405B, 0xFF81B29A, 0xFFF2CC8F];

/// Pick a cover color for a new notebook.
pub fn pick_cover_color() -> u32 {
    let byte = uuid::Uuid::new_v4().as_bytes()[0] as usize;
    COVER_PALETTE[byte % COVER_PALETTE.len()]
}

/// Asset extension for an imported image: png, webp or gif when the source
/// says so, jpg otherwise.
pub fn image_extension(source: &Path) -> &'static str {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        _ => "jpg",
    }
}

/// Replace characters that are unsafe in file names.
pub(crate) fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Trait for notebook storage backends.
///
/// Implementations can store notebooks in memory or on the filesystem.
pub trait Storage: Send + Sync {
    // --- Records ---

    /// All notebooks, most recently updated first.
    fn list_notebooks(&self) -> BoxFuture<'_, StorageResult<Vec<Notebook>>>;

    /// Load a notebook's metadata.
    fn load_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<Notebook>>;

    /// Write a notebook's metadata.
    fn write_notebook(&self, notebook: &Notebook) -> BoxFuture<'_, StorageResult<()>>;

    /// Delete a notebook with its pages and assets.
    fn delete_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// All folders sorted by lowercase name.
    fn list_folders(&self) -> BoxFuture<'_, StorageResult<Vec<Folder>>>;

    /// Replace the folder list.
    fn write_folders(&self, folders: &[Folder]) -> BoxFuture<'_, StorageResult<()>>;

    /// Pages of a notebook sorted by index. Unreadable pages are skipped.
    fn list_pages(&self, notebook_id: &str) -> BoxFuture<'_, StorageResult<Vec<Page>>>;

    /// Load one page, `None` if it does not exist or cannot be read.
    fn load_page(&self, notebook_id: &str, page_id: &str) -> BoxFuture<'_, StorageResult<Option<Page>>>;

    /// Write a page without touching its notebook.
    fn write_page(&self, notebook_id: &str, page: &Page) -> BoxFuture<'_, StorageResult<()>>;

    /// Store bytes as a notebook asset. Returns the asset path.
    fn store_asset(&self, notebook_id: &str, name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>>;

    /// Read an asset by the path `store_asset` returned.
    fn read_asset(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>>;

    /// Store an export file. Returns its path.
    fn store_export(&self, file_name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>>;

    fn read_export_history(&self) -> BoxFuture<'_, StorageResult<ExportHistory>>;

    fn write_export_history(&self, history: &ExportHistory) -> BoxFuture<'_, StorageResult<()>>;

    // --- Notebooks ---

    /// Create a notebook. A blank title becomes "Untitled Notebook".
    fn create_notebook(&self, title: &str, folder_id: Option<&str>) -> BoxFuture<'_, StorageResult<Notebook>> {
        let title = match title.trim() {
            "" => "Untitled Notebook".to_string(),
            trimmed => trimmed.to_string(),
        };
        let notebook = Notebook::new(title, pick_cover_color(), folder_id.map(str::to_string));
        Box::pin(async move {
            self.write_notebook(&notebook).await?;
            log::info!("Created notebook {}", notebook.id);
            Ok(notebook)
        })
    }

    /// Rename a notebook. A blank title keeps the old one.
    fn rename_notebook(&self, id: &str, title: &str) -> BoxFuture<'_, StorageResult<Notebook>> {
        let id = id.to_string();
        let title = title.trim().to_string();
        Box::pin(async move {
            let mut notebook = self.load_notebook(&id).await?;
            if !title.is_empty() {
                notebook.title = title;
            }
            notebook.updated_at = now_millis();
            self.write_notebook(&notebook).await?;
            Ok(notebook)
        })
    }

    /// Move a notebook into a folder, or out of any with `None`.
    fn update_notebook_folder(&self, id: &str, folder_id: Option<&str>) -> BoxFuture<'_, StorageResult<Notebook>> {
        let id = id.to_string();
        let folder_id = folder_id.map(str::to_string);
        Box::pin(async move {
            let mut notebook = self.load_notebook(&id).await?;
            notebook.folder_id = folder_id;
            notebook.updated_at = now_millis();
            self.write_notebook(&notebook).await?;
            Ok(notebook)
        })
    }

    /// Replace a notebook's tags.
    fn update_notebook_tags(&self, id: &str, tags: &[String]) -> BoxFuture<'_, StorageResult<Notebook>> {
        let id = id.to_string();
        let tags = normalize_tags(tags);
        Box::pin(async move {
            let mut notebook = self.load_notebook(&id).await?;
            notebook.tags = tags;
            notebook.updated_at = now_millis();
            self.write_notebook(&notebook).await?;
            Ok(notebook)
        })
    }

    /// Bump a notebook's `updated_at`. Missing notebooks are ignored.
    fn touch_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            match self.load_notebook(&id).await {
                Ok(mut notebook) => {
                    notebook.updated_at = now_millis();
                    self.write_notebook(&notebook).await
                }
                Err(StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
    }

    /// Store a notebook's page count and bump its `updated_at`.
    fn update_page_count(&self, id: &str, page_count: u32) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            match self.load_notebook(&id).await {
                Ok(mut notebook) => {
                    notebook.page_count = page_count;
                    notebook.updated_at = now_millis();
                    self.write_notebook(&notebook).await
                }
                Err(StorageError::NotFound(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
    }

    // --- Folders ---

    /// Create a folder. A blank name becomes "Untitled Folder".
    fn create_folder(&self, name: &str) -> BoxFuture<'_, StorageResult<Folder>> {
        let name = match name.trim() {
            "" => "Untitled Folder".to_string(),
            trimmed => trimmed.to_string(),
        };
        Box::pin(async move {
            let folder = Folder::new(name);
            let mut folders = self.list_folders().await?;
            folders.push(folder.clone());
            self.write_folders(&folders).await?;
            Ok(folder)
        })
    }

    /// Rename a folder. A blank name keeps the old one.
    fn rename_folder(&self, id: &str, name: &str) -> BoxFuture<'_, StorageResult<Folder>> {
        let id = id.to_string();
        let name = name.trim().to_string();
        Box::pin(async move {
            let mut folders = self.list_folders().await?;
            let folder = folders
                .iter_mut()
                .find(|f| f.id == id)
                .ok_or_else(|| StorageError::NotFound(id.clone()))?;
            if !name.is_empty() {
                folder.name = name;
            }
            folder.updated_at = now_millis();
            let updated = folder.clone();
            self.write_folders(&folders).await?;
            Ok(updated)
        })
    }

    /// Delete a folder. Its notebooks are kept and detached.
    fn delete_folder(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut folders = self.list_folders().await?;
            folders.retain(|f| f.id != id);
            self.write_folders(&folders).await?;
            for mut notebook in self.list_notebooks().await? {
                if notebook.folder_id.as_deref() == Some(id.as_str()) {
                    notebook.folder_id = None;
                    self.write_notebook(&notebook).await?;
                }
            }
            Ok(())
        })
    }

    // --- Pages ---

    /// Save the full page and bump the notebook's `updated_at`.
    fn save_page(&self, notebook_id: &str, page: &Page) -> BoxFuture<'_, StorageResult<()>> {
        let notebook_id = notebook_id.to_string();
        let page = page.clone();
        Box::pin(async move {
            self.write_page(&notebook_id, &page).await?;
            self.touch_notebook(&notebook_id).await
        })
    }

    /// Append a new empty page after the last one.
    fn create_page(
        &self,
        notebook_id: &str,
        paper_style: PaperStyle,
        background_path: Option<String>,
        aspect_ratio: Option<f64>,
    ) -> BoxFuture<'_, StorageResult<Page>> {
        let notebook_id = notebook_id.to_string();
        Box::pin(async move {
            let pages = self.list_pages(&notebook_id).await?;
            let index = pages.iter().map(|p| p.index).max().unwrap_or(0) + 1;
            let mut page = Page::new(index, paper_style);
            page.background_path = background_path;
            page.aspect_ratio = aspect_ratio.unwrap_or(DEFAULT_PAGE_RATIO);
            self.write_page(&notebook_id, &page).await?;
            self.update_page_count(&notebook_id, pages.len() as u32 + 1).await?;
            Ok(page)
        })
    }

    // --- Assets ---

    /// Copy an image file into the notebook's assets. Returns the asset path.
    fn import_image(&self, notebook_id: &str, source: &Path) -> BoxFuture<'_, StorageResult<String>> {
        let notebook_id = notebook_id.to_string();
        let source = source.to_path_buf();
        Box::pin(async move {
            let bytes = std::fs::read(&source)
                .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", source.display(), e)))?;
            let name = format!("img_{}_{}.{}", now_millis(), new_id(), image_extension(&source));
            self.store_asset(&notebook_id, &name, &bytes).await
        })
    }

    // --- Exports ---

    /// Append to the export history, keeping the most recent entries.
    fn record_export(&self, record: ExportRecord) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut history = self.read_export_history().await?;
            history.push(record);
            self.write_export_history(&history).await
        })
    }

    /// Export history, newest first.
    fn list_export_history(&self) -> BoxFuture<'_, StorageResult<Vec<ExportRecord>>> {
        Box::pin(async move { Ok(self.read_export_history().await?.newest_first()) })
    }

    // --- Search ---

    /// Notebooks whose title, tags or page text contain `query`, ignoring
    /// case. A blank query returns every notebook.
    fn search_notebooks(&self, query: &str) -> BoxFuture<'_, StorageResult<Vec<Notebook>>> {
        let term = query.trim().to_lowercase();
        Box::pin(async move {
            let notebooks = self.list_notebooks().await?;
            if term.is_empty() {
                return Ok(notebooks);
            }
            let mut found = Vec::new();
            for notebook in notebooks {
                if notebook.matches_metadata(&term) {
                    found.push(notebook);
                    continue;
                }
                let pages = self.list_pages(&notebook.id).await?;
                if pages.iter().any(|page| page.contains_text(&term)) {
                    found.push(notebook);
                }
            }
            Ok(found)
        })
    }
}
