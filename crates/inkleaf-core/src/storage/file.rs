//! File-based storage implementation.
//!
//! Layout under the root directory:
//!
//! ```text
//! notebooks/library.json
//! notebooks/{notebookId}/notebook.json
//! notebooks/{notebookId}/pages/{pageId}.json
//! notebooks/{notebookId}/assets/...
//! exports/history.json
//! exports/...
//! ```

use super::{BoxFuture, Storage, StorageError, StorageResult, sanitize_id};
use crate::export::ExportHistory;
use crate::model::{Folder, Notebook, Page, folders_from_json, folders_to_json};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage.
///
/// Stores notebooks, pages and folders as JSON files. Every write goes to a
/// temporary sibling first and is then renamed over the target.
pub struct FileStorage {
    /// Base directory for all library data.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        for dir in [base_path.join("notebooks"), base_path.join("exports")] {
            fs::create_dir_all(&dir).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/inkleaf/`
    /// On Windows: `%LOCALAPPDATA%\inkleaf\`
    pub fn default_location() -> StorageResult<Self> {
        Self::new(default_root()?)
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn notebooks_dir(&self) -> PathBuf {
        self.base_path.join("notebooks")
    }

    fn notebook_dir(&self, id: &str) -> PathBuf {
        self.notebooks_dir().join(sanitize_id(id))
    }

    fn notebook_path(&self, id: &str) -> PathBuf {
        self.notebook_dir(id).join("notebook.json")
    }

    fn page_path(&self, notebook_id: &str, page_id: &str) -> PathBuf {
        self.notebook_dir(notebook_id).join("pages").join(format!("{}.json", sanitize_id(page_id)))
    }

    fn library_path(&self) -> PathBuf {
        self.notebooks_dir().join("library.json")
    }

    fn exports_dir(&self) -> PathBuf {
        self.base_path.join("exports")
    }

    fn history_path(&self) -> PathBuf {
        self.exports_dir().join("history.json")
    }
}

/// Default library root: the platform data directory, falling back to home.
pub fn default_root() -> StorageResult<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
    Ok(base.join("inkleaf"))
}

/// Write `bytes` to `path` through a temporary sibling.
fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
    })
}

/// Read a file, `None` if it does not exist.
fn read_optional(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(format!("Failed to read {}: {}", path.display(), e))),
    }
}

/// Parse a page file, logging and skipping unreadable ones.
fn read_page_file(path: &Path) -> Option<Page> {
    let text = match read_optional(path) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("{}", e);
            return None;
        }
    };
    match Page::from_json(&text) {
        Ok(page) => Some(page),
        Err(e) => {
            log::warn!("Skipping malformed page {}: {}", path.display(), e);
            None
        }
    }
}

impl Storage for FileStorage {
    fn list_notebooks(&self) -> BoxFuture<'_, StorageResult<Vec<Notebook>>> {
        let dir = self.notebooks_dir();
        Box::pin(async move {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(StorageError::Io(format!("Failed to read directory: {}", e))),
            };
            let mut notebooks = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path().join("notebook.json");
                if !entry.path().is_dir() {
                    continue;
                }
                match read_optional(&path)? {
                    Some(text) => match Notebook::from_json(&text) {
                        Ok(notebook) => notebooks.push(notebook),
                        Err(e) => log::warn!("Skipping malformed notebook {}: {}", path.display(), e),
                    },
                    None => continue,
                }
            }
            notebooks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(notebooks)
        })
    }

    fn load_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<Notebook>> {
        let path = self.notebook_path(id);
        let id = id.to_string();
        Box::pin(async move {
            let text = read_optional(&path)?.ok_or(StorageError::NotFound(id))?;
            Notebook::from_json(&text).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }

    fn write_notebook(&self, notebook: &Notebook) -> BoxFuture<'_, StorageResult<()>> {
        let dir = self.notebook_dir(&notebook.id);
        let json = notebook.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            for sub in ["pages", "assets"] {
                fs::create_dir_all(dir.join(sub))
                    .map_err(|e| StorageError::Io(format!("Failed to create {}: {}", dir.display(), e)))?;
            }
            write_atomic(&dir.join("notebook.json"), json.as_bytes())
        })
    }

    fn delete_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let dir = self.notebook_dir(id);
        Box::pin(async move {
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", dir.display(), e)))?;
            }
            Ok(())
        })
    }

    fn list_folders(&self) -> BoxFuture<'_, StorageResult<Vec<Folder>>> {
        let path = self.library_path();
        Box::pin(async move {
            let Some(text) = read_optional(&path)? else {
                return Ok(Vec::new());
            };
            let mut folders = folders_from_json(&text).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable folder list {}: {}", path.display(), e);
                Vec::new()
            });
            folders.sort_by_key(|f| f.name.to_lowercase());
            Ok(folders)
        })
    }

    fn write_folders(&self, folders: &[Folder]) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.library_path();
        let json = folders_to_json(folders);
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            write_atomic(&path, json.as_bytes())
        })
    }

    fn list_pages(&self, notebook_id: &str) -> BoxFuture<'_, StorageResult<Vec<Page>>> {
        let dir = self.notebook_dir(notebook_id).join("pages");
        Box::pin(async move {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(StorageError::Io(format!("Failed to read directory: {}", e))),
            };
            let mut pages: Vec<Page> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == "json"))
                .filter_map(|path| read_page_file(&path))
                .collect();
            pages.sort_by_key(|p| p.index);
            Ok(pages)
        })
    }

    fn load_page(&self, notebook_id: &str, page_id: &str) -> BoxFuture<'_, StorageResult<Option<Page>>> {
        let path = self.page_path(notebook_id, page_id);
        Box::pin(async move { Ok(read_page_file(&path)) })
    }

    fn write_page(&self, notebook_id: &str, page: &Page) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.page_path(notebook_id, &page.id);
        let json = page.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            write_atomic(&path, json.as_bytes())
        })
    }

    fn store_asset(&self, notebook_id: &str, name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>> {
        let path = self.notebook_dir(notebook_id).join("assets").join(name);
        let bytes = bytes.to_vec();
        Box::pin(async move {
            write_atomic(&path, &bytes)?;
            Ok(path.to_string_lossy().into_owned())
        })
    }

    fn read_asset(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let path = PathBuf::from(path);
        Box::pin(async move {
            fs::read(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
                _ => StorageError::Io(format!("Failed to read {}: {}", path.display(), e)),
            })
        })
    }

    fn store_export(&self, file_name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>> {
        let path = self.exports_dir().join(file_name);
        let bytes = bytes.to_vec();
        Box::pin(async move {
            write_atomic(&path, &bytes)?;
            Ok(path.to_string_lossy().into_owned())
        })
    }

    fn read_export_history(&self) -> BoxFuture<'_, StorageResult<ExportHistory>> {
        let path = self.history_path();
        Box::pin(async move { Ok(read_optional(&path)?.map(|t| ExportHistory::from_json(&t)).unwrap_or_default()) })
    }

    fn write_export_history(&self, history: &ExportHistory) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.history_path();
        let json = history.to_json();
        Box::pin(async move { write_atomic(&path, json.as_bytes()) })
    }
}
