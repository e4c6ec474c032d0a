//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::export::ExportHistory;
use crate::model::{Folder, Notebook, Page};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Contents {
    notebooks: HashMap<String, Notebook>,
    folders: Vec<Folder>,
    /// Pages by notebook id, then page id.
    pages: HashMap<String, HashMap<String, Page>>,
    /// Assets and exports by path.
    blobs: HashMap<String, Vec<u8>>,
    exports: ExportHistory,
}

/// In-memory storage for testing and ephemeral use.
///
/// Asset and export paths use a `memory://` prefix and can only be read
/// back through [`Storage::read_asset`].
#[derive(Default)]
pub struct MemoryStorage {
    contents: RwLock<Contents>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Contents>> {
        self.contents.read().map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Contents>> {
        self.contents.write().map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }
}

impl Storage for MemoryStorage {
    fn list_notebooks(&self) -> BoxFuture<'_, StorageResult<Vec<Notebook>>> {
        Box::pin(async move {
            let mut notebooks: Vec<Notebook> = self.read()?.notebooks.values().cloned().collect();
            notebooks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(notebooks)
        })
    }

    fn load_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<Notebook>> {
        let id = id.to_string();
        Box::pin(async move { self.read()?.notebooks.get(&id).cloned().ok_or(StorageError::NotFound(id)) })
    }

    fn write_notebook(&self, notebook: &Notebook) -> BoxFuture<'_, StorageResult<()>> {
        let notebook = notebook.clone();
        Box::pin(async move {
            self.write()?.notebooks.insert(notebook.id.clone(), notebook);
            Ok(())
        })
    }

    fn delete_notebook(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut contents = self.write()?;
            contents.notebooks.remove(&id);
            contents.pages.remove(&id);
            let prefix = format!("memory://{}/", id);
            contents.blobs.retain(|path, _| !path.starts_with(&prefix));
            Ok(())
        })
    }

    fn list_folders(&self) -> BoxFuture<'_, StorageResult<Vec<Folder>>> {
        Box::pin(async move {
            let mut folders = self.read()?.folders.clone();
            folders.sort_by_key(|f| f.name.to_lowercase());
            Ok(folders)
        })
    }

    fn write_folders(&self, folders: &[Folder]) -> BoxFuture<'_, StorageResult<()>> {
        let folders = folders.to_vec();
        Box::pin(async move {
            self.write()?.folders = folders;
            Ok(())
        })
    }

    fn list_pages(&self, notebook_id: &str) -> BoxFuture<'_, StorageResult<Vec<Page>>> {
        let notebook_id = notebook_id.to_string();
        Box::pin(async move {
            let mut pages: Vec<Page> = self
                .read()?
                .pages
                .get(&notebook_id)
                .map(|pages| pages.values().cloned().collect())
                .unwrap_or_default();
            pages.sort_by_key(|p| p.index);
            Ok(pages)
        })
    }

    fn load_page(&self, notebook_id: &str, page_id: &str) -> BoxFuture<'_, StorageResult<Option<Page>>> {
        let notebook_id = notebook_id.to_string();
        let page_id = page_id.to_string();
        Box::pin(async move {
            Ok(self.read()?.pages.get(&notebook_id).and_then(|pages| pages.get(&page_id)).cloned())
        })
    }

    fn write_page(&self, notebook_id: &str, page: &Page) -> BoxFuture<'_, StorageResult<()>> {
        let notebook_id = notebook_id.to_string();
        let page = page.clone();
        Box::pin(async move {
            self.write()?.pages.entry(notebook_id).or_default().insert(page.id.clone(), page);
            Ok(())
        })
    }

    fn store_asset(&self, notebook_id: &str, name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>> {
        let path = format!("memory://{}/assets/{}", notebook_id, name);
        let bytes = bytes.to_vec();
        Box::pin(async move {
            self.write()?.blobs.insert(path.clone(), bytes);
            Ok(path)
        })
    }

    fn read_asset(&self, path: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>> {
        let path = path.to_string();
        Box::pin(async move { self.read()?.blobs.get(&path).cloned().ok_or(StorageError::NotFound(path)) })
    }

    fn store_export(&self, file_name: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<String>> {
        let path = format!("memory://exports/{}", file_name);
        let bytes = bytes.to_vec();
        Box::pin(async move {
            self.write()?.blobs.insert(path.clone(), bytes);
            Ok(path)
        })
    }

    fn read_export_history(&self) -> BoxFuture<'_, StorageResult<ExportHistory>> {
        Box::pin(async move { Ok(self.read()?.exports.clone()) })
    }

    fn write_export_history(&self, history: &ExportHistory) -> BoxFuture<'_, StorageResult<()>> {
        let history = history.clone();
        Box::pin(async move {
            self.write()?.exports = history;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PaperStyle;
    use pollster::block_on;

    #[test]
    fn test_save_and_load_page() {
        let storage = MemoryStorage::new();
        let notebook = block_on(storage.create_notebook("N", None)).unwrap();
        let mut page = Page::new(1, PaperStyle::Dot);
        page.background_path = Some("bg.png".into());

        block_on(storage.save_page(&notebook.id, &page)).unwrap();
        let loaded = block_on(storage.load_page(&notebook.id, &page.id)).unwrap();
        assert_eq!(loaded, Some(page));
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(block_on(storage.load_notebook("nonexistent")), Err(StorageError::NotFound(_))));
        assert_eq!(block_on(storage.load_page("n", "p")).unwrap(), None);
        assert!(block_on(storage.list_pages("n")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades() {
        let storage = MemoryStorage::new();
        let notebook = block_on(storage.create_notebook("N", None)).unwrap();
        block_on(storage.create_page(&notebook.id, PaperStyle::Blank, None, None)).unwrap();
        let asset = block_on(storage.store_asset(&notebook.id, "a.png", &[1, 2, 3])).unwrap();
        assert_eq!(block_on(storage.read_asset(&asset)).unwrap(), vec![1, 2, 3]);

        block_on(storage.delete_notebook(&notebook.id)).unwrap();
        assert!(block_on(storage.list_notebooks()).unwrap().is_empty());
        assert!(block_on(storage.list_pages(&notebook.id)).unwrap().is_empty());
        assert!(block_on(storage.read_asset(&asset)).is_err());
    }

    #[test]
    fn test_list_notebooks_newest_first() {
        let storage = MemoryStorage::new();
        let mut old = Notebook::new("old", 0, None);
        old.updated_at = 1;
        let mut new = Notebook::new("new", 0, None);
        new.updated_at = 2;
        block_on(storage.write_notebook(&old)).unwrap();
        block_on(storage.write_notebook(&new)).unwrap();
        let titles: Vec<_> = block_on(storage.list_notebooks()).unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[test]
    fn test_save_page_touches_notebook() {
        let storage = MemoryStorage::new();
        let mut notebook = Notebook::new("N", 0, None);
        notebook.updated_at = 1;
        block_on(storage.write_notebook(&notebook)).unwrap();
        block_on(storage.save_page(&notebook.id, &Page::new(1, PaperStyle::Blank))).unwrap();
        assert!(block_on(storage.load_notebook(&notebook.id)).unwrap().updated_at > 1);
    }
}
