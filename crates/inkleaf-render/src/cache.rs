//! Decoded bitmap cache.
//!
//! Bitmaps are keyed by path. An entry is reused only while the file's
//! modification time and length are unchanged, so replacing an asset on
//! disk is picked up on the next draw. Entries beyond the byte budget are
//! evicted least-recently-used first.

use crate::renderer::{RenderResult, RendererError};
use crate::scene::BitmapSource;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let meta = std::fs::metadata(path).ok()?;
        Some(Self { modified: meta.modified().ok(), len: meta.len() })
    }
}

struct CacheEntry {
    image: Arc<RgbaImage>,
    stamp: FileStamp,
    bytes: usize,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    used_bytes: usize,
    tick: u64,
}

impl CacheState {
    fn remove(&mut self, path: &str) {
        if let Some(entry) = self.entries.remove(path) {
            self.used_bytes -= entry.bytes;
        }
    }

    /// Evict least-recently-used entries until within `budget`, never
    /// evicting `keep`.
    fn evict(&mut self, budget: usize, keep: &str) {
        while self.used_bytes > budget {
            let oldest = self
                .entries
                .iter()
                .filter(|(path, _)| path.as_str() != keep)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(path, _)| path.clone());
            match oldest {
                Some(path) => {
                    log::debug!("Evicting cached bitmap {}", path);
                    self.remove(&path);
                }
                None => break,
            }
        }
    }
}

/// Decode an image file to RGBA.
pub fn decode_bitmap(path: &Path) -> RenderResult<RgbaImage> {
    let image = image::open(path).map_err(|e| RendererError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok(image.to_rgba8())
}

/// Thread-safe LRU cache of decoded bitmaps.
pub struct BitmapCache {
    budget_bytes: usize,
    state: Mutex<CacheState>,
}

impl BitmapCache {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes, state: Mutex::new(CacheState::default()) }
    }

    /// The bitmap at `path`, decoding it if it is not cached or the file
    /// changed since it was cached.
    pub fn get(&self, path: &str) -> Option<Arc<RgbaImage>> {
        let Some(stamp) = FileStamp::of(Path::new(path)) else {
            log::debug!("Bitmap {} not found", path);
            self.invalidate(path);
            return None;
        };

        {
            let mut state = self.state.lock().ok()?;
            state.tick += 1;
            let tick = state.tick;
            let cached = state.entries.get_mut(path).map(|entry| {
                if entry.stamp == stamp {
                    entry.last_used = tick;
                    Some(entry.image.clone())
                } else {
                    None
                }
            });
            match cached {
                Some(Some(image)) => return Some(image),
                Some(None) => state.remove(path),
                None => {}
            }
        }

        // Decode outside the lock so other workers are not blocked.
        let image = match decode_bitmap(Path::new(path)) {
            Ok(image) => Arc::new(image),
            Err(e) => {
                log::warn!("Failed to decode bitmap: {}", e);
                return None;
            }
        };
        let bytes = image.as_raw().len();

        let mut state = self.state.lock().ok()?;
        state.tick += 1;
        let last_used = state.tick;
        state.remove(path);
        state.entries.insert(path.to_string(), CacheEntry { image: image.clone(), stamp, bytes, last_used });
        state.used_bytes += bytes;
        state.evict(self.budget_bytes, path);
        Some(image)
    }

    /// Drop the cached bitmap for `path`.
    pub fn invalidate(&self, path: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.remove(path);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = CacheState::default();
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> usize {
        self.state.lock().map(|s| s.used_bytes).unwrap_or(0)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().map(|s| s.entries.contains_key(path)).unwrap_or(false)
    }
}

impl BitmapSource for BitmapCache {
    fn bitmap(&self, path: &str) -> Option<Arc<RgbaImage>> {
        self.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::path::PathBuf;

    fn write_png(dir: &Path, name: &str, size: u32, color: [u8; 4]) -> String {
        let path: PathBuf = dir.join(name);
        RgbaImage::from_pixel(size, size, Rgba(color)).save(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_get_caches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, [255, 0, 0, 255]);
        let cache = BitmapCache::new(1 << 20);

        let first = cache.get(&path).unwrap();
        let second = cache.get(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), 4 * 4 * 4);
    }

    #[test]
    fn test_changed_file_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 4, [255, 0, 0, 255]);
        let cache = BitmapCache::new(1 << 20);
        assert_eq!(cache.get(&path).unwrap().get_pixel(0, 0).0, [255, 0, 0, 255]);

        // Different size, so the length changes even if the mtime does not.
        write_png(dir.path(), "a.png", 8, [0, 0, 255, 255]);
        let reloaded = cache.get(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (8, 8));
        assert_eq!(reloaded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BitmapCache::new(1 << 20);
        assert!(cache.get(&dir.path().join("missing.png").to_string_lossy()).is_none());

        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"not an image").unwrap();
        assert!(cache.get(&junk.to_string_lossy()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_deleted_file_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "a.png", 2, [0, 0, 0, 255]);
        let cache = BitmapCache::new(1 << 20);
        cache.get(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(cache.get(&path).is_none());
        assert!(!cache.contains(&path));
    }

    #[test]
    fn test_lru_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 4, [1, 0, 0, 255]);
        let b = write_png(dir.path(), "b.png", 4, [2, 0, 0, 255]);
        let c = write_png(dir.path(), "c.png", 4, [3, 0, 0, 255]);
        // Room for two 64-byte bitmaps.
        let cache = BitmapCache::new(128);

        cache.get(&a).unwrap();
        cache.get(&b).unwrap();
        cache.get(&a).unwrap();
        cache.get(&c).unwrap();

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(cache.used_bytes(), 128);
    }

    #[test]
    fn test_oversized_entry_kept() {
        let dir = tempfile::tempdir().unwrap();
        let big = write_png(dir.path(), "big.png", 8, [0, 0, 0, 255]);
        let cache = BitmapCache::new(16);
        assert!(cache.get(&big).is_some());
        assert!(cache.contains(&big));

        cache.invalidate(&big);
        assert!(cache.is_empty());
        assert_eq!(cache.used_bytes(), 0);
    }
}
