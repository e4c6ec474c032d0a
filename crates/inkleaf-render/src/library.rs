//! Import and export facade over a storage backend.
//!
//! [`Library`] ties storage, rasterizer, bitmap cache and PDF page source
//! together. Its operations report failure as `None`/`false`/empty and log
//! the cause; they only ever add files, so a failed export or import never
//! touches existing pages. Each operation also has an `_async` variant that
//! runs on the background executor and returns a [`TaskHandle`].

use crate::cache::BitmapCache;
use crate::config::RenderConfig;
use crate::encode::{encode_pdf, encode_png};
use crate::font::FontFace;
use crate::pdf::{LopdfPageSource, PdfPageSize, PdfPageSource, flatten_on_white};
use crate::raster::CpuRenderer;
use crate::renderer::{PngRenderResult, RenderContext, Renderer, RendererError};
use crate::scene::build_page_scene;
use inkleaf_core::executor::{BackgroundExecutor, TaskHandle};
use inkleaf_core::export::{ExportRecord, ExportTargetKind, ExportType};
use inkleaf_core::model::{Notebook, Page, PaperStyle};
use inkleaf_core::storage::{Storage, StorageError};
use inkleaf_core::text::{ApproxTextMeasurer, TextMeasurer};
use inkleaf_core::{new_id, now_millis};
use pollster::block_on;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
enum LibraryError {
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Io(String),
}

type LibraryResult<T> = Result<T, LibraryError>;

/// Import/export operations for one library.
pub struct Library<S: Storage + 'static> {
    storage: Arc<S>,
    executor: Arc<BackgroundExecutor>,
    renderer: Arc<CpuRenderer>,
    bitmaps: Arc<BitmapCache>,
    pdf: Option<Arc<dyn PdfPageSource>>,
    measurer: Arc<dyn TextMeasurer>,
    config: Arc<RenderConfig>,
    /// Serializes read-modify-write of the export history.
    history_lock: Arc<Mutex<()>>,
}

impl<S: Storage + 'static> Clone for Library<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            executor: self.executor.clone(),
            renderer: self.renderer.clone(),
            bitmaps: self.bitmaps.clone(),
            pdf: self.pdf.clone(),
            measurer: self.measurer.clone(),
            config: self.config.clone(),
            history_lock: self.history_lock.clone(),
        }
    }
}

#[cfg(feature = "pdfium")]
fn default_pdf_source() -> Arc<dyn PdfPageSource> {
    match crate::pdfium::PdfiumPageSource::bind() {
        Ok(source) => Arc::new(source),
        Err(e) => {
            log::warn!("{}, PDF pages will import blank", e);
            Arc::new(LopdfPageSource::new())
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn default_pdf_source() -> Arc<dyn PdfPageSource> {
    Arc::new(LopdfPageSource::new())
}

impl<S: Storage + 'static> Library<S> {
    /// A library with the CPU renderer and the embedded serif face, which
    /// also measures text so wrapping matches what is drawn. PDF pages come
    /// from PDFium when the `pdfium` feature is on and the library binds,
    /// otherwise from lopdf.
    pub fn new(storage: Arc<S>, executor: Arc<BackgroundExecutor>, config: RenderConfig) -> Self {
        let measurer: Arc<dyn TextMeasurer> = match FontFace::serif() {
            Some(face) => Arc::new(face),
            None => Arc::new(ApproxTextMeasurer::default()),
        };
        Self {
            storage,
            executor,
            renderer: Arc::new(CpuRenderer::new()),
            bitmaps: Arc::new(BitmapCache::new(config.bitmap_cache_bytes)),
            pdf: Some(default_pdf_source()),
            measurer,
            config: Arc::new(config),
            history_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_renderer(mut self, renderer: CpuRenderer) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn with_pdf_source(mut self, source: impl PdfPageSource + 'static) -> Self {
        self.pdf = Some(Arc::new(source));
        self
    }

    /// Disable PDF import.
    pub fn without_pdf_source(mut self) -> Self {
        self.pdf = None;
        self
    }

    /// Use the same measurer as the editor so text wraps identically.
    pub fn with_measurer(mut self, measurer: impl TextMeasurer + 'static) -> Self {
        self.measurer = Arc::new(measurer);
        self
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn executor(&self) -> &Arc<BackgroundExecutor> {
        &self.executor
    }

    pub fn bitmaps(&self) -> &BitmapCache {
        &self.bitmaps
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    // --- Rendering ---

    /// Rasterize `page` at `width` pixels.
    pub fn render_page(&self, page: &Page, width: u32) -> Result<PngRenderResult, RendererError> {
        let ctx = RenderContext::for_page(page, width, &self.config, self.measurer.as_ref());
        let scene = build_page_scene(page, &ctx, self.bitmaps.as_ref());
        self.renderer.render(&scene)
    }

    /// Thumbnail of `page`, `width` pixels wide.
    pub fn thumbnail(&self, page: &Page, width: u32) -> Option<PngRenderResult> {
        self.render_page(page, width)
            .map_err(|e| log::warn!("Failed to render thumbnail of page {}: {}", page.id, e))
            .ok()
    }

    pub fn thumbnail_async(&self, page: Page, width: u32) -> TaskHandle<Option<PngRenderResult>> {
        let this = self.clone();
        self.executor.spawn_cpu(move || this.thumbnail(&page, width))
    }

    fn encode_page(&self, page: &Page, export_type: ExportType) -> LibraryResult<Vec<u8>> {
        let raster = self.render_page(page, self.config.export_width)?;
        let bytes = match export_type {
            ExportType::Png => encode_png(&raster)?,
            ExportType::Pdf => encode_pdf(&raster)?,
        };
        Ok(bytes)
    }

    fn record(&self, record: ExportRecord) {
        let _guard = self.history_lock.lock();
        if let Err(e) = block_on(self.storage.record_export(record)) {
            log::warn!("Failed to record export: {}", e);
        }
    }

    // --- Exports ---

    /// Export `page` as a PNG into the library's export directory.
    pub fn export_page_as_raster(&self, page: &Page, notebook: &Notebook) -> Option<String> {
        self.export_to_library(page, notebook, ExportType::Png)
    }

    /// Export `page` as a one-page PDF into the library's export directory.
    pub fn export_page_as_document(&self, page: &Page, notebook: &Notebook) -> Option<String> {
        self.export_to_library(page, notebook, ExportType::Pdf)
    }

    fn export_to_library(&self, page: &Page, notebook: &Notebook, export_type: ExportType) -> Option<String> {
        let result: LibraryResult<String> = (|| {
            let bytes = self.encode_page(page, export_type)?;
            let file_name = format!("page_{}_{}.{}", page.index, now_millis(), export_type.extension());
            Ok(block_on(self.storage.store_export(&file_name, &bytes))?)
        })();
        match result {
            Ok(path) => {
                log::info!("Exported page {} of {} to {}", page.index, notebook.title, path);
                self.record(ExportRecord::new(page, notebook, export_type, ExportTargetKind::File, path.clone()));
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to export page {}: {}", page.id, e);
                None
            }
        }
    }

    /// Export `page` to a destination chosen by the caller.
    pub fn export_page_to_external_target(
        &self,
        page: &Page,
        notebook: &Notebook,
        export_type: ExportType,
        target: &Path,
    ) -> bool {
        let result: LibraryResult<()> = (|| {
            let bytes = self.encode_page(page, export_type)?;
            std::fs::write(target, &bytes)
                .map_err(|e| LibraryError::Io(format!("Failed to write {}: {}", target.display(), e)))
        })();
        match result {
            Ok(()) => {
                let target = target.display().to_string();
                log::info!("Exported page {} of {} to {}", page.index, notebook.title, target);
                self.record(ExportRecord::new(page, notebook, export_type, ExportTargetKind::External, target));
                true
            }
            Err(e) => {
                log::error!("Failed to export page {}: {}", page.id, e);
                false
            }
        }
    }

    pub fn export_page_as_raster_async(&self, page: Page, notebook: Notebook) -> TaskHandle<Option<String>> {
        let this = self.clone();
        self.executor.spawn_cpu(move || this.export_page_as_raster(&page, &notebook))
    }

    pub fn export_page_as_document_async(&self, page: Page, notebook: Notebook) -> TaskHandle<Option<String>> {
        let this = self.clone();
        self.executor.spawn_cpu(move || this.export_page_as_document(&page, &notebook))
    }

    pub fn export_page_to_external_target_async(
        &self,
        page: Page,
        notebook: Notebook,
        export_type: ExportType,
        target: PathBuf,
    ) -> TaskHandle<bool> {
        let this = self.clone();
        self.executor
            .spawn_cpu(move || this.export_page_to_external_target(&page, &notebook, export_type, &target))
    }

    /// Export history, newest first.
    pub fn list_export_history(&self) -> Vec<ExportRecord> {
        block_on(self.storage.list_export_history()).unwrap_or_else(|e| {
            log::warn!("Failed to read export history: {}", e);
            Vec::new()
        })
    }

    // --- Imports ---

    /// Copy an image into the notebook's assets. Returns the asset path.
    pub fn import_image(&self, notebook_id: &str, source: &Path) -> Option<String> {
        match block_on(self.storage.import_image(notebook_id, source)) {
            Ok(path) => {
                log::info!("Imported image {} as {}", source.display(), path);
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to import image {}: {}", source.display(), e);
                None
            }
        }
    }

    pub fn import_image_async(&self, notebook_id: String, source: PathBuf) -> TaskHandle<Option<String>> {
        let this = self.clone();
        self.executor.spawn_io(move || this.import_image(&notebook_id, &source))
    }

    /// Append one page per page of the PDF at `source`, each with the
    /// rendered PDF page as its background. Returns the new pages, or an
    /// empty list if the PDF cannot be read.
    pub fn import_pdf_as_pages(&self, notebook_id: &str, source: &Path) -> Vec<Page> {
        match self.try_import_pdf(notebook_id, source) {
            Ok(pages) => {
                log::info!("Imported {} pages from {}", pages.len(), source.display());
                pages
            }
            Err(e) => {
                log::error!("Failed to import PDF {}: {}", source.display(), e);
                Vec::new()
            }
        }
    }

    pub fn import_pdf_as_pages_async(&self, notebook_id: String, source: PathBuf) -> TaskHandle<Vec<Page>> {
        let this = self.clone();
        self.executor.spawn_io(move || this.import_pdf_as_pages(&notebook_id, &source))
    }

    fn pdf_source(&self) -> LibraryResult<&Arc<dyn PdfPageSource>> {
        self.pdf
            .as_ref()
            .ok_or_else(|| RendererError::Source("no PDF page source configured".to_string()).into())
    }

    fn try_import_pdf(&self, notebook_id: &str, source: &Path) -> LibraryResult<Vec<Page>> {
        let pdf = self.pdf_source()?;
        let bytes = std::fs::read(source)
            .map_err(|e| LibraryError::Io(format!("Failed to read {}: {}", source.display(), e)))?;
        let sizes = pdf.page_sizes(&bytes)?;

        let pdf_name = format!("source_{}_{}.pdf", now_millis(), new_id());
        let pdf_path = block_on(self.storage.store_asset(notebook_id, &pdf_name, &bytes))?;
        let existing = block_on(self.storage.list_pages(notebook_id))?;
        let start = existing.iter().map(|p| p.index).max().unwrap_or(0);
        let stamp = now_millis();

        let mut pages = Vec::with_capacity(sizes.len());
        for (i, size) in sizes.iter().enumerate() {
            let index = i as u32;
            let png = self.render_source_png(pdf.as_ref(), &bytes, index, size)?;
            let background = block_on(self.storage.store_asset(notebook_id, &format!("pdf_{}_{}.png", stamp, i), &png))?;

            let mut page = Page::new(start + index + 1, PaperStyle::Blank);
            page.background_path = Some(background);
            page.aspect_ratio = size.aspect_ratio();
            page.link_source_pdf(pdf_path.clone(), index);
            block_on(self.storage.write_page(notebook_id, &page))?;
            pages.push(page);
        }
        block_on(self.storage.update_page_count(notebook_id, (existing.len() + pages.len()) as u32))?;
        Ok(pages)
    }

    fn render_source_png(
        &self,
        pdf: &dyn PdfPageSource,
        bytes: &[u8],
        index: u32,
        size: &PdfPageSize,
    ) -> LibraryResult<Vec<u8>> {
        let (width, height) = size.fit(self.config.pdf_max_side);
        let image = flatten_on_white(&pdf.render_page(bytes, index, width, height)?);
        let (width, height) = image.dimensions();
        Ok(encode_png(&PngRenderResult { rgba_data: image.into_raw(), width, height })?)
    }

    /// Render the linked source PDF page again, next to the PDF. Returns the
    /// page with its new background, ratio and timestamp; the caller saves
    /// it. `None` if the page is not linked or the PDF is gone.
    pub fn rerender_source_page(&self, page: &Page) -> Option<Page> {
        let (pdf_path, index) = page.source_pdf()?;
        let pdf_path = Path::new(pdf_path);
        if !pdf_path.exists() {
            log::warn!("Source PDF {} of page {} is missing", pdf_path.display(), page.id);
            return None;
        }
        match self.try_rerender(page, pdf_path, index) {
            Ok(updated) => Some(updated),
            Err(e) => {
                log::error!("Failed to re-render page {}: {}", page.id, e);
                None
            }
        }
    }

    pub fn rerender_source_page_async(&self, page: Page) -> TaskHandle<Option<Page>> {
        let this = self.clone();
        self.executor.spawn_cpu(move || this.rerender_source_page(&page))
    }

    fn try_rerender(&self, page: &Page, pdf_path: &Path, index: u32) -> LibraryResult<Page> {
        let pdf = self.pdf_source()?;
        let bytes = std::fs::read(pdf_path)
            .map_err(|e| LibraryError::Io(format!("Failed to read {}: {}", pdf_path.display(), e)))?;
        let sizes = pdf.page_sizes(&bytes)?;
        let size = sizes.get(index as usize).ok_or_else(|| {
            RendererError::Source(format!("page {} out of range (page_count={})", index, sizes.len()))
        })?;
        let png = self.render_source_png(pdf.as_ref(), &bytes, index, size)?;

        let dir = pdf_path.parent().unwrap_or_else(|| Path::new("."));
        let output = dir.join(format!("pdf_{}_{}.png", now_millis(), new_id()));
        std::fs::write(&output, &png)
            .map_err(|e| LibraryError::Io(format!("Failed to write {}: {}", output.display(), e)))?;

        if let Some(old) = &page.background_path {
            self.bitmaps.invalidate(old);
        }
        let mut updated = page.clone();
        updated.background_path = Some(output.to_string_lossy().into_owned());
        updated.aspect_ratio = size.aspect_ratio();
        updated.updated_at = now_millis().max(page.updated_at + 1);
        Ok(updated)
    }
}
