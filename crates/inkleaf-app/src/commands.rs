//! Subcommand implementations.

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result, anyhow, bail};
use inkleaf_core::storage::{FileStorage, Storage};
use inkleaf_core::{BackgroundExecutor, ExportType, Notebook, Page};
use inkleaf_render::{Library, LibraryConfig};
use pollster::block_on;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Resolve the library config: an explicit `--config`, else `config.json`
/// in the root when present, else defaults. `--root` always wins.
pub fn load_config(cli: &Cli) -> Result<LibraryConfig> {
    let mut config = match &cli.config {
        Some(path) => LibraryConfig::load(path)?,
        None => {
            let candidate = match &cli.root {
                Some(root) => Some(root.join("config.json")),
                None => LibraryConfig::default_location(),
            };
            match candidate.filter(|path| path.is_file()) {
                Some(path) => LibraryConfig::load(&path)?,
                None => LibraryConfig::default(),
            }
        }
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    Ok(config)
}

/// Open the file-backed library described by `config`.
pub fn open_library(config: LibraryConfig) -> Result<Library<FileStorage>> {
    let storage = FileStorage::new(config.root.clone())
        .with_context(|| format!("Failed to open library at {}", config.root.display()))?;
    let executor = BackgroundExecutor::new(config.executor_config()).context("Failed to start worker threads")?;
    log::debug!("Opened library at {}", config.root.display());
    Ok(Library::new(Arc::new(storage), Arc::new(executor), config.render))
}

/// Find a notebook by id, then by case-insensitive title.
fn find_notebook<S: Storage>(storage: &S, key: &str) -> Result<Notebook> {
    let notebooks = block_on(storage.list_notebooks())?;
    let by_id = notebooks.iter().position(|n| n.id == key);
    let index = by_id.or_else(|| notebooks.iter().position(|n| n.title.eq_ignore_ascii_case(key)));
    match index {
        Some(i) => Ok(notebooks[i].clone()),
        None => bail!("No notebook matches '{}'", key),
    }
}

/// Find a page by index, then by id.
fn find_page<S: Storage>(storage: &S, notebook: &Notebook, key: &str) -> Result<Page> {
    let pages = block_on(storage.list_pages(&notebook.id))?;
    let index: Option<u32> = key.parse().ok();
    pages
        .into_iter()
        .find(|p| Some(p.index) == index || p.id == key)
        .ok_or_else(|| anyhow!("{} has no page '{}'", notebook.title, key))
}

/// Run one command, writing its report to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let library = open_library(load_config(cli)?)?;
    let storage = library.storage().as_ref();

    match &cli.command {
        Commands::Notebooks { query } => {
            let notebooks = match query {
                Some(query) => block_on(storage.search_notebooks(query))?,
                None => block_on(storage.list_notebooks())?,
            };
            for notebook in notebooks {
                write!(out, "{}  {}  ({} pages)", notebook.id, notebook.title, notebook.page_count)?;
                if !notebook.tags.is_empty() {
                    write!(out, "  #{}", notebook.tags.join(" #"))?;
                }
                writeln!(out)?;
            }
        }
        Commands::Pages { notebook } => {
            let notebook = find_notebook(storage, notebook)?;
            for page in block_on(storage.list_pages(&notebook.id))? {
                let source = match page.source_pdf() {
                    Some((path, index)) => format!("  pdf {}#{}", path, index + 1),
                    None => String::new(),
                };
                writeln!(
                    out,
                    "{:>3}  {}  {}  strokes={} text={} images={}{}",
                    page.index,
                    page.id,
                    page.paper_style.as_str(),
                    page.strokes.len(),
                    page.text_items.len(),
                    page.image_items.len(),
                    source
                )?;
            }
        }
        Commands::Export { notebook, page, format, out: target } => {
            let notebook = find_notebook(storage, notebook)?;
            let page = find_page(storage, &notebook, page)?;
            let export_type = ExportType::from(*format);
            let written = match target {
                Some(target) => {
                    if !library.export_page_to_external_target(&page, &notebook, export_type, target) {
                        bail!("Failed to export page {} to {}", page.index, target.display());
                    }
                    target.display().to_string()
                }
                None => {
                    let exported = match export_type {
                        ExportType::Png => library.export_page_as_raster(&page, &notebook),
                        ExportType::Pdf => library.export_page_as_document(&page, &notebook),
                    };
                    exported.ok_or_else(|| anyhow!("Failed to export page {}", page.index))?
                }
            };
            writeln!(out, "{}", written)?;
        }
        Commands::History => {
            for record in library.list_export_history() {
                writeln!(
                    out,
                    "{}  {}  {}  {} p{}  {}",
                    record.created_at,
                    record.export_type.as_str(),
                    record.target_kind.as_str(),
                    record.notebook_title,
                    record.page_index,
                    record.target
                )?;
            }
        }
        Commands::ImportImage { notebook, file } => {
            let notebook = find_notebook(storage, notebook)?;
            let path = library
                .import_image(&notebook.id, file)
                .ok_or_else(|| anyhow!("Failed to import {}", file.display()))?;
            writeln!(out, "{}", path)?;
        }
        Commands::ImportPdf { notebook, file } => {
            let notebook = find_notebook(storage, notebook)?;
            ensure_exists(file)?;
            let pages = library.import_pdf_as_pages(&notebook.id, file);
            if pages.is_empty() {
                bail!("Failed to import {}", file.display());
            }
            for page in pages {
                writeln!(out, "{:>3}  {}", page.index, page.id)?;
            }
        }
    }
    Ok(())
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("{} does not exist", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use inkleaf_core::PaperStyle;

    fn run_args(args: &[&str]) -> Result<String> {
        let cli = Cli::parse_from(std::iter::once("inkleaf").chain(args.iter().copied()));
        let mut out = Vec::new();
        run(&cli, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn seeded_root() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let notebook = block_on(storage.create_notebook("Physics", None)).unwrap();
        block_on(storage.update_notebook_tags(&notebook.id, &["exam".to_string()])).unwrap();
        block_on(storage.create_page(&notebook.id, PaperStyle::Grid, None, None)).unwrap();
        block_on(storage.create_notebook("Recipes", None)).unwrap();
        let root = dir.path().display().to_string();
        (dir, root)
    }

    #[test]
    fn test_notebooks() {
        let (_dir, root) = seeded_root();
        let all = run_args(&["--root", &root, "notebooks"]).unwrap();
        assert_eq!(all.lines().count(), 2);
        assert!(all.contains("Physics  (1 pages)  #exam"));

        let found = run_args(&["--root", &root, "notebooks", "--query", "EXAM"]).unwrap();
        assert_eq!(found.lines().count(), 1);
        assert!(found.contains("Physics"));
    }

    #[test]
    fn test_pages() {
        let (_dir, root) = seeded_root();
        let output = run_args(&["--root", &root, "pages", "physics"]).unwrap();
        assert!(output.trim_start().starts_with("1  "));
        assert!(output.contains("GRID"));
        assert!(run_args(&["--root", &root, "pages", "Chemistry"]).is_err());
    }

    #[test]
    fn test_export_and_history() {
        let (dir, root) = seeded_root();
        let exported = run_args(&["--root", &root, "export", "Physics", "1"]).unwrap();
        assert!(Path::new(exported.trim()).is_file());
        assert!(exported.trim().ends_with(".png"));

        let target = dir.path().join("out.pdf");
        let target_arg = target.display().to_string();
        run_args(&["--root", &root, "export", "Physics", "1", "-f", "pdf", "--out", &target_arg]).unwrap();
        assert!(std::fs::read(&target).unwrap().starts_with(b"%PDF"));

        let history = run_args(&["--root", &root, "history"]).unwrap();
        assert_eq!(history.lines().count(), 2);
        assert!(history.contains("EXTERNAL"));
        assert!(history.contains("Physics p1"));

        assert!(run_args(&["--root", &root, "export", "Physics", "7"]).is_err());
    }

    #[test]
    fn test_config_file() {
        let (dir, root) = seeded_root();
        std::fs::write(dir.path().join("config.json"), r#"{"render":{"exportWidth":90}}"#).unwrap();
        let cli = Cli::parse_from(["inkleaf", "--root", &root, "history"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.render.export_width, 90);
        assert_eq!(config.root, dir.path());

        std::fs::write(dir.path().join("config.json"), "{ broken").unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_import_missing_pdf() {
        let (dir, root) = seeded_root();
        let missing = dir.path().join("missing.pdf").display().to_string();
        assert!(run_args(&["--root", &root, "import-pdf", "Physics", &missing]).is_err());
    }
}
