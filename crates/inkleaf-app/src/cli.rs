//! Command-line arguments.

use clap::{Parser, Subcommand, ValueEnum};
use inkleaf_core::ExportType;
use std::path::PathBuf;

/// Browse and export Inkleaf notebooks.
#[derive(Parser, Debug, Clone)]
#[command(name = "inkleaf", version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Library root directory (default: the platform data directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Config file (default: config.json in the library root, if present)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List notebooks, most recently updated first
    #[command(visible_alias = "ls")]
    Notebooks {
        /// Only notebooks whose title, tags or page text contain this
        #[arg(short, long)]
        query: Option<String>,
    },

    /// List the pages of a notebook
    Pages {
        /// Notebook id or title
        notebook: String,
    },

    /// Export one page as PNG or PDF
    Export {
        /// Notebook id or title
        notebook: String,

        /// Page index or id
        page: String,

        #[arg(short, long, value_enum, default_value_t = Format::Png)]
        format: Format,

        /// Write here instead of the library's export directory
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        out: Option<PathBuf>,
    },

    /// Show the export history, newest first
    History,

    /// Copy an image into a notebook's assets
    ImportImage {
        /// Notebook id or title
        notebook: String,

        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Append one page per PDF page to a notebook
    ImportPdf {
        /// Notebook id or title
        notebook: String,

        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Png,
    Pdf,
}

impl From<Format> for ExportType {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => ExportType::Png,
            Format::Pdf => ExportType::Pdf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let cli = Cli::parse_from(["inkleaf", "--root", "/tmp/lib", "export", "Physics", "2", "-f", "pdf"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/lib")));
        match cli.command {
            Commands::Export { notebook, page, format, out } => {
                assert_eq!(notebook, "Physics");
                assert_eq!(page, "2");
                assert_eq!(ExportType::from(format), ExportType::Pdf);
                assert!(out.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_notebooks_query() {
        let cli = Cli::parse_from(["inkleaf", "notebooks", "--query", "exam"]);
        assert!(matches!(cli.command, Commands::Notebooks { query: Some(ref q) } if q == "exam"));
        assert!(Cli::try_parse_from(["inkleaf", "export", "Physics"]).is_err());
    }
}
