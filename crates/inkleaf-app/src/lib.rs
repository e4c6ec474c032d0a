//! Inkleaf command-line shell
//!
//! Lists notebooks and pages of a file-backed library, exports pages and
//! imports images and PDFs through the render crate's [`Library`].
//!
//! [`Library`]: inkleaf_render::Library

pub mod cli;
mod commands;

pub use cli::{Cli, Commands, Format};
pub use commands::{load_config, open_library, run};
