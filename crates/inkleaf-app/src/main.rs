//! Main application entry point.

use clap::Parser;
use inkleaf_app::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("Running {:?}", cli.command);

    let stdout = std::io::stdout();
    inkleaf_app::run(&cli, &mut stdout.lock())
}
