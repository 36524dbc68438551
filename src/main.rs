//! tmux-conf CLI entry point.
//!
//! This binary provides the `tmux-conf` command for generating a tmux config
//! from a TOML description.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::exit;
use tmux_conf::cli::Cli;
use tmux_conf::error::Result;
use tmux_conf::generator::{Outcome, TmuxConfig};
use tmux_conf::loader;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let layer = fmt::layer().compact();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(e) = run() {
        error!("{}", e);
        exit(1);
    }
}

/// Main application logic.
fn run() -> Result<()> {
    let cli = Cli::parse();
    let source = absolute(&cli.source)?;
    info!("Processing: {}", source.display());
    let description = loader::load_description(&source)?;

    let options = cli.options(source, generator_bin());
    let mut cfg = TmuxConfig::new(options, description.settings())?;
    match cfg.run(&description)? {
        Outcome::Written(_) => {}
        Outcome::Report(report) => print!("{}", report),
    }
    Ok(())
}

// The config refers back to its description, so it must not depend on the
// directory tmux-conf was run from.
fn absolute(path: &Path) -> Result<PathBuf> {
    let path = loader::expand_path(&path.to_string_lossy())?;
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// How the edit binding re-runs this program.
fn generator_bin() -> String {
    std::env::current_exe()
        .map(|exe| exe.display().to_string())
        .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string())
}
