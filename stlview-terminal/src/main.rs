/// stlview - annotated multi-file STL viewer for the terminal
///
/// Controls:
///   - 1/2/3 or M: Points / Wireframe / Surface
///   - Tab: Focus next file, C: edit its color
///   - O / A: Open or add files
///   - Arrow Keys / HJKL: Orbit
///   - Left click: Identify file
///   - Q/ESC: Quit
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use stlview_core::Representation;
use stlview_terminal::{TerminalApp, TerminalConfig};

#[derive(Parser, Debug)]
#[command(name = "stlview")]
#[command(about = "View several STL files at once, each in its own color")]
struct Cli {
    /// STL files to open
    files: Vec<PathBuf>,

    /// Render every file white and ignore clicks
    #[arg(long)]
    plain: bool,

    /// Initial representation: points, wireframe or surface
    #[arg(long)]
    representation: Option<Representation>,

    /// Config file (defaults to <config dir>/stlview/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Seed for the random file colors
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<()> {
    // The terminal belongs to the viewer, so logs only go to a file
    let Some(path) = log_file else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let mut config = TerminalConfig::load_or_default(cli.config.as_deref());
    if cli.plain {
        config.viewer.annotations = false;
    }
    if let Some(representation) = cli.representation {
        config.viewer.representation = representation;
    }
    let seed = cli
        .seed
        .or(config.viewer.color_seed)
        .unwrap_or_else(rand::random);
    config.viewer.color_seed = Some(seed);

    info!(
        "starting with {} file(s), seed {seed}, {:?}",
        cli.files.len(),
        config
    );

    let mut app = TerminalApp::new(config, cli.files);
    app.run().context("terminal session failed")?;
    Ok(())
}
