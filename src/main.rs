use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::Parser;

use memgraph::app::{GraphView, terminal};
use memgraph::config::Config;
use memgraph::memory::Snapshot;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph snapshot or memory list as JSON; `-` reads stdin
    snapshot: Option<PathBuf>,

    /// TOML file overriding physics and view defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs here; nothing is logged otherwise
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Show the built-in sample graph
    #[arg(long, conflicts_with = "snapshot")]
    demo: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn read_snapshot(args: &Args) -> Result<Snapshot> {
    if args.demo {
        return Ok(Snapshot::demo());
    }

    match args.snapshot.as_deref() {
        Some(path) if path == Path::new("-") => Snapshot::read_from(io::stdin().lock()),
        Some(path) => Snapshot::read_path(path),
        None => bail!("no snapshot given; pass a JSON file, `-` for stdin, or --demo"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let config = Config::load(args.config.as_deref())?;
    let snapshot = read_snapshot(&args)?;

    let mut view = GraphView::new(config);
    view.load(snapshot).context("failed to load graph snapshot")?;
    terminal::run(&mut view)
}
