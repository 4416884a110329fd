use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use floatpane::actor::persistence::{PersistenceAdapter, SavedWindow};
use floatpane::actor::reactor::{self, Event, Reactor};
use floatpane::common::config::{Config, config_file, data_dir};
use floatpane::common::log;
use floatpane::model::window::WindowSnapshot;
use floatpane::sys::geometry::Size;
use floatpane::sys::host::GridCanvas;
use floatpane::sys::store::FileStore;
use tracing::warn;

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the saved session (overrides the config).
    #[arg(long, value_name = "DIR")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file and print any issues.
    Validate,
    /// Print the saved floating windows as JSON.
    Dump,
    /// Replay a recorded event file and print the resulting windows.
    Replay { file: PathBuf },
    /// Run a RON list of events, recording them to OUT.
    Record {
        out: PathBuf,
        events: PathBuf,
        /// Screen width the events were captured against.
        #[arg(long, default_value_t = 1920.0)]
        width: f64,
        /// Screen height the events were captured against.
        #[arg(long, default_value_t = 1080.0)]
        height: f64,
    },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();
    if let Err(e) = run(opt) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().or_else(config_file);
    let config = match &config_path {
        Some(path) if path.exists() => Config::read(path)?,
        _ => Config::default(),
    };

    match opt.command {
        Commands::Validate => {
            let issues = config.validate();
            if issues.is_empty() {
                println!("Config validation passed");
                return Ok(());
            }
            for issue in issues {
                eprintln!("{issue}");
            }
            process::exit(1);
        }
        Commands::Dump => {
            let store = open_store(opt.store.as_deref(), &config)?;
            let persistence = PersistenceAdapter::new(&config.settings.persistence, Box::new(store));
            let snapshots: Vec<WindowSnapshot> = persistence
                .load()
                .into_iter()
                .filter_map(|saved| match saved {
                    SavedWindow::Snapshot(snapshot) => Some(snapshot),
                    SavedWindow::Defaults(id) => {
                        warn!(%id, "record is corrupt, it would reopen with defaults");
                        None
                    }
                })
                .collect();
            print_snapshots(&snapshots)
        }
        Commands::Replay { file } => {
            let store = open_store(opt.store.as_deref(), &config)?;
            let reactor = reactor::replay(&file, Box::new(store))?;
            print_snapshots(&reactor.windows().snapshots())
        }
        Commands::Record { out, events, width, height } => {
            let text = fs::read_to_string(&events)
                .with_context(|| format!("reading events from {}", events.display()))?;
            let events: Vec<Event> = ron::de::from_str(&text).context("parsing event list")?;
            let store = open_store(opt.store.as_deref(), &config)?;
            let host = GridCanvas::from_settings(&config.settings.host);
            let record = reactor::Record::new(Some(&out))?;
            let mut reactor = Reactor::new(
                config,
                Box::new(host),
                Size::new(width, height),
                Box::new(store),
                record,
                None,
            );
            reactor.handle_events(events);
            reactor.flush()?;
            print_snapshots(&reactor.windows().snapshots())
        }
    }
}

fn open_store(dir: Option<&Path>, config: &Config) -> anyhow::Result<FileStore> {
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| config.settings.persistence.store_dir.clone())
        .or_else(data_dir)
        .context("no store directory; pass --store")?;
    Ok(FileStore::new(dir))
}

fn print_snapshots(snapshots: &[WindowSnapshot]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshots)?);
    Ok(())
}
