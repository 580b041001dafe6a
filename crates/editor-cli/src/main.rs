//! `phototis-editor` entrypoint: a thin demo binary that exercises the
//! History Engine end-to-end against a document on disk.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use core_model::CanonicalState;
use core_persist::FileStorageAdapter;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "phototis-editor", version, about = "Phototis editor core demo")]
struct Args {
    /// Directory documents are saved to / loaded from.
    #[arg(long, default_value = "./phototis-data")]
    data_dir: PathBuf,
    /// Storage key identifying the document within `data_dir`.
    #[arg(long, default_value = "default")]
    key: String,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Creates a fresh document and saves it.
    New {
        #[arg(long, default_value_t = 1920)]
        width: u32,
        #[arg(long, default_value_t = 1080)]
        height: u32,
    },
    /// Loads the document, prints a summary of HEAD and branches.
    Inspect,
    /// Runs garbage collection against the saved document.
    Gc,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) {
        let log_dir = Path::new(".");
        let file_appender = tracing_appender::rolling::never(log_dir, "phototis-editor.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_) => {
                // Global subscriber already installed (e.g. under test harness).
            }
        }
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging();
    AppStartup::install_panic_hook();

    let args = Args::parse();
    let config = core_persist::EditorConfig::load_from(&core_persist::EditorConfig::default_path())
        .context("loading editor config")?;
    tracing::info!(target: "runtime", data_dir = %args.data_dir.display(), "startup");

    let mut engine = core_history::HistoryEngine::new(CanonicalState::new(1, 1), engine_storage(&args.data_dir));
    engine.set_retention(config.retention);

    match args.command {
        CliCommand::New { width, height } => {
            let mut engine =
                core_history::HistoryEngine::new(CanonicalState::new(width, height), engine_storage(&args.data_dir));
            engine.save(&args.key).await.context("saving new document")?;
            println!("created {}x{} document at key {:?}", width, height, args.key);
        }
        CliCommand::Inspect => {
            let found = engine.load_at(&args.key).await.context("loading document")?;
            if !found {
                println!("no document stored at key {:?}", args.key);
                return Ok(());
            }
            println!("head: {:?}", engine.head());
            println!("branches:");
            for (name, at) in engine.list_branches() {
                println!("  {name} -> {at}");
            }
        }
        CliCommand::Gc => {
            let found = engine.load_at(&args.key).await.context("loading document")?;
            if !found {
                println!("no document stored at key {:?}", args.key);
                return Ok(());
            }
            engine.gc();
            engine.save(&args.key).await.context("saving after gc")?;
            println!(
                "gc complete, commits_created={}, gc_runs={}",
                engine.telemetry.commits_created.load(std::sync::atomic::Ordering::Relaxed),
                engine.telemetry.gc_runs.load(std::sync::atomic::Ordering::Relaxed)
            );
        }
    }

    Ok(())
}

fn engine_storage(data_dir: &Path) -> Arc<FileStorageAdapter> {
    Arc::new(FileStorageAdapter::new(data_dir))
}
