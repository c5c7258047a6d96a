#![forbid(unsafe_code)]

//! `life-remote-ctl`: interactive controller for `life-remote`.
//!
//! Loads the starting grid, starts a run on the coordinator and steers it
//! from the keyboard (`s` save, `q` quit, `p` pause/resume, each followed by
//! Enter). Exits 0 when every turn was computed and 1 otherwise.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use life_remote::models::Event;
use life_remote::persistence::{GridSource, PgmStore, SnapshotStore};
use life_remote::rpc::RemoteClient;
use life_remote::session::input::spawn_stdin_reader;
use life_remote::session::{LocalControl, RunControl, SessionController, SessionOutcome};
use life_remote::{AppError, Result, RunCoordinator, SessionConfig};

const EVENT_BUFFER: usize = 1024;
const KEY_BUFFER: usize = 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// How events are written to stdout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum EventFormat {
    /// One human-readable line per event.
    Text,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "life-remote-ctl",
    about = "Interactive controller for a life-remote server",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML session configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Coordinator address, `host:port`.
    #[arg(long)]
    server: Option<String>,

    /// Generations to compute.
    #[arg(long)]
    turns: Option<usize>,

    /// Grid width.
    #[arg(long)]
    width: Option<usize>,

    /// Grid height.
    #[arg(long)]
    height: Option<usize>,

    /// Directory holding `<width>x<height>.pgm` input images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Directory snapshots are written into.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Milliseconds between progress polls.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Run the coordinator in this process instead of connecting to one.
    #[arg(long)]
    local: bool,

    /// Event output format.
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    events: EventFormat,

    /// Log output format (text or json). Logs go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    /// Resolve the effective configuration: file (or defaults), then flags.
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load_from_path(path)?,
            None => SessionConfig::default(),
        };
        if let Some(server) = &self.server {
            config.server_addr.clone_from(server);
        }
        if let Some(turns) = self.turns {
            config.turns = turns;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(images) = &self.images {
            config.image_dir.clone_from(images);
        }
        if let Some(out) = &self.out {
            config.out_dir.clone_from(out);
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_interval_ms = tick_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build tokio runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(outcome) => {
            // stdin reader thread may still be blocked on a read.
            runtime.shutdown_timeout(Duration::from_millis(100));
            std::process::exit(outcome.exit_code());
        }
        Err(err) => {
            eprintln!("Error: {err}");
            if matches!(err, AppError::Transport(_)) {
                eprintln!("Is life-remote running and reachable?");
            }
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli) -> Result<SessionOutcome> {
    let config = args.session_config()?;
    info!(?config, "controller bootstrap");

    let control: Arc<dyn RunControl> = if args.local {
        info!("running coordinator in-process");
        Arc::new(LocalControl::new(Arc::new(RunCoordinator::new())))
    } else {
        Arc::new(RemoteClient::connect(&config.server_addr).await?)
    };
    let pgm = Arc::new(PgmStore::new(&config.image_dir, &config.out_dir));
    let source: Arc<dyn GridSource> = Arc::clone(&pgm) as Arc<dyn GridSource>;
    let store: Arc<dyn SnapshotStore> = pgm;

    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let printer = tokio::spawn(print_events(event_rx, args.events));

    let (key_tx, key_rx) = mpsc::channel(KEY_BUFFER);
    // Detached: the thread ends on its own once stdin closes or the receiver drops.
    let _stdin = spawn_stdin_reader(key_tx);

    let session = SessionController::new(
        control,
        source,
        store,
        config.params(),
        event_tx,
    )
    .with_tick(config.tick_interval());

    let outcome = session.run(key_rx).await;
    let _ = printer.await;
    outcome
}

async fn print_events(mut events: mpsc::Receiver<Event>, format: EventFormat) {
    while let Some(event) = events.recv().await {
        match format {
            EventFormat::Json => match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(%err, "failed to encode event"),
            },
            EventFormat::Text => {
                if let Some(line) = describe(&event) {
                    println!("{line}");
                } else {
                    debug!(?event, "event");
                }
            }
        }
    }
}

/// Human-readable line for an event. Per-cell flips are too noisy for the
/// terminal and only reach the debug log.
fn describe(event: &Event) -> Option<String> {
    match event {
        Event::CellFlipped { .. } => None,
        Event::AliveCellsCount { turn, count } => {
            Some(format!("Completed Turns {turn:<8} Alive Cells {count}"))
        }
        Event::StateChange { turn, new_phase } => {
            Some(format!("Completed Turns {turn:<8} {}", new_phase.as_str()))
        }
        Event::SnapshotPersisted { turn, label } => {
            Some(format!("Completed Turns {turn:<8} Saved {label}"))
        }
        Event::RunFinished { turn, alive_cells } => Some(format!(
            "Completed Turns {turn:<8} Final Alive Cells {}",
            alive_cells.len()
        )),
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
