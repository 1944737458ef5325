use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use welfare_board::config::Config;
use welfare_board::export::load_state;
use welfare_board::server::{self, StatusState};
use welfare_board::{
    ingest_bytes, Board, Exporter, Ingest, Pipeline, Quarantine, WatchOptions, WindowMode,
};

#[derive(Parser)]
#[command(name = "welfare-board", about = "Welfare check-in board for net control", version)]
struct Cli {
    /// Config file (defaults to ~/.config/welfare-board/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Force debug-level logging regardless of RUST_LOG.
    #[arg(long, global = true)]
    debug: bool,

    /// Append plain-text logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the inbox and keep the board rendered until Ctrl-C.
    Watch(WatchArgs),
    /// Parse and validate check-in files without touching any board.
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-render the board from a saved JSON snapshot.
    Render {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct WatchArgs {
    #[arg(long)]
    inbox: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    archive: Option<PathBuf>,
    #[arg(long)]
    error: Option<PathBuf>,
    /// off, annotate or reject.
    #[arg(long)]
    window_mode: Option<WindowMode>,
    /// Serve board JSON at this address (e.g. 127.0.0.1:8077).
    #[arg(long)]
    serve: Option<SocketAddr>,
    /// Start with an empty board instead of the saved snapshot.
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&cli, &config.logging.level)?;

    match cli.command {
        Command::Watch(args) => watch(config, args).await,
        Command::Check { files } => check(&config, &files),
        Command::Render { state, output } => render(&config, &state, output),
    }
}

fn init_logging(cli: &Cli, level: &str) -> anyhow::Result<()> {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(level))
    };

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
            tracing::info!("welfare-board log started, tail -f {}", path.display());
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }
    Ok(())
}

async fn watch(mut config: Config, args: WatchArgs) -> anyhow::Result<()> {
    if let Some(inbox) = args.inbox {
        config.watch.inbox = inbox;
    }
    if let Some(archive) = args.archive {
        config.watch.archive_dir = archive;
    }
    if let Some(error) = args.error {
        config.watch.error_dir = error;
    }
    if let Some(output) = args.output {
        config.output.dir = output;
    }
    if let Some(mode) = args.window_mode {
        config.policy.window_mode = mode;
    }
    config.validate()?;

    let exporter = build_exporter(&config, &config.output.dir);
    let board = Arc::new(restore_board(
        &exporter,
        config.policy.history_cap,
        args.fresh || !config.output.persist_state,
    )?);
    let pipeline = Pipeline::new(
        board,
        config.validation_policy()?,
        exporter,
        Quarantine::new(&config.watch.archive_dir, &config.watch.error_dir),
    );

    let listener = match args.serve {
        Some(addr) => Some(
            server::bind(addr)
                .await
                .with_context(|| format!("cannot bind status endpoint to {addr}"))?,
        ),
        None => None,
    };

    let handle = welfare_board::start(WatchOptions::from_config(&config.watch), pipeline).await?;

    let server = listener.map(|listener| {
        let state = StatusState {
            board: handle.board(),
            counters: handle.counters(),
        };
        tokio::spawn(server::serve(listener, state, handle.cancellation_token()))
    });

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for Ctrl-C")?;
    tracing::info!("interrupt received, finishing in-flight check-ins");

    let counters = handle.counters();
    handle.stop().await;
    let stats = counters.snapshot();
    if let Some(server) = server {
        server.await?.context("status endpoint failed")?;
    }
    tracing::info!(
        seen = stats.seen,
        new = stats.new,
        updates = stats.update,
        duplicates = stats.duplicate,
        rejected = stats.rejected,
        "session summary"
    );
    Ok(())
}

fn restore_board(exporter: &Exporter, history_cap: Option<usize>, fresh: bool) -> anyhow::Result<Board> {
    let path = exporter.state_path();
    if fresh || !path.exists() {
        return Ok(Board::with_history_cap(history_cap));
    }
    let snapshot = load_state(&path).with_context(|| {
        format!(
            "cannot restore board from {} (use --fresh to start empty)",
            path.display()
        )
    })?;
    tracing::info!(entries = snapshot.len(), path = %path.display(), "board restored");
    Ok(Board::restore(snapshot, history_cap))
}

fn check(config: &Config, files: &[PathBuf]) -> anyhow::Result<()> {
    let policy = config.validation_policy()?;
    let mut failed = 0usize;

    for path in files {
        let name = path.display();
        let result = std::fs::read(path)
            .with_context(|| format!("cannot read {name}"))
            .and_then(|bytes| {
                let ingest = Ingest::now(name.to_string());
                Ok(ingest_bytes(&bytes, ingest, &policy)?)
            });
        match result {
            Ok(record) => {
                let power = record.power.map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "ok    {name}: {} {} {} power={power} {}",
                    record.callsign, record.status, record.location, record.window
                );
            }
            Err(err) => {
                failed += 1;
                println!("FAIL  {name}: {err:#}");
                if let Some(ingest) = err.downcast_ref::<welfare_board::IngestError>() {
                    for violation in ingest.violations() {
                        println!("      - {violation}");
                    }
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed", files.len());
    }
    Ok(())
}

fn render(config: &Config, state: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let snapshot = load_state(state)?;
    let dir = output.unwrap_or_else(|| config.output.dir.clone());
    let written = build_exporter(config, &dir)
        .with_state(false)
        .write_all(&snapshot)?;
    for path in [&written.text, &written.html, &written.csv] {
        println!("{}", path.display());
    }
    Ok(())
}

fn build_exporter(config: &Config, dir: &Path) -> Exporter {
    Exporter::new(dir, &config.output.basename, config.output.render_options())
        .with_state(config.output.persist_state)
}
