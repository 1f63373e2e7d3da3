use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use s3relay::config::{AppState, Config, DEFAULT_CONFIG_PATH};
use s3relay::logger::{self, EventLog, TracingEventLog};
use s3relay::relay;
use s3relay::server::{create_reusable_listener, run_server_loop, start_signal_handler};
use s3relay::store::{ObjectRef, ObjectStore, S3ObjectStore};

#[derive(Parser, Debug)]
#[command(
    name = "s3relay",
    version,
    about = "Range-addressable streaming relay for S3-compatible object stores"
)]
struct Cli {
    /// Config file path without extension (config.toml is read as "config")
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP relay (default)
    Serve,
    /// Download one whole object from the configured bucket into a local file
    Fetch {
        /// Object key within the bucket
        key: String,

        /// Destination file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;

    // Size the runtime from server.workers, CPU count otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cli.command.unwrap_or(Command::Serve), cfg))
}

async fn async_main(command: Command, cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = logger::init(&cfg.logging)?;

    let events: Arc<dyn EventLog> = Arc::new(TracingEventLog::new(&cfg.logging));
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(&cfg.store).await);

    match command {
        Command::Serve => serve(cfg, store, events).await,
        Command::Fetch { key, output } => fetch(&cfg, store, events.as_ref(), key, &output).await,
    }
}

async fn serve(
    cfg: Config,
    store: Arc<dyn ObjectStore>,
    events: Arc<dyn EventLog>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr, cfg.server.backlog)?;

    let state = Arc::new(AppState::new(cfg, store, events));
    start_signal_handler(state.shutdown.clone())?;
    logger::log_server_start(&addr, &state.config);

    run_server_loop(listener, state).await;
    info!("Relay stopped");
    Ok(())
}

async fn fetch(
    cfg: &Config,
    store: Arc<dyn ObjectStore>,
    events: &dyn EventLog,
    key: String,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    start_signal_handler(shutdown.clone())?;

    let object = ObjectRef::new(cfg.store.bucket.as_str(), key);
    info!("Fetching {object} into {}", output.display());

    let summary = relay::download(
        store,
        object,
        output,
        cfg.stream.chunk_size,
        events,
        shutdown,
    )
    .await?;

    info!(
        "Saved {} bytes in {} chunks to {}",
        summary.bytes,
        summary.chunks,
        output.display()
    );
    Ok(())
}
