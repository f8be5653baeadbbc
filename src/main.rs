//! SpeakBridge - speech playback for embedded web surfaces
//!
//! Host process: reads one inbound bridge message per line on stdin and
//! writes one outbound callback script per line on stdout.

use anyhow::Result;
use clap::Parser;
use speakbridge::bridge::{BridgeDispatcher, Dispatch};
use speakbridge::config::{Config, MalformedPolicy};
use speakbridge::{tts, volume};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Speech engine override: system or simulated
    #[arg(long)]
    engine: Option<String>,

    /// Report malformed messages to their callback as ERROR
    #[arg(long)]
    report_malformed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    if args.report_malformed {
        config.malformed_policy = MalformedPolicy::Report;
    }

    // Setup logging; stdout belongs to the surface
    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🗣️ SpeakBridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // The surface task is the only writer to stdout
    let (scripts, mut script_rx) = mpsc::unbounded_channel::<String>();
    let surface = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(script) = script_rx.recv().await {
            let line = script + "\n";
            if let Err(e) = stdout.write_all(line.as_bytes()).await {
                warn!("⚠️ Surface write failed: {}", e);
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let backend = tts::create_backend(&config);
    let probe = volume::create_probe(&config);
    let (dispatcher, session) = BridgeDispatcher::start(&config, backend, probe, scripts);

    info!("✅ SpeakBridge ready - post messages on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match dispatcher.post_message(line) {
            Dispatch::Undeliverable => {
                warn!("⚠️ Session ended; no longer accepting messages");
                break;
            }
            outcome => debug!("Inbound message: {:?}", outcome),
        }
    }

    info!("👋 Input closed, shutting down");
    let _ = dispatcher.session().shutdown();
    session.await?;

    // Dropping the dispatcher releases the last script sender
    drop(dispatcher);
    surface.await?;
    Ok(())
}
