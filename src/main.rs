//! PoE Log Watcher CLI
//!
//! Prints events from the game's Client.txt as they are written.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poe_log_watcher::{parse_file, watch, CancellationToken, LogEvent, TailConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_PATH: &str =
    r"C:\Program Files (x86)\Grinding Gear Games\Path of Exile\logs\Client.txt";

#[derive(Parser)]
#[command(name = "poelog")]
#[command(about = "PoE Log Watcher - tail Client.txt as typed events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow new lines until Ctrl+C
    Watch {
        /// Client.txt path (defaults to the standard install location)
        path: Option<PathBuf>,
        /// Polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Config file (defaults to ~/.config/poe-log-watcher/config.json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Parse every complete line of an existing log
    Parse {
        /// Client.txt path (defaults to the standard install location)
        path: Option<PathBuf>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn print_event(event: &LogEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else {
        println!("{}", event);
    }
    Ok(())
}

fn log_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=poe_log_watcher=trace poelog watch
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("poe_log_watcher=info,poelog=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            path,
            interval_ms,
            config,
            json,
        } => {
            let mut tail_config = match config {
                Some(file) => TailConfig::from_file(file)?,
                None => TailConfig::load(),
            };
            if let Some(ms) = interval_ms {
                tail_config = tail_config.with_poll_interval(Duration::from_millis(ms));
            }

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl+C received, stopping");
                }
                on_ctrl_c.cancel();
            });

            let path = log_path(path);
            let mut stream = watch(&path, tail_config, &cancel)
                .await
                .with_context(|| format!("cannot watch {}", path.display()))?;

            eprintln!("Watching {} (Ctrl+C to stop)", path.display());
            while let Some(event) = stream.next().await {
                print_event(&event, json)?;
            }

            let stats = stream.finish().await?;
            info!(
                bytes = stats.bytes_read,
                lines = stats.lines_seen,
                unrecognized = stats.lines_unrecognized,
                events = stats.events_emitted,
                dropped = stats.bytes_dropped,
                "Session summary"
            );
        }
        Commands::Parse { path, json } => {
            let path = log_path(path);
            let events =
                parse_file(&path).with_context(|| format!("cannot read {}", path.display()))?;
            if events.is_empty() {
                warn!(path = %path.display(), "No recognized lines");
            }
            for event in &events {
                print_event(event, json)?;
            }
        }
    }

    Ok(())
}
