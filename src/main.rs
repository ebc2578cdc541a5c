//! treesync - directory listing and live sync engine
//!
//! Entry point for the treesync CLI.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use treesync::observability::init_tracing;
use treesync::sync::{IgnoreConfig, IgnoreMode, SyncCoordinator, SyncEvent};
use treesync::Config;

/// treesync - directory listing and live sync engine
#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directory to list
    root: PathBuf,

    /// How directory-local exclusion files are treated
    #[arg(long, env = "TREESYNC_MODE", value_enum, default_value = "automatic")]
    mode: ModeArg,

    /// Additional exclusion patterns (gitignore syntax)
    #[arg(short, long, env = "TREESYNC_IGNORE", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Keep watching after the scan and stream change events
    #[arg(short, long)]
    watch: bool,

    /// Print the resolved pattern sets and exit
    #[arg(long)]
    show_patterns: bool,

    /// Maximum file size in bytes; larger files are listed but skipped
    #[arg(long, env = "TREESYNC_MAX_FILE_SIZE", default_value = "1048576")]
    max_file_size: u64,

    /// Number of walker threads (defaults to the host's core count, capped)
    #[arg(long, env = "TREESYNC_THREADS")]
    threads: Option<usize>,

    /// Quiet interval in milliseconds before a change is propagated
    #[arg(long, env = "TREESYNC_DEBOUNCE_MS", default_value = "500")]
    debounce_ms: u64,

    /// Wall-clock budget in seconds for the scan
    #[arg(long, env = "TREESYNC_TIMEOUT_SECS", default_value = "300")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TREESYNC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "TREESYNC_LOG_JSON")]
    log_json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    /// Merge discovered exclusion files with defaults and custom patterns
    Automatic,
    /// Defaults plus custom patterns only, no recursive discovery
    Global,
}

impl From<ModeArg> for IgnoreMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Automatic => Self::Automatic,
            ModeArg::Global => Self::Global,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with configuration
    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("treesync v{} starting...", env!("CARGO_PKG_VERSION"));

    // Build config from CLI
    let defaults = Config::default();
    let config = Config {
        max_file_size: cli.max_file_size,
        scan_threads: cli.threads.unwrap_or(defaults.scan_threads),
        debounce: Duration::from_millis(cli.debounce_ms),
        scan_timeout: Duration::from_secs(cli.timeout_secs),
        log_level: cli.log_level,
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    let ignore = IgnoreConfig {
        mode: cli.mode.into(),
        custom_patterns: cli.ignore,
    };

    let (mut coordinator, events_rx) = SyncCoordinator::new(config);

    if cli.show_patterns {
        let patterns = coordinator.ignore_patterns(&cli.root, &ignore)?;
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    // Progress goes to the log; listing records and change events are JSON
    // lines on stdout.
    let printer = tokio::spawn(async move {
        let mut events = ReceiverStream::new(events_rx);
        while let Some(event) = events.next().await {
            match event {
                SyncEvent::Progress(progress) => {
                    tracing::info!(
                        directories = progress.directories,
                        files = progress.files,
                        "Scan progress"
                    );
                }
                other => {
                    if let Ok(line) = serde_json::to_string(&other) {
                        println!("{line}");
                    }
                }
            }
        }
    });

    let outcome = coordinator.open_root(&cli.root, ignore).await?;

    for record in &outcome.records {
        println!("{}", serde_json::to_string(record)?);
    }

    tracing::info!(
        status = ?outcome.status,
        directories = outcome.progress.directories,
        files = outcome.progress.files,
        errors = outcome.error_count,
        "Listing delivered"
    );

    if cli.watch {
        tracing::info!(root = %cli.root.display(), "Watching for changes, Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    }

    coordinator.close_root().await;
    drop(coordinator);
    printer.await?;

    Ok(())
}
