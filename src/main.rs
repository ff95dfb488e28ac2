//! # Geo Tracker
//!
//! Periodically sample this device's position and sync it to a collector.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse command line, load configuration
//!    - Set up logging (stderr, plus daily log files if configured)
//!    - Open the local store and restore any buffered samples
//!
//! 2. **Tracking**
//!    - Start a session: immediate sample + upload
//!    - Sample and upload on the configured cadences
//!    - Log session and upload status changes
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C stops the session
//!    - Wait (bounded) for the final upload to finish
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- --config config/default.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use geo_tracker::config::Config;
use geo_tracker::position::{FilePositionProvider, Sampler};
use geo_tracker::storage::{FileStore, SampleStore, TrackerPrefs};
use geo_tracker::sync::{HttpUploader, NoopKeepAlive, SyncStatus, Syncer};
use geo_tracker::tracking::TrackingController;

/// Default configuration file location
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How long shutdown waits for the final upload
const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "geo-tracker", version, about = "Sample device position and sync it to a collector")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Upload URL, overriding the configured one
    #[arg(long)]
    endpoint: Option<String>,

    /// Print the tracker id and exit
    #[arg(long)]
    print_id: bool,
}

/// Load the config file; a missing file at the default path means defaults
fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

fn init_logging(config: &Config) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    if config.logging.directory.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.logging.directory).with_context(|| {
        format!("Failed to create log directory {}", config.logging.directory)
    })?;
    let file_appender = tracing_appender::rolling::daily(&config.logging.directory, "geo-tracker.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(file_writer))
        .init();
    Ok(Some(guard))
}

/// Mirror session and upload state changes into the log
fn spawn_status_logger(controller: &TrackingController, tracker_id: String) {
    let mut enabled = controller.prefs().subscribe_tracking_enabled();
    tokio::spawn(async move {
        while enabled.changed().await.is_ok() {
            let on = *enabled.borrow_and_update();
            info!("Tracker {}: tracking {}", tracker_id, if on { "enabled" } else { "disabled" });
        }
    });

    let mut status = controller.syncer().subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if let SyncStatus::Failed { .. } = current {
                warn!("{}", current.message());
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(endpoint) = args.endpoint {
        config.server.endpoint = Some(endpoint);
        config.validate()?;
    }

    let _log_guard = init_logging(&config)?;

    let kv = FileStore::open(&config.storage.data_dir)
        .with_context(|| format!("Failed to open data directory {}", config.storage.data_dir))?;
    let prefs = Arc::new(TrackerPrefs::new(Arc::new(kv)));
    let tracker_id = prefs.tracker_id()?;

    if args.print_id {
        println!("{}", tracker_id);
        return Ok(());
    }

    info!("Geo Tracker v{} starting (tracker {})", env!("CARGO_PKG_VERSION"), tracker_id);

    let store = Arc::new(SampleStore::load(Arc::clone(&prefs)));
    let sampler = Arc::new(Sampler::new(
        Arc::new(FilePositionProvider::new(&config.positioning.fix_dir)),
        Arc::clone(&store),
    ));
    let syncer = Arc::new(Syncer::new(
        Arc::clone(&store),
        Arc::new(HttpUploader::new(config.timeout())?),
        Arc::new(NoopKeepAlive),
    ));
    let controller = TrackingController::new(sampler, syncer, prefs, config.schedule());

    spawn_status_logger(&controller, tracker_id.clone());

    let endpoint = config.endpoint(&tracker_id);
    controller.start(endpoint).await;
    info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    controller.stop().await;
    if tokio::time::timeout(SHUTDOWN_FLUSH_TIMEOUT, controller.wait_for_pending_syncs())
        .await
        .is_err()
    {
        warn!("Final sync did not finish within {:?}", SHUTDOWN_FLUSH_TIMEOUT);
    }
    info!("{} sample(s) left in buffer", store.len().await);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["geo-tracker"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(args.endpoint, None);
        assert!(!args.print_id);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "geo-tracker",
            "--config",
            "/etc/geo-tracker.toml",
            "--endpoint",
            "https://collector.example.com/update",
            "--print-id",
        ]);
        assert_eq!(args.config, PathBuf::from("/etc/geo-tracker.toml"));
        assert_eq!(args.endpoint.as_deref(), Some("https://collector.example.com/update"));
        assert!(args.print_id);
    }

    #[test]
    fn test_shipped_default_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = load_config(&path).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/geo-tracker.toml")).is_err());
    }

    #[test]
    fn test_shutdown_timeout_is_reasonable() {
        assert!(SHUTDOWN_FLUSH_TIMEOUT >= Duration::from_secs(5));
    }
}
