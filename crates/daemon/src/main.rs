use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orionis_core::{
    config_path, load_config_or_default, status_channel, validate_config, Config,
    DownloadWatcher, FileSorter, FsPlacer, LoggingConfig, Notifier, StatusListener,
    StatusMessage, StopSignal,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait for the status listener to flush on shutdown
const LISTENER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Renders status messages as log lines.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &StatusMessage) {
        info!(title = %message.title, "{}", message.text);
    }
}

#[tokio::main]
async fn main() {
    let config_path = config_path();

    // Console only until the log file settings are known
    let config = {
        let _console = tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .set_default();
        info!("Loading configuration from {:?}", config_path);
        load_config_or_default(&config_path)
    };

    let log_guard = init_logging(&config.logging);

    if let Err(e) = run(config).await {
        error!("Fatal error: {:#}", e);
        // exit() skips destructors; flush the log file first
        drop(log_guard);
        std::process::exit(1);
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// Install the global subscriber: console, plus a size-rotated log file when
/// enabled. The returned guard flushes the file writer when dropped.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let mut guard = None;
    let mut file_error = None;

    let file_layer = if logging.to_file {
        match open_log_file(logging) {
            Ok(appender) => {
                let (writer, writer_guard) = tracing_appender::non_blocking(appender);
                guard = Some(writer_guard);
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
            }
            Err(e) => {
                file_error = Some(e);
                None
            }
        }
    } else {
        None
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer);

    let json = std::env::var("ORIONIS_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(e) = file_error {
        warn!(
            "Cannot write log file {:?}, logging to the console only: {}",
            logging.file, e
        );
    }
    guard
}

fn open_log_file(logging: &LoggingConfig) -> std::io::Result<BasicRollingFileAppender> {
    if let Some(dir) = logging.file.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    BasicRollingFileAppender::new(
        &logging.file,
        RollingConditionBasic::new().max_size(logging.max_size_bytes),
        logging.keep,
    )
}

async fn run(config: Config) -> Result<()> {
    info!("Orionis {} starting", VERSION);

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Monitoring folder: {:?}", config.watch.root);
    info!(
        "{} categories, {} workers",
        config.categories.len(),
        config.sorter.workers
    );

    // Workers and the status listener stop separately so that messages from
    // files finishing during shutdown are still delivered.
    let sorter_stop = StopSignal::new();
    let listener_stop = StopSignal::new();

    let (status, status_rx) = status_channel(config.sorter.status_buffer);
    let placer = Arc::new(FsPlacer::new(config.placer.clone()));
    let sorter = FileSorter::new(&config, placer, status, sorter_stop)
        .with_context(|| format!("Cannot monitor {:?}", config.watch.root))?;

    let listener = StatusListener::new(status_rx, Arc::new(LogNotifier), listener_stop.clone());
    let listener_handle = tokio::spawn(listener.run());

    sorter.start().await;

    let watcher = match DownloadWatcher::start(sorter.root(), sorter.queue()) {
        Ok(watcher) => watcher,
        Err(e) => {
            sorter.stop().await;
            listener_stop.trigger();
            return Err(e).context("Failed to start folder watcher");
        }
    };

    if config.watch.sort_existing_on_start {
        if let Err(e) = sorter.sort_existing_files().await {
            warn!("Initial sort of existing files failed: {}", e);
        }
    }

    info!("Orionis is running, press Ctrl+C to stop");
    shutdown_signal().await;
    info!("Shutdown signal received");

    // Stop producing, then drain
    drop(watcher);
    sorter.stop().await;
    listener_stop.trigger();

    match tokio::time::timeout(LISTENER_STOP_TIMEOUT, listener_handle).await {
        Ok(Ok(delivered)) => info!("Status listener delivered {} notifications", delivered),
        Ok(Err(e)) => error!("Status listener task failed: {}", e),
        Err(_) => warn!("Status listener did not stop within {:?}", LISTENER_STOP_TIMEOUT),
    }

    let status = sorter.status();
    info!(
        "Orionis stopped: {} received, {} moved, {} skipped, {} rejected, {} failed, {} left in queue",
        status.received, status.moved, status.skipped, status.rejected, status.failed, status.queued
    );

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
