//! Tracing subscriber setup.
//!
//! Stdout carries the JSON-RPC protocol, so every layer writes to stderr or
//! to the optional rolling log file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Log file prefix inside the logs directory (`eventkit-mcp.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "eventkit-mcp.log";

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. When file logging is
/// enabled the returned guard must be held until shutdown so buffered
/// records are flushed.
pub fn init_tracing(config: &LoggingConfig, logs_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if config.file {
        let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer);
        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();
        if installed.is_err() {
            return None;
        }
        Some(guard)
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init();
        None
    }
}
