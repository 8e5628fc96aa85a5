//! # Setup Logging
//!
//! Configures the global `tracing` subscriber:
//! - Level from `RUST_LOG` when set, otherwise from `LoggingOptions::log_level`.
//! - Human-readable console output with ANSI colors and targets.
//! - JSON lines to a daily rotating file named after the application.

use std::io;
use std::path::PathBuf;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Prefix of the rotating log files.
    pub app_name: String,
    /// Created if missing.
    pub log_dir: PathBuf,
    /// Fallback filter directive, e.g. "info" or "lib_whatpulse=debug".
    pub log_level: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            app_name: "whatpulse".to_string(),
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
        }
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the lifetime of the process.
///
/// # Errors
/// Fails if the log directory cannot be created, the level directive is
/// invalid, or a global subscriber is already installed.
pub fn setup_logging(options: &LoggingOptions) -> io::Result<WorkerGuard> {
    std::fs::create_dir_all(&options.log_dir)?;

    let file_appender = rolling::daily(&options.log_dir, format!("{}.log", options.app_name));
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.log_level))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    info!(level = %options.log_level, dir = %options.log_dir.display(), "Logging initialized");
    Ok(guard)
}
