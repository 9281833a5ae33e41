//! Logging system initialization
//!
//! Sets up tracing-based logging with file output to `<log_dir>/iconpack.log`
//! and rotation on startup keeping 9 historical files.

use crate::error::{IconPackError, Result, StringError};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Maximum number of historical log files to keep (iconpack.log.1 through iconpack.log.9)
const MAX_LOG_FILES: u8 = 9;

/// Base name of the log file
const LOG_FILE_NAME: &str = "iconpack.log";

/// Initialize the logging system
///
/// Log level defaults to INFO but can be configured via `RUST_LOG` environment variable.
pub fn init_logging(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;
    rotate_logs_on_startup(&log_dir.join(LOG_FILE_NAME))?;

    // Rotation is handled above, once per session
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("iconpack")
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| IconPackError::ConfigError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| IconPackError::ConfigError(Box::new(e)))?;

    tracing::info!("iconpack-engine v{} started", env!("CARGO_PKG_VERSION"));

    Ok(())
}

/// Shift `name.log.N` to `name.log.N+1`, dropping the oldest, and move the
/// current log to `name.log.1`
fn rotate_logs_on_startup(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let log_dir = log_path
        .parent()
        .ok_or_else(|| IconPackError::ConfigError(StringError::new("Invalid log path")))?;
    let log_name = log_path
        .file_name()
        .ok_or_else(|| IconPackError::ConfigError(StringError::new("Invalid log filename")))?
        .to_string_lossy();

    let oldest_log = log_dir.join(format!("{log_name}.{MAX_LOG_FILES}"));
    if oldest_log.exists() {
        std::fs::remove_file(&oldest_log)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let current_log = log_dir.join(format!("{log_name}.{i}"));
        if current_log.exists() {
            std::fs::rename(&current_log, log_dir.join(format!("{log_name}.{}", i + 1)))?;
        }
    }

    std::fs::rename(log_path, log_dir.join(format!("{log_name}.1")))?;
    Ok(())
}
