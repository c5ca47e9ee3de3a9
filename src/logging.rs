//! Logging bootstrap.
//!
//! Logs go to stderr. With a log directory configured they go to size-rotated
//! files instead, and warnings are still echoed to stderr.

use anyhow::{Context, Result};
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::info;

use crate::config::LogConfig;

const LOG_FILE_BASENAME: &str = "student-records";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

/// Start the logger. Keep the returned handle alive for the life of the process.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> Result<LoggerHandle> {
    let logger = Logger::try_with_env_or_str(&config.log_level)
        .with_context(|| format!("invalid log level `{}`", config.log_level))?
        .format(flexi_logger::detailed_format);

    let logger = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .duplicate_to_stderr(Duplicate::Warn)
                .append()
        }
        None => logger.log_to_stderr(),
    };

    let handle = logger.start().context("failed to start logger")?;

    info!(
        "event=app_start status=ok version={} level={}",
        crate::VERSION,
        config.log_level
    );
    Ok(handle)
}
