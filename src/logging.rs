// src/logging.rs
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "rebalancer";
const MAX_LOG_FILES: usize = 30;

/// Installs the process-wide subscriber: compact stdout plus a daily rolling file in `log_dir`.
///
/// Keep the returned guard alive for the life of the process, dropping it flushes the file writer.
pub fn init_tracing(log_dir: &str) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .with_context(|| format!("failed to open log directory '{}'", log_dir))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = fmt::layer().with_target(false).compact();
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(guard)
}
