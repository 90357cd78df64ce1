//! `tracing` subscriber setup.
//!
//! Logs go to stderr in text or JSON form. When a log file is configured a
//! second, non-ANSI layer writes to it through a daily-rolling appender; the
//! returned guard must be kept alive so buffered lines are flushed on exit.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LogFormat;

const FALLBACK_LEVEL: &str = "info";

/// Keeps the file writer alive for the lifetime of the process.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Build the level filter. `verbose` raises this crate to `debug`.
pub fn build_filter(level: &str, verbose: bool) -> EnvFilter {
    let directive = if verbose {
        format!("{},issue_tracker=debug", level)
    } else {
        level.to_string()
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}

pub fn init(level: &str, format: LogFormat, file: Option<&Path>, verbose: bool) -> Result<LogGuard> {
    let filter = build_filter(level, verbose);

    let stderr_layer = match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = match format {
                LogFormat::Text => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
                LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}
