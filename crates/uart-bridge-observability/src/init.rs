// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature, JSON logs are also
//! written to a timestamped folder per run:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── uart-bridge.log
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
#[cfg(feature = "file-logging")]
use crate::config::FileLogging;
use crate::config::{LogFormat, LoggingOptions};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Folder of this run's log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Filter directives: `RUST_LOG` when set, otherwise the debug flags over `level`
pub fn filter_directives(debug_flags: &CrateDebugFlags, level: &str) -> String {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => directives,
        _ => debug_flags.to_filter_string(level),
    }
}

fn env_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Fails if the filter is invalid, the log folder cannot be created, or a
/// global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let directives = filter_directives(debug_flags, &options.level);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match options.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_filter(env_filter(&directives)?)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_thread_names(true)
            .with_filter(env_filter(&directives)?)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guard, log_dir) = match &options.file {
        Some(file) => {
            let (layer, guard, run_folder) = file_layer(file, &directives)?;
            layers.push(layer);
            (Some(guard), Some(run_folder))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir: Option<PathBuf> = None;
    let file_logging_unavailable = cfg!(not(feature = "file-logging")) && options.file.is_some();

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install global tracing subscriber")?;

    if file_logging_unavailable {
        tracing::warn!("File logging requested but this build lacks the `file-logging` feature");
    }
    if !debug_flags.unknown_crates().is_empty() {
        tracing::warn!(crates = ?debug_flags.unknown_crates(), "Debug flags name unknown crates");
    }
    tracing::debug!(filter = %directives, "Logging initialized");

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir,
    })
}

/// JSON file layer writing into a fresh `run_<timestamp>` folder
#[cfg(feature = "file-logging")]
fn file_layer(
    file: &FileLogging,
    directives: &str,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    let run_folder = file.log_dir.join(format!(
        "{}{}",
        RUN_PREFIX,
        Utc::now().format(RUN_TIMESTAMP_FORMAT)
    ));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    cleanup_old_logs(
        &file.log_dir,
        file.retention_days,
        file.retention_runs.saturating_sub(1),
        Utc::now(),
        Some(&run_folder),
    )?;

    let appender = tracing_appender::rolling::never(&run_folder, "uart-bridge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter(directives)?)
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Remove old `run_*` folders under `base_log_dir`
///
/// A run is removed when it is older than `retention_days`, or when more than
/// `retention_runs` newer runs exist. `active_run` is never removed. Returns
/// the number of folders removed.
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
    now: DateTime<Utc>,
    active_run: Option<&Path>,
) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let cutoff = now - chrono::Duration::days(retention_days as i64);
    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();

    for entry in std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to read log directory: {}", base_log_dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() || active_run.is_some_and(|active| active == path.as_path()) {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|ts| NaiveDateTime::parse_from_str(ts, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started.and_utc()));
        }
    }

    // Oldest first
    runs.sort_by_key(|(_, started)| *started);
    let keep_from = runs.len().saturating_sub(retention_runs);

    let mut removed = 0;
    for (index, (path, started)) in runs.iter().enumerate() {
        if index >= keep_from && *started >= cutoff {
            continue;
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}
