//! Logging setup for the sheetflow binary.
//!
//! Pipelines report progress through `tracing` macros. This module installs the
//! subscriber: a console layer on stderr plus, when enabled, a daily rolling file in
//! the platform data directory. `RUST_LOG` overrides the configured level.
//!
//! ```no_run
//! use sheetflow::{config::EngineConfig, logging};
//!
//! logging::init(&EngineConfig::default()).expect("Failed to initialize logging");
//! tracing::info!("ready");
//! ```

use crate::config::EngineConfig;
use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Gets the log directory, creating it when missing
///
/// - Windows: `%APPDATA%/sheetflow/logs`
/// - macOS: `~/Library/Application Support/sheetflow/logs`
/// - Linux: `~/.local/share/sheetflow/logs`
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    let log_dir = base_dir.join("sheetflow").join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn env_filter(default_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level: {default_level}"))
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when the log level does not parse, the log directory cannot be created, or a
/// subscriber is already installed.
pub fn init(config: &EngineConfig) -> Result<()> {
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, log_dir) = if config.log_to_file {
        let log_dir = get_log_dir()?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(10)
            .filename_prefix("sheetflow")
            .filename_suffix("log")
            .build(&log_dir)
            .context("Failed to create log file appender")?;
        let layer = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(appender);
        (Some(layer), Some(log_dir))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level)?)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging to {}", dir.display());
    }
    Ok(())
}

/// Console-only logging at `level`.
pub fn init_console(level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(level)?)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install tracing subscriber")
}
