//! Logging context for one run.
//!
//! Instead of installing a process-wide subscriber, [`LogContext::init`] sets a
//! scoped default dispatcher and keeps the optional log file open. Call
//! [`LogContext::shutdown`] before exiting to flush the file and restore the
//! previous dispatcher.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::dispatcher::DefaultGuard;
use tracing::Level;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(rename = "Level", default = "default_level")]
    pub level: String,
    /// Log file written in addition to stdout.
    #[serde(rename = "File", default)]
    pub file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            file: None,
        }
    }
}

/// Parse log level string to tracing Level.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" | "information" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

pub struct LogContext {
    guard: Option<DefaultGuard>,
    file: Option<Arc<File>>,
}

impl LogContext {
    /// Builds the subscriber (stdout, plus the log file when configured) and
    /// makes it the default for the current thread.
    pub fn init(config: &LoggingConfig) -> std::io::Result<Self> {
        let level = parse_level(&config.level);
        let filter = EnvFilter::from_default_env().add_directive(level.into());

        let file = match &config.file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Arc::new(file))
            }
            None => None,
        };

        let writer = match &file {
            Some(file) => BoxMakeWriter::new(std::io::stdout.and(file.clone())),
            None => BoxMakeWriter::new(std::io::stdout),
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false),
            )
            .with(filter);

        let guard = tracing::subscriber::set_default(subscriber);
        Ok(LogContext {
            guard: Some(guard),
            file,
        })
    }

    /// Restores the previous dispatcher and flushes the log file to disk.
    pub fn shutdown(mut self) {
        self.guard.take();
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sync_all() {
                eprintln!("failed to flush log file: {e}");
            }
        }
    }
}
