//! Log output for capability nodes.
//!
//! [`init`] installs a global `tracing` subscriber once per process, writing
//! either to stdout or to a log file under the node directory.

#![warn(missing_docs, clippy::pedantic)]

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// File name used when logging into a node directory.
pub const LOG_FILE_NAME: &str = "node.log";

/// Subscriber settings.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    filter: String,
    log_file: Option<PathBuf>,
    env_override: bool,
}

impl TelemetryConfig {
    /// Logs to stdout at the supplied filter directive (e.g. `info`).
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            log_file: None,
            env_override: true,
        }
    }

    /// Appends to [`LOG_FILE_NAME`] inside `dir` instead of stdout.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.log_file = Some(dir.as_ref().join(LOG_FILE_NAME));
        self
    }

    /// Whether `RUST_LOG` replaces the configured directive. Enabled by
    /// default.
    #[must_use]
    pub fn with_env_override(mut self, enabled: bool) -> Self {
        self.env_override = enabled;
        self
    }

    /// Log file path, when logging to a file.
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        if self.env_override {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(&self.filter)
            .with_context(|| format!("invalid log filter {:?}", self.filter))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is malformed, the log file cannot be
/// opened, or a subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.log_file() {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };

    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
