//! Filesystem layout of a node.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::node::NodeConfig;

/// Expands a leading `~` against `$HOME`. Paths are returned unchanged when
/// `$HOME` is unset.
#[must_use]
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => &rest[1..],
        _ => return PathBuf::from(raw),
    };

    match env::var_os("HOME") {
        Some(home) if rest.is_empty() => PathBuf::from(home),
        Some(home) => Path::new(&home).join(rest),
        None => PathBuf::from(raw),
    }
}

impl NodeConfig {
    /// Creates [`NodeConfig::full_path`] and any missing parents. Safe to call
    /// repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_directories(&self) -> Result<PathBuf> {
        let path = self.full_path();
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create node directory {}", path.display()))?;
        debug!(path = %path.display(), "node directory ready");
        Ok(path)
    }
}
