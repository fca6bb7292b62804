//! Output directory resolution.
//!
//! Resolved once at startup and passed to the components that write files —
//! nothing searches the filesystem at collection time. An explicit
//! `--data-dir` bypasses this entirely.

use crate::error::CollectError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Search `start` and its ancestors for an existing directory named
/// `folder`; if none exists, create `<start's parent>/<folder>`.
pub fn resolve_data_dir(start: &Path, folder: &str) -> Result<PathBuf, CollectError> {
    for dir in start.ancestors() {
        let candidate = dir.join(folder);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    let fallback = start.parent().unwrap_or(start).join(folder);
    fs::create_dir_all(&fallback)?;
    info!(path = %fallback.display(), "created data folder");
    Ok(fallback)
}
