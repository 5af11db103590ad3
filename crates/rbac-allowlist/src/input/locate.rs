//! Locating the latest dataset export in a directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{AllowlistError, Result};

/// Find the most recently modified file in `dir` whose name starts with `prefix`.
///
/// Ties on modification time are broken by file name, latest name first, so
/// date-stamped exports resolve predictably.
pub fn latest_dataset(dir: impl AsRef<Path>, prefix: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();

    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AllowlistError::FileNotFound {
            path: dir.to_path_buf(),
            what: "Dataset directory".to_string(),
        },
        _ => AllowlistError::Io {
            path: dir.to_path_buf(),
            source: e,
        },
    })?;

    let mut candidates: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(prefix)
        })
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

    let (_, latest) = candidates
        .into_iter()
        .next()
        .ok_or_else(|| AllowlistError::FileNotFound {
            path: dir.join(format!("{}*", prefix)),
            what: "Dataset matching prefix".to_string(),
        })?;

    tracing::debug!(path = %latest.display(), "resolved latest dataset");
    Ok(latest)
}
