//! Reading and writing the exception store file.

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AllowlistError, Result};
use crate::exception::{ApprovalKind, ExceptionDraft, ExceptionRecord};

/// On-disk shape of the store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreLayout {
    /// A single JSON array of records.
    #[default]
    Flat,
    /// `{ "SecArchExceptions": [...], "ActionPlanExceptions": [...] }`.
    Partitioned,
}

impl std::str::FromStr for StoreLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flat" => Ok(StoreLayout::Flat),
            "partitioned" => Ok(StoreLayout::Partitioned),
            _ => Err(format!("Unknown store layout: {}. Use flat or partitioned.", s)),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartitionedDocument {
    #[serde(rename = "SecArchExceptions", default)]
    sec_arch: Vec<ExceptionRecord>,
    #[serde(rename = "ActionPlanExceptions", default)]
    action_plan: Vec<ExceptionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoreDocument {
    Flat(Vec<ExceptionRecord>),
    Partitioned(PartitionedDocument),
}

/// Contents of a store file as read from disk.
#[derive(Debug)]
pub(crate) struct LoadedStore {
    pub records: Vec<ExceptionRecord>,
    pub layout: Option<StoreLayout>,
    pub fingerprint: Option<String>,
}

pub(crate) fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Read a store file. A missing file yields an empty store with no layout.
pub(crate) fn read_store(path: &Path) -> Result<LoadedStore> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "exception store not found, starting empty");
            return Ok(LoadedStore {
                records: Vec::new(),
                layout: None,
                fingerprint: None,
            });
        }
        Err(e) => {
            return Err(AllowlistError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let fingerprint = Some(fingerprint(&bytes));

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoadedStore {
            records: Vec::new(),
            layout: None,
            fingerprint,
        });
    }

    let document: StoreDocument = serde_json::from_slice(&bytes).map_err(|e| {
        AllowlistError::Persistence(format!(
            "Failed to parse exception store '{}': {}",
            path.display(),
            e
        ))
    })?;

    let (records, layout) = match document {
        StoreDocument::Flat(records) => (records, StoreLayout::Flat),
        StoreDocument::Partitioned(doc) => {
            check_partition(&doc.sec_arch, ApprovalKind::SecArch, "SecArchExceptions")?;
            check_partition(&doc.action_plan, ApprovalKind::ActionPlan, "ActionPlanExceptions")?;
            let mut records = doc.sec_arch;
            records.extend(doc.action_plan);
            (records, StoreLayout::Partitioned)
        }
    };

    validate_records(&records)?;

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        layout = ?layout,
        "loaded exception store"
    );

    Ok(LoadedStore {
        records,
        layout: Some(layout),
        fingerprint,
    })
}

fn check_partition(records: &[ExceptionRecord], kind: ApprovalKind, name: &str) -> Result<()> {
    match records.iter().find(|r| r.approval_kind() != kind) {
        Some(misplaced) => Err(AllowlistError::Persistence(format!(
            "Record '{}' in {} has a {} approval",
            misplaced.unique_id,
            name,
            misplaced.approval_kind()
        ))),
        None => Ok(()),
    }
}

/// Re-run the construction invariants on every stored record.
fn validate_records(records: &[ExceptionRecord]) -> Result<()> {
    for record in records {
        ExceptionDraft::from_rule(&record.rule, Some(record.last_modified_by.clone()))
            .validate()
            .map_err(|e| {
                AllowlistError::Persistence(format!(
                    "Stored record '{}' is invalid: {}",
                    record.unique_id, e
                ))
            })?;
    }
    Ok(())
}

/// Serialize records in the given layout.
pub(crate) fn encode_store(records: &[ExceptionRecord], layout: StoreLayout) -> Result<Vec<u8>> {
    let mut bytes = match layout {
        StoreLayout::Flat => serde_json::to_vec_pretty(records)?,
        StoreLayout::Partitioned => {
            let (sec_arch, action_plan): (Vec<ExceptionRecord>, Vec<ExceptionRecord>) = records
                .iter()
                .cloned()
                .partition(|r| r.approval_kind() == ApprovalKind::SecArch);
            serde_json::to_vec_pretty(&PartitionedDocument {
                sec_arch,
                action_plan,
            })?
        }
    };
    bytes.push(b'\n');
    Ok(bytes)
}

/// Overwrite the store file, creating parent directories as needed.
pub(crate) fn write_store(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                AllowlistError::Persistence(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    fs::write(path, bytes).map_err(|e| {
        AllowlistError::Persistence(format!(
            "Failed to write exception store '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Hash of the store file as it currently is on disk, if it exists.
pub(crate) fn current_fingerprint(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(fingerprint(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AllowlistError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Copy the current store file into its history directory.
///
/// File structure after calling:
/// ```text
/// data/
/// ├── exceptions.json
/// └── exceptions.history/
///     ├── 2024-12-30T10-00-00-123-000.json
///     └── 2024-12-30T10-00-00-123-001.json
/// ```
///
/// The counter suffix keeps archives taken within the same millisecond apart.
pub(crate) fn archive_to_history(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }

    let history_dir = history_directory(path);
    if !history_dir.exists() {
        fs::create_dir_all(&history_dir).map_err(|e| {
            AllowlistError::Persistence(format!(
                "Failed to create history directory '{}': {}",
                history_dir.display(),
                e
            ))
        })?;
    }

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3f").to_string();
    let archive_error = |target: &Path, e: io::Error| {
        AllowlistError::Persistence(format!(
            "Failed to archive '{}' to '{}': {}",
            path.display(),
            target.display(),
            e
        ))
    };

    let mut counter = 0u32;
    let (history_file, mut archive) = loop {
        let candidate = history_dir.join(format!("{}-{:03}.json", timestamp, counter));
        match File::create_new(&candidate) {
            Ok(file) => break (candidate, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(archive_error(&candidate, e)),
        }
    };

    let mut current = File::open(path).map_err(|e| archive_error(&history_file, e))?;
    io::copy(&mut current, &mut archive).map_err(|e| archive_error(&history_file, e))?;

    Ok(Some(history_file))
}

/// List all archived versions of a store file, newest first.
pub fn list_history(path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let history_dir = history_directory(path.as_ref());

    if !history_dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<PathBuf> = fs::read_dir(&history_dir)
        .map_err(|e| {
            AllowlistError::Persistence(format!(
                "Failed to read history directory '{}': {}",
                history_dir.display(),
                e
            ))
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    // Timestamped names sort chronologically
    entries.sort_by(|a, b| b.cmp(a));

    Ok(entries)
}

/// Get the history directory for a store file.
fn history_directory(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let parent = path.parent().unwrap_or(Path::new("."));

    parent.join(format!("{}.history", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_directory() {
        let path = Path::new("data/exceptions.json");
        assert_eq!(
            history_directory(path).to_string_lossy(),
            "data/exceptions.history"
        );
    }

    #[test]
    fn test_layout_detection() {
        let flat: StoreDocument = serde_json::from_str("[]").unwrap();
        assert!(matches!(flat, StoreDocument::Flat(_)));

        let partitioned: StoreDocument =
            serde_json::from_str(r#"{"SecArchExceptions": [], "ActionPlanExceptions": []}"#)
                .unwrap();
        assert!(matches!(partitioned, StoreDocument::Partitioned(_)));
    }

    #[test]
    fn test_archives_in_quick_succession_are_all_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("exceptions.json");

        let mut archived = Vec::new();
        for version in 0..5 {
            fs::write(&path, format!("[{}]", version)).unwrap();
            archived.push(archive_to_history(&path).unwrap().unwrap());
        }

        let history = list_history(&path).unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0], archived[4]);
        assert_eq!(fs::read_to_string(&history[0]).unwrap(), "[4]");
        assert_eq!(fs::read_to_string(&history[4]).unwrap(), "[0]");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint(b"[]"), fingerprint(b"[]"));
        assert_ne!(fingerprint(b"[]"), fingerprint(b"[ ]"));
        assert!(fingerprint(b"").starts_with("sha256:"));
    }
}
