//! The raw parsed table and metadata about the file it came from.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::parser::Delimiter;

/// Identifies the dataset export a filter pass ran against, so a report can
/// be traced back to the exact file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSource {
    pub file: String,
    pub path: PathBuf,
    /// `sha256:<hex>` of the raw bytes.
    pub hash: String,
    pub size_bytes: u64,
    /// `csv`, `tsv`, `csv-semicolon` or `psv`.
    pub format: String,
    /// Data rows, header excluded.
    pub row_count: usize,
    pub loaded_at: DateTime<Utc>,
}

impl DatasetSource {
    /// Describe a file from the bytes that were read from it.
    pub fn describe(path: &Path, contents: &[u8], delimiter: Delimiter, row_count: usize) -> Self {
        Self {
            file: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            hash: format!("sha256:{:x}", Sha256::digest(contents)),
            size_bytes: contents.len() as u64,
            format: delimiter.format().to_string(),
            row_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Header plus cells, before any column is given a meaning.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub headers: Vec<String>,
    /// Every row is exactly `headers.len()` cells wide.
    pub rows: Vec<Vec<String>>,
    pub delimiter: Delimiter,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, delimiter: Delimiter) -> Self {
        Self {
            headers,
            rows,
            delimiter,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_file() {
        let source = DatasetSource::describe(
            Path::new("exports/rbac_audit_2025.csv"),
            b"objectId,role\n",
            Delimiter::Comma,
            0,
        );

        assert_eq!(source.file, "rbac_audit_2025.csv");
        assert_eq!(source.format, "csv");
        assert_eq!(source.size_bytes, 14);
        assert!(source.hash.starts_with("sha256:"));
        assert_eq!(source.hash.len(), "sha256:".len() + 64);
    }
}
