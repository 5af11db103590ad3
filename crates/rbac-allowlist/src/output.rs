//! Writing filter results.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{AllowlistError, Result};
use crate::input::ColumnLayout;
use crate::matching::{FilteredRow, MatchAnnotation};

/// File format for filter results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use csv, tsv, or json.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Write rows to any writer. Delimited output keeps the dataset's columns in
/// their original order; annotation columns are appended when any row has one.
pub fn write_rows<W: Write>(
    writer: W,
    headers: &[String],
    rows: &[FilteredRow],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writer.write_all(b"\n").map_err(|e| AllowlistError::Persistence(e.to_string()))?;
            Ok(())
        }
        OutputFormat::Csv | OutputFormat::Tsv => {
            let delimiter = if format == OutputFormat::Tsv { b'\t' } else { b',' };
            let mut csv_writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(writer);

            let annotated = rows.iter().any(|r| r.matched.is_some());
            let mut header_row: Vec<String> = headers.to_vec();
            if annotated {
                header_row.extend(MatchAnnotation::COLUMNS.iter().map(|c| c.to_string()));
            }
            csv_writer.write_record(&header_row)?;

            let layout = ColumnLayout::for_headers(headers);
            for filtered in rows {
                let mut values = layout.values(&filtered.row);
                if annotated {
                    match &filtered.matched {
                        Some(annotation) => values.extend(annotation.values()),
                        None => values.extend(MatchAnnotation::COLUMNS.iter().map(|_| String::new())),
                    }
                }
                csv_writer.write_record(&values)?;
            }

            csv_writer
                .flush()
                .map_err(|e| AllowlistError::Persistence(e.to_string()))?;
            Ok(())
        }
    }
}

/// Write rows to a file, creating parent directories as needed.
pub fn write_rows_to_path(
    path: impl AsRef<Path>,
    headers: &[String],
    rows: &[FilteredRow],
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| AllowlistError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let file = File::create(path).map_err(|e| AllowlistError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    write_rows(BufWriter::new(file), headers, rows, format)
}
