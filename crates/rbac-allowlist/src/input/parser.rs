//! Reading delimited audit exports into a raw table.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::source::{DataTable, DatasetSource};
use crate::error::{AllowlistError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Lines inspected when guessing the delimiter.
const SAMPLE_LINES: usize = 8;

/// Field separator of a dataset export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Semicolon,
    Pipe,
}

impl Delimiter {
    const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Tab,
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Pipe,
    ];

    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
            Delimiter::Semicolon => b';',
            Delimiter::Pipe => b'|',
        }
    }

    /// Short format name recorded in [`DatasetSource::format`].
    pub fn format(self) -> &'static str {
        match self {
            Delimiter::Comma => "csv",
            Delimiter::Tab => "tsv",
            Delimiter::Semicolon => "csv-semicolon",
            Delimiter::Pipe => "psv",
        }
    }

    /// Guess the separator from the start of a file.
    ///
    /// The winner splits every sampled line into the same number of fields,
    /// and more fields than the alternatives. Tab wins ties. A file with a
    /// single column falls back to comma.
    pub fn detect(bytes: &[u8]) -> Result<Delimiter> {
        let text = String::from_utf8_lossy(strip_bom(bytes));
        let sample: Vec<&str> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(SAMPLE_LINES)
            .collect();

        if sample.is_empty() {
            return Err(AllowlistError::EmptyData("dataset file is empty".to_string()));
        }
        let sample = sample.join("\n");

        let best = Self::CANDIDATES
            .into_iter()
            .filter_map(|candidate| {
                let widths = field_widths(sample.as_bytes(), candidate);
                let header_width = *widths.first()?;
                if header_width < 2 {
                    return None;
                }
                let consistent = widths.iter().all(|&w| w == header_width);
                Some(((consistent, header_width, candidate == Delimiter::Tab), candidate))
            })
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, candidate)| candidate);

        Ok(best.unwrap_or(Delimiter::Comma))
    }
}

/// Number of fields in each record of `bytes` when split on `delimiter`.
fn field_widths(bytes: &[u8], delimiter: Delimiter) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
        .records()
        .map_while(|record| record.ok())
        .map(|record| record.len())
        .collect()
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Fixed delimiter; `None` detects it from the file.
    pub delimiter: Option<Delimiter>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            quote: b'"',
        }
    }
}

/// Parses dataset exports. The first non-blank row is always the header.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Read a file and return the raw table plus metadata about the file.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, DatasetSource)> {
        let path = path.as_ref();

        let contents = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AllowlistError::FileNotFound {
                path: path.to_path_buf(),
                what: "Dataset".to_string(),
            },
            _ => AllowlistError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let delimiter = match self.config.delimiter {
            Some(delimiter) => delimiter,
            None => Delimiter::detect(&contents)?,
        };
        let table = self.parse_bytes(&contents, delimiter)?;
        let source = DatasetSource::describe(path, &contents, delimiter, table.row_count());

        Ok((table, source))
    }

    /// Parse in-memory bytes. A header-only input yields a table with no rows.
    ///
    /// Short rows are padded with empty cells; cells beyond the header width
    /// are dropped.
    pub fn parse_bytes(&self, bytes: &[u8], delimiter: Delimiter) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.byte())
            .quote(self.config.quote)
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(strip_bom(bytes));

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(String::is_empty) {
            return Err(AllowlistError::EmptyData(
                "dataset has no header row".to_string(),
            ));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        let mut ragged = 0usize;

        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            if row.len() != width {
                ragged += 1;
                row.resize(width, String::new());
            }
            rows.push(row);
        }

        if ragged > 0 {
            tracing::warn!(ragged, width, "rows with a different field count than the header");
        }

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_comma() {
        let data = b"objectId,displayName,role\nspn-1,app,Owner\nspn-2,app2,Contributor";
        assert_eq!(Delimiter::detect(data).unwrap(), Delimiter::Comma);
    }

    #[test]
    fn test_detect_tab() {
        let data = b"objectId\tdisplayName\trole\nspn-1\tapp, prod\tOwner";
        assert_eq!(Delimiter::detect(data).unwrap(), Delimiter::Tab);
    }

    #[test]
    fn test_detect_ignores_quoted_separators() {
        let data = b"name;scope\n\"app, prod\";rg1\n\"x, y, z\";rg2";
        assert_eq!(Delimiter::detect(data).unwrap(), Delimiter::Semicolon);
    }

    #[test]
    fn test_detect_single_column_and_empty() {
        assert_eq!(Delimiter::detect(b"objectId\nspn-1").unwrap(), Delimiter::Comma);
        assert!(matches!(
            Delimiter::detect(b"\n  \n"),
            Err(AllowlistError::EmptyData(_))
        ));
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let data = b"ObjectId,DisplayName,Role\nabc,app-one,Owner\ndef,app-two";
        let table = Parser::new().parse_bytes(data, Delimiter::Comma).unwrap();

        assert_eq!(table.headers, vec!["ObjectId", "DisplayName", "Role"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(1, 2), Some(""));
    }

    #[test]
    fn test_parse_strips_bom_and_blank_rows() {
        let data = b"\xEF\xBB\xBF ObjectId ,Role\n\nabc,Owner\n,\n";
        let table = Parser::new().parse_bytes(data, Delimiter::Comma).unwrap();

        assert_eq!(table.headers, vec!["ObjectId", "Role"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = Parser::new()
            .parse_bytes(b"ObjectId,Role\n", Delimiter::Comma)
            .unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let err = Parser::new().parse_file("/nonexistent/dataset.csv").unwrap_err();
        assert!(matches!(err, AllowlistError::FileNotFound { .. }));
    }
}
