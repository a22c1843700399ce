//! Production CSV ingestion
//!
//! Reads a daily production export (Volve `DATEPRD` layout or a cleaned
//! extract) into a [`Dataset`]. The first column is the timestamp row key;
//! every other column becomes a channel.
//!
//! Column typing: a column with at least one numeric cell is a channel, and
//! every other cell in it must be a number or a missing marker. A column with
//! no numeric cell at all is text (well names, flow kind, ...); text columns
//! are skipped with a log line when `skip_text_columns` is set, and rejected
//! otherwise.

use super::{Dataset, DatasetError};
use crate::types::{parse_timestamp, TimeSeriesRecord};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Cell spellings treated as a missing reading.
const MISSING_MARKERS: [&str; 6] = ["", "nan", "na", "n/a", "null", "-"];

/// Errors raised while reading a production CSV
#[derive(Error, Debug)]
pub enum CsvError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV has no header row")]
    MissingHeader,

    #[error("CSV header has no data columns after the timestamp column")]
    NoDataColumns,

    #[error("Line {line}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidValue {
        line: usize,
        column: String,
        value: String,
    },

    #[error("Line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate timestamp {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("No data rows")]
    Empty,

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Options for CSV ingestion
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Skip columns without a single numeric cell instead of failing
    pub skip_text_columns: bool,
    /// Skip blank lines
    pub skip_blank_lines: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            skip_text_columns: true,
            skip_blank_lines: true,
        }
    }
}

/// Loads production CSV files into datasets
pub struct CsvLoader {
    options: CsvOptions,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self::new(CsvOptions::default())
    }
}

impl CsvLoader {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    /// Load a CSV file from disk.
    pub fn load(&self, path: &Path) -> Result<Dataset, CsvError> {
        let file = File::open(path).map_err(|source| CsvError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = self.read(BufReader::new(file), path)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            channels = dataset.channels().len(),
            "Loaded production CSV"
        );
        Ok(dataset)
    }

    /// Parse CSV text already in memory.
    pub fn parse_str(&self, contents: &str) -> Result<Dataset, CsvError> {
        self.read(contents.as_bytes(), Path::new("<memory>"))
    }

    fn read<R: Read>(&self, reader: R, path: &Path) -> Result<Dataset, CsvError> {
        let reader = BufReader::new(reader);
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, Ok(line))) if line.trim().is_empty() => continue,
                Some((_, Ok(line))) => break line,
                Some((_, Err(source))) => {
                    return Err(CsvError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
                }
                None => return Err(CsvError::MissingHeader),
            }
        };

        let columns: Vec<String> = csv_split(header.trim_start_matches('\u{feff}'))
            .into_iter()
            .map(|c| c.trim().to_string())
            .collect();
        if columns.len() < 2 {
            return Err(CsvError::NoDataColumns);
        }
        let width = columns.len();

        // (line number, timestamp, raw cells after the timestamp)
        let mut raw_rows: Vec<(usize, NaiveDateTime, Vec<String>)> = Vec::new();
        for (idx, line) in lines {
            let line_no = idx + 1;
            let line = line.map_err(|source| CsvError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() && self.options.skip_blank_lines {
                continue;
            }

            let mut fields = csv_split(&line);
            if fields.len() != width {
                return Err(CsvError::FieldCount {
                    line: line_no,
                    expected: width,
                    found: fields.len(),
                });
            }

            let ts = parse_timestamp(&fields[0]).ok_or_else(|| CsvError::InvalidTimestamp {
                line: line_no,
                value: fields[0].clone(),
            })?;
            fields.remove(0);
            raw_rows.push((line_no, ts, fields));
        }

        if raw_rows.is_empty() {
            return Err(CsvError::Empty);
        }

        let numeric = self.classify_columns(&columns[1..], &raw_rows)?;
        let channels: Vec<String> = numeric.iter().map(|&i| columns[i + 1].clone()).collect();
        if channels.is_empty() {
            return Err(CsvError::NoDataColumns);
        }

        let mut records = Vec::with_capacity(raw_rows.len());
        for (line_no, ts, cells) in &raw_rows {
            let mut values = Vec::with_capacity(numeric.len());
            for &col in &numeric {
                let value = parse_cell(&cells[col]).ok_or_else(|| CsvError::InvalidValue {
                    line: *line_no,
                    column: columns[col + 1].clone(),
                    value: cells[col].clone(),
                })?;
                values.push(value);
            }
            records.push(TimeSeriesRecord::new(*ts, values));
        }

        // Exports are not always date-sorted; order them and refuse duplicates.
        records.sort_by_key(|r| r.timestamp);
        if let Some(pair) = records.windows(2).find(|p| p[0].timestamp == p[1].timestamp) {
            return Err(CsvError::DuplicateTimestamp(pair[1].timestamp));
        }

        Ok(Dataset::new(channels, records)?)
    }

    /// Indices (relative to the data columns) of the numeric columns.
    fn classify_columns(
        &self,
        names: &[String],
        rows: &[(usize, NaiveDateTime, Vec<String>)],
    ) -> Result<Vec<usize>, CsvError> {
        let mut numeric = Vec::with_capacity(names.len());
        for (col, name) in names.iter().enumerate() {
            let has_number = rows
                .iter()
                .any(|(_, _, cells)| parse_cell(&cells[col]).is_some_and(|v| !v.is_nan()));
            // Mixed columns stay numeric; their bad cells fail during record parsing
            let text = if has_number {
                None
            } else {
                rows.iter().find(|(_, _, cells)| parse_cell(&cells[col]).is_none())
            };
            match text {
                None => numeric.push(col),
                Some((line, _, cells)) if !self.options.skip_text_columns => {
                    return Err(CsvError::InvalidValue {
                        line: *line,
                        column: name.clone(),
                        value: cells[col].clone(),
                    });
                }
                Some((line, _, cells)) => {
                    warn!(column = %name, line, value = %cells[col], "Skipping text column");
                }
            }
        }
        debug!(numeric = numeric.len(), total = names.len(), "Classified CSV columns");
        Ok(numeric)
    }
}

/// Parse one cell. Missing markers become `NaN`; anything else must be a number.
fn parse_cell(raw: &str) -> Option<f64> {
    let cell = raw.trim();
    if MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Some(f64::NAN);
    }
    cell.parse::<f64>().ok()
}

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            '\r' if !in_quotes => {}
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
