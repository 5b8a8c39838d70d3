use std::fs::{self, File, OpenOptions};

use camino::Utf8Path;
use csv::{ReaderBuilder, Writer, WriterBuilder};
use tracing::{debug, warn};

use crate::error::CanvasError;

pub const INDEX_COLUMN: &str = "index";
pub const STATUS_COLUMN: &str = "status";
pub const DETAIL_COLUMN: &str = "detail";

/// One line of a result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub index: usize,
    pub columns: Vec<String>,
    pub status: String,
    pub detail: String,
}

impl ResultRow {
    pub fn new(index: usize, columns: Vec<String>, status: &str, detail: &str) -> Self {
        Self {
            index,
            columns: columns.iter().map(|value| one_line(value)).collect(),
            status: status.to_string(),
            detail: one_line(detail),
        }
    }
}

/// Append-only CSV whose data row count is the resume offset.
pub struct ResultFile {
    writer: Writer<File>,
    rows: usize,
    next_min_index: usize,
    width: usize,
}

impl ResultFile {
    pub fn header(columns: &[&str]) -> Vec<String> {
        std::iter::once(INDEX_COLUMN)
            .chain(columns.iter().copied())
            .chain([STATUS_COLUMN, DETAIL_COLUMN])
            .map(|value| value.to_string())
            .collect()
    }

    /// Opens `path` for appending. `force` discards earlier results.
    pub fn open(path: &Utf8Path, columns: &[&str], force: bool) -> Result<Self, CanvasError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
        }
        let header = Self::header(columns);

        if force && path.as_std_path().exists() {
            debug!(path = %path, "truncating result file");
            fs::remove_file(path.as_std_path())
                .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
        }

        let mut rows = 0usize;
        let mut next_min_index = 0usize;
        let mut has_header = false;
        if path.as_std_path().exists() {
            drop_partial_trailing_line(path)?;
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(path.as_std_path())
                .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
            for (line, record) in reader.records().enumerate() {
                let record =
                    record.map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
                if line == 0 {
                    if !record.iter().eq(header.iter().map(String::as_str)) {
                        return Err(CanvasError::ResultWrite(format!(
                            "{path} has a different header; rerun with --force"
                        )));
                    }
                    has_header = true;
                    continue;
                }
                rows += 1;
                if let Some(index) = record.get(0).and_then(|value| value.parse::<usize>().ok()) {
                    next_min_index = next_min_index.max(index + 1);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if !has_header {
            writer
                .write_record(&header)
                .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
            writer
                .flush()
                .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
        }

        Ok(Self {
            writer,
            rows,
            next_min_index,
            width: header.len(),
        })
    }

    pub fn resume_offset(&self) -> usize {
        self.rows
    }

    /// Writes one row and flushes it to disk before returning.
    pub fn append(&mut self, row: &ResultRow) -> Result<(), CanvasError> {
        if row.index < self.next_min_index {
            return Err(CanvasError::ResultWrite(format!(
                "row index {} is not after {}",
                row.index,
                self.next_min_index.saturating_sub(1)
            )));
        }
        if row.columns.len() + 3 != self.width {
            return Err(CanvasError::ResultWrite(format!(
                "expected {} columns, got {}",
                self.width - 3,
                row.columns.len()
            )));
        }
        let index = row.index.to_string();
        let record = std::iter::once(index.as_str())
            .chain(row.columns.iter().map(String::as_str))
            .chain([row.status.as_str(), row.detail.as_str()]);
        self.writer
            .write_record(record)
            .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
        self.writer
            .flush()
            .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
        self.rows += 1;
        self.next_min_index = row.index + 1;
        Ok(())
    }
}

/// Number of data rows in a result file; zero when it does not exist.
pub fn count_rows(path: &Utf8Path) -> Result<usize, CanvasError> {
    if !path.as_std_path().exists() {
        return Ok(0);
    }
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_std_path())
        .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
    let mut rows = 0usize;
    for record in reader.records() {
        record.map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
        rows += 1;
    }
    Ok(rows)
}

fn drop_partial_trailing_line(path: &Utf8Path) -> Result<(), CanvasError> {
    let content =
        fs::read(path.as_std_path()).map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    if content.is_empty() || content.ends_with(b"\n") {
        return Ok(());
    }
    let keep = content
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    warn!(path = %path, dropped = content.len() - keep, "dropping partial trailing row");
    let file = OpenOptions::new()
        .write(true)
        .open(path.as_std_path())
        .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    file.set_len(keep as u64)
        .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    Ok(())
}

fn one_line(value: &str) -> String {
    if value.contains(['\n', '\r']) {
        value.split(['\n', '\r']).filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
    } else {
        value.to_string()
    }
}
