use std::collections::BTreeMap;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;

use crate::error::CanvasError;
use crate::pipeline::{RowStatus, StatusCategory, classify};
use crate::results::STATUS_COLUMN;
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub recoverable: usize,
    pub fatal: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl Summary {
    pub fn count(&self, status: &str) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

/// Reads a finished result file, counts statuses, and rewrites it with
/// failures first so they are on top for triage.
pub fn summarize<S: RowStatus>(path: &Utf8Path) -> Result<Summary, CanvasError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path.as_std_path())
        .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
    let headers = reader
        .headers()
        .map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?
        .clone();
    let status_idx = headers
        .iter()
        .position(|header| header == STATUS_COLUMN)
        .ok_or_else(|| CanvasError::ResultWrite(format!("{path} has no status column")))?;

    let mut rows: Vec<(StatusCategory, StringRecord)> = Vec::new();
    let mut summary = Summary::default();
    for record in reader.records() {
        let record = record.map_err(|err| CanvasError::ResultWrite(format!("{path}: {err}")))?;
        let status = record.get(status_idx).unwrap_or_default();
        let category = classify::<S>(status);
        match category {
            StatusCategory::Success => summary.success += 1,
            StatusCategory::RecoverableError => summary.recoverable += 1,
            StatusCategory::FatalError => summary.fatal += 1,
        }
        *summary.by_status.entry(status.to_string()).or_default() += 1;
        summary.total += 1;
        rows.push((category, record));
    }

    rows.sort_by_key(|(category, _)| *category);

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer
        .write_record(&headers)
        .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    for (_, record) in &rows {
        writer
            .write_record(record)
            .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    }
    let content = writer
        .into_inner()
        .map_err(|err| CanvasError::ResultWrite(err.to_string()))?;
    Store::write_bytes_atomic(path, &content)?;

    Ok(summary)
}
