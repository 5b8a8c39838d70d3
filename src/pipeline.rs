//! Sequential, resumable batch driver.
//!
//! A [`BatchTask`] turns one input row into one status. [`run_batch`] walks
//! the rows after the result file's resume offset, appending and flushing a
//! result row for each. When a [`ProcessedLedger`] is supplied it replaces
//! the offset: all rows are walked, the result file is rebuilt, and keys
//! handled in earlier runs are not sent to Canvas again.

use std::fmt;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::CanvasError;
use crate::ledger::ProcessedLedger;
use crate::report::InputRow;
use crate::results::{ResultFile, ResultRow};

/// Status written for rows whose key is already in the processed ledger.
pub const ALREADY_PROCESSED: &str = "already processed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    FatalError,
    RecoverableError,
    Success,
}

impl StatusCategory {
    pub fn is_success(self) -> bool {
        matches!(self, StatusCategory::Success)
    }
}

/// Closed set of status codes a command can write.
pub trait RowStatus: Copy + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn category(&self) -> StatusCategory;

    fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == value)
    }
}

/// Category of a status string read back from a result file.
pub fn classify<S: RowStatus>(status: &str) -> StatusCategory {
    if status == ALREADY_PROCESSED {
        return StatusCategory::Success;
    }
    S::parse(status)
        .map(|status| status.category())
        .unwrap_or(StatusCategory::FatalError)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<S> {
    pub status: S,
    pub detail: String,
}

impl<S> Outcome<S> {
    pub fn new(status: S) -> Self {
        Self {
            status,
            detail: String::new(),
        }
    }

    pub fn with_detail(status: S, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

pub trait BatchTask {
    type Row: InputRow;
    type Status: RowStatus;

    /// Short command name used in result file names.
    fn name(&self) -> &'static str;

    /// Echo columns written between `index` and `status`.
    fn columns(&self) -> &'static [&'static str];

    fn describe(&self, row: &Self::Row) -> Vec<String>;

    fn process(&self, row: &Self::Row) -> Result<Outcome<Self::Status>, CanvasError>;

    /// Status recorded when `process` returns an error.
    fn failure_status(&self, error: &CanvasError) -> Self::Status;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub start: usize,
    pub processed: usize,
    pub ledger_skipped: usize,
    pub failed: usize,
    pub result_path: String,
}

#[derive(Debug, Clone)]
pub struct RowEvent {
    pub index: usize,
    pub total: usize,
    pub key: String,
    pub status: String,
    pub category: StatusCategory,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        command: &'static str,
        total: usize,
        start: usize,
    },
    Row(RowEvent),
    Finished {
        processed: usize,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub fn run_batch<T: BatchTask>(
    task: &T,
    rows: &[T::Row],
    result_path: &Utf8Path,
    mut ledger: Option<&mut ProcessedLedger>,
    options: BatchOptions,
    sink: &dyn ProgressSink,
) -> Result<BatchReport, CanvasError> {
    // With a ledger the ledger is the cursor: the input may have been
    // reordered or shrunk, so every row is walked again and the result file
    // is rebuilt from scratch.
    let rebuild = options.force || ledger.is_some();
    let mut results = ResultFile::open(result_path, task.columns(), rebuild)?;
    let total = rows.len();
    let start = results.resume_offset().min(total);

    info!(
        command = task.name(),
        total,
        start,
        results = %result_path,
        "starting batch"
    );
    sink.event(ProgressEvent::Started {
        command: task.name(),
        total,
        start,
    });

    let mut processed = 0usize;
    let mut ledger_skipped = 0usize;
    let mut failed = 0usize;

    for (index, row) in rows.iter().enumerate().skip(start) {
        let key = row.key();
        let columns = task.describe(row);

        if ledger.as_deref().is_some_and(|ledger| ledger.contains(&key)) {
            results.append(&ResultRow::new(index, columns, ALREADY_PROCESSED, ""))?;
            ledger_skipped += 1;
            sink.event(ProgressEvent::Row(RowEvent {
                index,
                total,
                key,
                status: ALREADY_PROCESSED.to_string(),
                category: StatusCategory::Success,
                detail: String::new(),
            }));
            continue;
        }

        let outcome = match task.process(row) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(command = task.name(), key = %key, error = %err, "row failed");
                Outcome::with_detail(task.failure_status(&err), err.to_string())
            }
        };
        let category = outcome.status.category();
        let status = outcome.status.as_str();

        results.append(&ResultRow::new(index, columns, status, &outcome.detail))?;
        if category.is_success() {
            if let Some(ledger) = ledger.as_deref_mut() {
                ledger.record(&key)?;
            }
        } else {
            failed += 1;
        }
        processed += 1;

        sink.event(ProgressEvent::Row(RowEvent {
            index,
            total,
            key,
            status: status.to_string(),
            category,
            detail: outcome.detail,
        }));
    }

    sink.event(ProgressEvent::Finished { processed });
    info!(
        command = task.name(),
        processed,
        ledger_skipped,
        failed,
        "batch finished"
    );

    Ok(BatchReport {
        total,
        start,
        processed,
        ledger_skipped,
        failed,
        result_path: result_path.to_string(),
    })
}
