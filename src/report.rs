//! Discovery and loading of provisioning reports.
//!
//! Reports live in the store's `reports` directory and follow a naming
//! convention: `<name>_<YYYY-MM-DD>.csv` for dated exports and
//! `<name>_<YYYY>.csv` for lists keyed by graduation year. Loading validates
//! the required columns, coerces each row through serde, drops duplicates by
//! key and applies an optional per-command filter.

use std::collections::HashSet;
use std::fmt;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::domain::CanvasId;
use crate::error::CanvasError;

/// A typed record read from an input report.
pub trait InputRow: DeserializeOwned + Clone + fmt::Debug {
    /// Lowercase header names that must be present.
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Identity used for deduplication and the processed ledger.
    fn key(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSelector {
    Dated { name: String, date: NaiveDate },
    Yearly { name: String, year: i32 },
    Path(Utf8PathBuf),
}

impl ReportSelector {
    pub fn pattern(&self) -> String {
        match self {
            ReportSelector::Dated { name, date } => {
                format!("{name}_{}.csv", date.format("%Y-%m-%d"))
            }
            ReportSelector::Yearly { name, year } => format!("{name}_{year}.csv"),
            ReportSelector::Path(path) => path.to_string(),
        }
    }

    pub fn locate(&self, reports_dir: &Utf8Path) -> Result<Utf8PathBuf, CanvasError> {
        let (name, suffix) = match self {
            ReportSelector::Path(path) => {
                if path.as_std_path().is_file() {
                    return Ok(path.clone());
                }
                return Err(CanvasError::ReportNotFound {
                    directory: path
                        .parent()
                        .map(|parent| parent.to_string())
                        .unwrap_or_default(),
                    pattern: path.file_name().unwrap_or_default().to_string(),
                });
            }
            ReportSelector::Dated { name, date } => (name, date.format("%Y-%m-%d").to_string()),
            ReportSelector::Yearly { name, year } => (name, year.to_string()),
        };

        let not_found = || CanvasError::ReportNotFound {
            directory: reports_dir.to_string(),
            pattern: self.pattern(),
        };

        let matcher = Regex::new(&format!(
            r"(?i)^{}[_-]{}(?:[ _(-].*)?\.csv$",
            regex::escape(name),
            regex::escape(&suffix)
        ))
        .map_err(|err| CanvasError::ReportParse(err.to_string()))?;

        let entries = match fs::read_dir(reports_dir.as_std_path()) {
            Ok(entries) => entries,
            Err(_) => return Err(not_found()),
        };
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| CanvasError::Filesystem(err.to_string()))?;
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            let Some(file_name) = path.file_name() else {
                continue;
            };
            if path.as_std_path().is_file() && matcher.is_match(file_name) {
                candidates.push(path);
            }
        }

        let exact = self.pattern();
        candidates.sort_by_key(|path| {
            (
                path.file_name() != Some(exact.as_str()),
                path.file_name().map(|name| name.to_string()),
            )
        });
        candidates.into_iter().next().ok_or_else(not_found)
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReport<R> {
    pub path: Utf8PathBuf,
    pub rows: Vec<R>,
    pub invalid: usize,
    pub duplicates: usize,
    pub filtered: usize,
}

pub fn load_report<R, F>(path: &Utf8Path, filter: F) -> Result<LoadedReport<R>, CanvasError>
where
    R: InputRow,
    F: Fn(&R) -> bool,
{
    let file = fs::File::open(path.as_std_path())
        .map_err(|err| CanvasError::ReportParse(format!("open {path}: {err}")))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| CanvasError::ReportParse(format!("{path}: {err}")))?
        .clone();
    let normalized: StringRecord = headers.iter().map(normalize_header).collect();

    let missing: Vec<&str> = R::REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !normalized.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(CanvasError::MissingColumns {
            path: path.to_string(),
            columns: missing.join(", "),
        });
    }
    reader.set_headers(normalized);

    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    let mut invalid = 0usize;
    let mut duplicates = 0usize;
    let mut filtered = 0usize;

    for (idx, result) in reader.deserialize::<R>().enumerate() {
        let row_num = idx + 2;
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                warn!(report = %path, row = row_num, error = %err, "skipping malformed row");
                invalid += 1;
                continue;
            }
        };
        if !filter(&row) {
            filtered += 1;
            continue;
        }
        if !seen.insert(row.key()) {
            duplicates += 1;
            continue;
        }
        rows.push(row);
    }

    info!(
        report = %path,
        rows = rows.len(),
        invalid,
        duplicates,
        filtered,
        "loaded report"
    );

    Ok(LoadedReport {
        path: path.to_path_buf(),
        rows,
        invalid,
        duplicates,
        filtered,
    })
}

fn normalize_header(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').to_lowercase()
}

/// Deserializes a Canvas id from a report cell, tolerating float renderings.
pub fn canvas_id<'de, D>(deserializer: D) -> Result<CanvasId, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

pub fn optional_canvas_id<'de, D>(deserializer: D) -> Result<Option<CanvasId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
