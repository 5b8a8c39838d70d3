use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};

use camino::Utf8Path;
use csv::{ReaderBuilder, Writer, WriterBuilder};

use crate::error::CanvasError;

const HEADER: [&str; 2] = ["key", "processed_at"];

/// Keys that were handled successfully in an earlier run.
///
/// Unlike the result file, membership does not depend on row position, so a
/// key stays processed even when the input report is reordered or shrinks.
pub struct ProcessedLedger {
    keys: HashSet<String>,
    writer: Writer<File>,
}

impl ProcessedLedger {
    pub fn open(path: &Utf8Path) -> Result<Self, CanvasError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CanvasError::Ledger(err.to_string()))?;
        }
        let exists = path.as_std_path().exists()
            && fs::metadata(path.as_std_path())
                .map(|meta| meta.len() > 0)
                .unwrap_or(false);

        let mut keys = HashSet::new();
        if exists {
            let mut reader = ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path.as_std_path())
                .map_err(|err| CanvasError::Ledger(format!("{path}: {err}")))?;
            for record in reader.records() {
                let record = record.map_err(|err| CanvasError::Ledger(format!("{path}: {err}")))?;
                if let Some(key) = record.get(0).filter(|key| !key.is_empty()) {
                    keys.insert(key.to_string());
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| CanvasError::Ledger(format!("{path}: {err}")))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if !exists {
            writer
                .write_record(HEADER)
                .and_then(|_| writer.flush().map_err(csv::Error::from))
                .map_err(|err| CanvasError::Ledger(err.to_string()))?;
        }

        Ok(Self {
            keys,
            writer,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Appends `key` and flushes. Recording a known key is a no-op.
    pub fn record(&mut self, key: &str) -> Result<(), CanvasError> {
        if self.keys.contains(key) {
            return Ok(());
        }
        let timestamp = chrono::Utc::now().to_rfc3339();
        self.writer
            .write_record([key, timestamp.as_str()])
            .map_err(|err| CanvasError::Ledger(err.to_string()))?;
        self.writer
            .flush()
            .map_err(|err| CanvasError::Ledger(err.to_string()))?;
        self.keys.insert(key.to_string());
        Ok(())
    }
}
