use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::error::CanvasError;

/// On-disk layout for reports, results, ledgers and archives.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, CanvasError> {
        let root = BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.home_dir().join("penn-canvas")).ok())
            .ok_or_else(|| CanvasError::Filesystem("unable to resolve data directory".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn reports_dir(&self) -> Utf8PathBuf {
        self.root.join("reports")
    }

    pub fn results_dir(&self) -> Utf8PathBuf {
        self.root.join("results")
    }

    pub fn processed_dir(&self) -> Utf8PathBuf {
        self.root.join("processed")
    }

    pub fn archives_dir(&self) -> Utf8PathBuf {
        self.root.join("archives")
    }

    /// Result file for one command run over one input report.
    pub fn result_path(&self, command: &str, input: &Utf8Path) -> Utf8PathBuf {
        let stem = input.file_stem().unwrap_or("input");
        self.results_dir().join(format!("{stem}_{command}_result.csv"))
    }

    pub fn ledger_path(&self, name: &str) -> Utf8PathBuf {
        self.processed_dir().join(format!("{name}.csv"))
    }

    pub fn archive_path(&self, name: &str) -> Utf8PathBuf {
        self.archives_dir().join(format!("{}.zip", sanitize_file_name(name)))
    }

    pub fn ensure_layout(&self) -> Result<(), CanvasError> {
        for dir in [
            self.reports_dir(),
            self.results_dir(),
            self.processed_dir(),
            self.archives_dir(),
        ] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| CanvasError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), CanvasError> {
        let parent = path
            .parent()
            .ok_or_else(|| CanvasError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| CanvasError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix("penn-canvas-file")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CanvasError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| CanvasError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| CanvasError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
