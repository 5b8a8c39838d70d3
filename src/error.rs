use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CanvasError {
    #[error("invalid Canvas id: {0}")]
    InvalidCanvasId(String),

    #[error("invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid tool: {0}")]
    InvalidTool(String),

    #[error("missing config file at {0}")]
    #[diagnostic(help("create it or pass --config <path>"))]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("missing credentials for Canvas instance {0}")]
    #[diagnostic(help("set a token in the config file or export CANVAS_TOKEN_<INSTANCE>"))]
    MissingCredentials(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("Canvas request failed: {0}")]
    CanvasHttp(String),

    #[error("Canvas returned status {status}: {message}")]
    CanvasStatus { status: u16, message: String },

    #[error("no report matching {pattern} found in {directory}")]
    #[diagnostic(help("download the provisioning report or pass --input <path>"))]
    ReportNotFound { directory: String, pattern: String },

    #[error("report {path} is missing required columns: {columns}")]
    MissingColumns { path: String, columns: String },

    #[error("failed to read report: {0}")]
    ReportParse(String),

    #[error("failed to write results: {0}")]
    ResultWrite(String),

    #[error("processed ledger error: {0}")]
    Ledger(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("orientation group category not found: {0}")]
    GroupCategoryNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl CanvasError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CanvasError::CanvasStatus { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_for_404() {
        let missing = CanvasError::CanvasStatus {
            status: 404,
            message: "not found".to_string(),
        };
        let forbidden = CanvasError::CanvasStatus {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert!(missing.is_not_found());
        assert!(!forbidden.is_not_found());
        assert!(!CanvasError::CanvasHttp("timeout".to_string()).is_not_found());
    }
}
