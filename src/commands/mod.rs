pub mod archive;
pub mod email;
pub mod orientation;
pub mod shopping;
pub mod storage;
pub mod tools;

use serde::Deserialize;

use crate::domain::CanvasId;
use crate::error::CanvasError;
use crate::report::{InputRow, canvas_id};

/// A row of the Canvas `courses` provisioning report.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseRow {
    #[serde(deserialize_with = "canvas_id")]
    pub canvas_course_id: CanvasId,
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub term_id: String,
    #[serde(default)]
    pub status: String,
}

impl CourseRow {
    pub fn is_deleted(&self) -> bool {
        self.status.eq_ignore_ascii_case("deleted")
    }
}

impl InputRow for CourseRow {
    const REQUIRED_COLUMNS: &'static [&'static str] = &[
        "canvas_course_id",
        "course_id",
        "short_name",
        "account_id",
        "term_id",
        "status",
    ];

    fn key(&self) -> String {
        self.canvas_course_id.to_string()
    }
}

pub(crate) const COURSE_COLUMNS: &[&str] = &["canvas_course_id", "course_id", "short_name"];

pub(crate) fn describe_course(row: &CourseRow) -> Vec<String> {
    vec![
        row.canvas_course_id.to_string(),
        row.course_id.clone(),
        row.short_name.clone(),
    ]
}

/// Maps a 404 to `Ok(None)` so callers can report a not-found status.
pub(crate) fn found<T>(result: Result<T, CanvasError>) -> Result<Option<T>, CanvasError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
