use serde::Deserialize;

use crate::canvas::{CanvasClient, CourseUpdate};
use crate::commands::found;
use crate::config::StorageSettings;
use crate::domain::CanvasId;
use crate::error::CanvasError;
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};
use crate::report::{InputRow, canvas_id};

/// A row of the Canvas course storage report.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageRow {
    #[serde(rename = "id", deserialize_with = "canvas_id")]
    pub course_id: CanvasId,
    #[serde(rename = "sis id", default)]
    pub sis_course_id: String,
    #[serde(rename = "short name", default)]
    pub short_name: String,
    #[serde(rename = "account id", default)]
    pub account_id: String,
    #[serde(rename = "storage used in mb")]
    pub storage_used_mb: f64,
}

impl InputRow for StorageRow {
    const REQUIRED_COLUMNS: &'static [&'static str] = &["id", "sis id", "storage used in mb"];

    fn key(&self) -> String {
        self.course_id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStatus {
    Increased,
    NotNeeded,
    CourseNotFound,
    FailedToIncrease,
}

impl RowStatus for StorageStatus {
    const ALL: &'static [Self] = &[
        StorageStatus::Increased,
        StorageStatus::NotNeeded,
        StorageStatus::CourseNotFound,
        StorageStatus::FailedToIncrease,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            StorageStatus::Increased => "increased",
            StorageStatus::NotNeeded => "not needed",
            StorageStatus::CourseNotFound => "course not found",
            StorageStatus::FailedToIncrease => "failed to increase",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            StorageStatus::Increased | StorageStatus::NotNeeded => StatusCategory::Success,
            StorageStatus::CourseNotFound => StatusCategory::RecoverableError,
            StorageStatus::FailedToIncrease => StatusCategory::FatalError,
        }
    }
}

/// True when `used_mb` has reached `threshold` of `quota_mb`.
pub fn needs_increase(used_mb: f64, quota_mb: u64, threshold: f64) -> bool {
    if quota_mb == 0 {
        return true;
    }
    used_mb / quota_mb as f64 >= threshold
}

pub struct StorageTask<'a, C: CanvasClient> {
    client: &'a C,
    settings: StorageSettings,
}

impl<'a, C: CanvasClient> StorageTask<'a, C> {
    pub fn new(client: &'a C, settings: StorageSettings) -> Self {
        Self { client, settings }
    }
}

impl<C: CanvasClient> BatchTask for StorageTask<'_, C> {
    type Row = StorageRow;
    type Status = StorageStatus;

    fn name(&self) -> &'static str {
        "storage"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["id", "sis id", "storage used in mb"]
    }

    fn describe(&self, row: &StorageRow) -> Vec<String> {
        vec![
            row.course_id.to_string(),
            row.sis_course_id.clone(),
            format!("{:.1}", row.storage_used_mb),
        ]
    }

    fn process(&self, row: &StorageRow) -> Result<Outcome<StorageStatus>, CanvasError> {
        let Some(course) = found(self.client.get_course(row.course_id))? else {
            return Ok(Outcome::new(StorageStatus::CourseNotFound));
        };
        let quota = course.storage_quota_mb.unwrap_or(0);

        if !needs_increase(row.storage_used_mb, quota, self.settings.threshold) {
            return Ok(Outcome::with_detail(
                StorageStatus::NotNeeded,
                format!("{:.1} of {quota} MB used", row.storage_used_mb),
            ));
        }

        let new_quota = quota + self.settings.increment_mb;
        let update = CourseUpdate {
            storage_quota_mb: Some(new_quota),
            ..CourseUpdate::default()
        };
        self.client.update_course(row.course_id, &update)?;
        Ok(Outcome::with_detail(
            StorageStatus::Increased,
            format!("{quota} -> {new_quota} MB"),
        ))
    }

    fn failure_status(&self, error: &CanvasError) -> StorageStatus {
        if error.is_not_found() {
            StorageStatus::CourseNotFound
        } else {
            StorageStatus::FailedToIncrease
        }
    }
}
