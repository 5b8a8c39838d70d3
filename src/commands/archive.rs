use std::sync::LazyLock;

use csv::WriterBuilder;
use regex::Regex;

use crate::canvas::{Assignment, CanvasClient, DiscussionEntry, DiscussionTopic};
use crate::commands::{COURSE_COLUMNS, CourseRow, describe_course, found};
use crate::error::CanvasError;
use crate::fs_util::{ArchiveEntry, validate_zip, write_zip};
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};
use crate::store::Store;

static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    Archived,
    CourseNotFound,
    FailedToArchive,
}

impl RowStatus for ArchiveStatus {
    const ALL: &'static [Self] = &[
        ArchiveStatus::Archived,
        ArchiveStatus::CourseNotFound,
        ArchiveStatus::FailedToArchive,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ArchiveStatus::Archived => "archived",
            ArchiveStatus::CourseNotFound => "course not found",
            ArchiveStatus::FailedToArchive => "failed to archive",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            ArchiveStatus::Archived => StatusCategory::Success,
            ArchiveStatus::CourseNotFound => StatusCategory::RecoverableError,
            ArchiveStatus::FailedToArchive => StatusCategory::FatalError,
        }
    }
}

/// Reduces a Canvas HTML body to plain text.
pub fn strip_html(html: &str) -> String {
    let text = TAGS.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Packs a course's discussions, announcements and assignments into a zip.
pub struct ArchiveTask<'a, C: CanvasClient> {
    client: &'a C,
    store: &'a Store,
}

impl<'a, C: CanvasClient> ArchiveTask<'a, C> {
    pub fn new(client: &'a C, store: &'a Store) -> Self {
        Self { client, store }
    }

    fn discussions_csv(
        &self,
        row: &CourseRow,
        topics: &[DiscussionTopic],
    ) -> Result<(Vec<u8>, usize), CanvasError> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record(["topic_id", "topic_title", "entry_id", "author", "posted_at", "message"])
            .map_err(archive_err)?;
        let mut entry_count = 0usize;
        for topic in topics {
            let topic_id = topic.id.to_string();
            let title = topic.title.clone().unwrap_or_default();
            writer
                .write_record([
                    topic_id.as_str(),
                    title.as_str(),
                    "",
                    topic.user_name.as_deref().unwrap_or_default(),
                    topic.posted_at.as_deref().unwrap_or_default(),
                    &strip_html(topic.message.as_deref().unwrap_or_default()),
                ])
                .map_err(archive_err)?;

            let entries: Vec<DiscussionEntry> = self
                .client
                .list_discussion_entries(row.canvas_course_id, topic.id)?;
            for entry in &entries {
                writer
                    .write_record([
                        topic_id.as_str(),
                        title.as_str(),
                        &entry.id.to_string(),
                        entry.user_name.as_deref().unwrap_or_default(),
                        entry.created_at.as_deref().unwrap_or_default(),
                        &strip_html(entry.message.as_deref().unwrap_or_default()),
                    ])
                    .map_err(archive_err)?;
            }
            entry_count += entries.len();
        }
        let content = writer.into_inner().map_err(|err| CanvasError::Archive(err.to_string()))?;
        Ok((content, entry_count))
    }
}

fn announcements_csv(announcements: &[DiscussionTopic]) -> Result<Vec<u8>, CanvasError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["id", "title", "author", "posted_at", "message"])
        .map_err(archive_err)?;
    for announcement in announcements {
        writer
            .write_record([
                &announcement.id.to_string(),
                announcement.title.as_deref().unwrap_or_default(),
                announcement.user_name.as_deref().unwrap_or_default(),
                announcement.posted_at.as_deref().unwrap_or_default(),
                &strip_html(announcement.message.as_deref().unwrap_or_default()),
            ])
            .map_err(archive_err)?;
    }
    writer.into_inner().map_err(|err| CanvasError::Archive(err.to_string()))
}

fn assignments_csv(assignments: &[Assignment]) -> Result<Vec<u8>, CanvasError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(["id", "name", "due_at", "points_possible", "description"])
        .map_err(archive_err)?;
    for assignment in assignments {
        let points = assignment
            .points_possible
            .map(|points| points.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                &assignment.id.to_string(),
                assignment.name.as_str(),
                assignment.due_at.as_deref().unwrap_or_default(),
                points.as_str(),
                &strip_html(assignment.description.as_deref().unwrap_or_default()),
            ])
            .map_err(archive_err)?;
    }
    writer.into_inner().map_err(|err| CanvasError::Archive(err.to_string()))
}

fn archive_err(err: csv::Error) -> CanvasError {
    CanvasError::Archive(err.to_string())
}

impl<C: CanvasClient> BatchTask for ArchiveTask<'_, C> {
    type Row = CourseRow;
    type Status = ArchiveStatus;

    fn name(&self) -> &'static str {
        "archive"
    }

    fn columns(&self) -> &'static [&'static str] {
        COURSE_COLUMNS
    }

    fn describe(&self, row: &CourseRow) -> Vec<String> {
        describe_course(row)
    }

    fn process(&self, row: &CourseRow) -> Result<Outcome<ArchiveStatus>, CanvasError> {
        let Some(course) = found(self.client.get_course(row.canvas_course_id))? else {
            return Ok(Outcome::new(ArchiveStatus::CourseNotFound));
        };

        let topics = self
            .client
            .list_discussion_topics(row.canvas_course_id, false)?;
        let announcements = self
            .client
            .list_discussion_topics(row.canvas_course_id, true)?;
        let assignments = self.client.list_assignments(row.canvas_course_id)?;

        let (discussions, entry_count) = self.discussions_csv(row, &topics)?;
        let entries = vec![
            ArchiveEntry {
                name: "discussions.csv".to_string(),
                content: discussions,
            },
            ArchiveEntry {
                name: "announcements.csv".to_string(),
                content: announcements_csv(&announcements)?,
            },
            ArchiveEntry {
                name: "assignments.csv".to_string(),
                content: assignments_csv(&assignments)?,
            },
        ];

        // The Canvas id keeps names unique once the SIS id is sanitized.
        let archive_name = course
            .sis_course_id
            .filter(|value| !value.trim().is_empty())
            .or_else(|| Some(row.course_id.clone()).filter(|value| !value.trim().is_empty()))
            .map(|base| format!("{base}_{}", row.canvas_course_id))
            .unwrap_or_else(|| row.canvas_course_id.to_string());
        let path = self.store.archive_path(&archive_name);
        write_zip(&path, &entries)?;
        let written = validate_zip(&path)?;
        if written.len() != entries.len() {
            return Err(CanvasError::Archive(format!(
                "{path} holds {} entries, expected {}",
                written.len(),
                entries.len()
            )));
        }

        Ok(Outcome::with_detail(
            ArchiveStatus::Archived,
            format!(
                "{} topics, {entry_count} entries, {} announcements, {} assignments",
                topics.len(),
                announcements.len(),
                assignments.len()
            ),
        ))
    }

    fn failure_status(&self, error: &CanvasError) -> ArchiveStatus {
        if error.is_not_found() {
            ArchiveStatus::CourseNotFound
        } else {
            ArchiveStatus::FailedToArchive
        }
    }
}
