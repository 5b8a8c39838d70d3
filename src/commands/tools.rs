use crate::canvas::CanvasClient;
use crate::commands::{COURSE_COLUMNS, CourseRow, describe_course, found};
use crate::domain::Tool;
use crate::error::CanvasError;
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Used,
    NotUsed,
    CourseNotFound,
    FailedToCheck,
}

impl RowStatus for ToolStatus {
    const ALL: &'static [Self] = &[
        ToolStatus::Used,
        ToolStatus::NotUsed,
        ToolStatus::CourseNotFound,
        ToolStatus::FailedToCheck,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Used => "used",
            ToolStatus::NotUsed => "not used",
            ToolStatus::CourseNotFound => "course not found",
            ToolStatus::FailedToCheck => "failed to check",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            ToolStatus::Used | ToolStatus::NotUsed => StatusCategory::Success,
            ToolStatus::CourseNotFound => StatusCategory::RecoverableError,
            ToolStatus::FailedToCheck => StatusCategory::FatalError,
        }
    }
}

/// Counts courses that expose an external tool.
///
/// Turnitin shows up as assignment launch URLs; every other tool is a course
/// navigation tab that is usage when visible.
pub struct ToolUsageTask<'a, C: CanvasClient> {
    client: &'a C,
    tool: Tool,
}

impl<'a, C: CanvasClient> ToolUsageTask<'a, C> {
    pub fn new(client: &'a C, tool: Tool) -> Self {
        Self { client, tool }
    }

    fn check_assignments(&self, row: &CourseRow) -> Result<Outcome<ToolStatus>, CanvasError> {
        let Some(assignments) = found(self.client.list_assignments(row.canvas_course_id))? else {
            return Ok(Outcome::new(ToolStatus::CourseNotFound));
        };
        let count = assignments
            .iter()
            .filter(|assignment| {
                assignment
                    .external_tool_url()
                    .is_some_and(|url| self.tool.matches(url))
            })
            .count();
        if count == 0 {
            return Ok(Outcome::new(ToolStatus::NotUsed));
        }
        Ok(Outcome::with_detail(
            ToolStatus::Used,
            format!("{count} assignments"),
        ))
    }

    fn check_tabs(&self, row: &CourseRow) -> Result<Outcome<ToolStatus>, CanvasError> {
        let Some(tabs) = found(self.client.list_tabs(row.canvas_course_id))? else {
            return Ok(Outcome::new(ToolStatus::CourseNotFound));
        };
        let tab = tabs
            .iter()
            .find(|tab| !tab.hidden && (self.tool.matches(&tab.label) || self.tool.matches(&tab.id)));
        match tab {
            Some(tab) => Ok(Outcome::with_detail(ToolStatus::Used, tab.label.clone())),
            None => Ok(Outcome::new(ToolStatus::NotUsed)),
        }
    }
}

impl<C: CanvasClient> BatchTask for ToolUsageTask<'_, C> {
    type Row = CourseRow;
    type Status = ToolStatus;

    fn name(&self) -> &'static str {
        match self.tool {
            Tool::PollEverywhere => "tools_poll_everywhere",
            Tool::Turnitin => "tools_turnitin",
            Tool::Voicethread => "tools_voicethread",
            Tool::Zoom => "tools_zoom",
            Tool::Bluejeans => "tools_bluejeans",
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        COURSE_COLUMNS
    }

    fn describe(&self, row: &CourseRow) -> Vec<String> {
        describe_course(row)
    }

    fn process(&self, row: &CourseRow) -> Result<Outcome<ToolStatus>, CanvasError> {
        match self.tool {
            Tool::Turnitin => self.check_assignments(row),
            _ => self.check_tabs(row),
        }
    }

    fn failure_status(&self, error: &CanvasError) -> ToolStatus {
        if error.is_not_found() {
            ToolStatus::CourseNotFound
        } else {
            ToolStatus::FailedToCheck
        }
    }
}
