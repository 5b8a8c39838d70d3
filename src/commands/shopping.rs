use std::collections::HashSet;

use crate::canvas::{CanvasClient, CourseUpdate};
use crate::commands::{COURSE_COLUMNS, CourseRow, describe_course, found};
use crate::domain::{ShoppingAction, is_srs_course};
use crate::error::CanvasError;
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShoppingStatus {
    Enabled,
    Disabled,
    AlreadyEnabled,
    AlreadyDisabled,
    NotSrs,
    IgnoredAccount,
    CourseNotFound,
    FailedToUpdate,
}

impl RowStatus for ShoppingStatus {
    const ALL: &'static [Self] = &[
        ShoppingStatus::Enabled,
        ShoppingStatus::Disabled,
        ShoppingStatus::AlreadyEnabled,
        ShoppingStatus::AlreadyDisabled,
        ShoppingStatus::NotSrs,
        ShoppingStatus::IgnoredAccount,
        ShoppingStatus::CourseNotFound,
        ShoppingStatus::FailedToUpdate,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ShoppingStatus::Enabled => "enabled",
            ShoppingStatus::Disabled => "disabled",
            ShoppingStatus::AlreadyEnabled => "already enabled",
            ShoppingStatus::AlreadyDisabled => "already disabled",
            ShoppingStatus::NotSrs => "not an SRS course",
            ShoppingStatus::IgnoredAccount => "ignored account",
            ShoppingStatus::CourseNotFound => "course not found",
            ShoppingStatus::FailedToUpdate => "failed to update",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            ShoppingStatus::CourseNotFound => StatusCategory::RecoverableError,
            ShoppingStatus::FailedToUpdate => StatusCategory::FatalError,
            _ => StatusCategory::Success,
        }
    }
}

/// Toggles whether logged-in users outside the roster can browse a course.
pub struct ShoppingTask<'a, C: CanvasClient> {
    client: &'a C,
    action: ShoppingAction,
    ignored_accounts: HashSet<String>,
}

impl<'a, C: CanvasClient> ShoppingTask<'a, C> {
    pub fn new(client: &'a C, action: ShoppingAction, ignored_accounts: &[String]) -> Self {
        Self {
            client,
            action,
            ignored_accounts: ignored_accounts
                .iter()
                .map(|account| account.trim().to_string())
                .collect(),
        }
    }

    fn changed(&self) -> ShoppingStatus {
        match self.action {
            ShoppingAction::Enable => ShoppingStatus::Enabled,
            ShoppingAction::Disable => ShoppingStatus::Disabled,
        }
    }

    fn unchanged(&self) -> ShoppingStatus {
        match self.action {
            ShoppingAction::Enable => ShoppingStatus::AlreadyEnabled,
            ShoppingAction::Disable => ShoppingStatus::AlreadyDisabled,
        }
    }
}

impl<C: CanvasClient> BatchTask for ShoppingTask<'_, C> {
    type Row = CourseRow;
    type Status = ShoppingStatus;

    fn name(&self) -> &'static str {
        match self.action {
            ShoppingAction::Enable => "shopping_enable",
            ShoppingAction::Disable => "shopping_disable",
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        COURSE_COLUMNS
    }

    fn describe(&self, row: &CourseRow) -> Vec<String> {
        describe_course(row)
    }

    fn process(&self, row: &CourseRow) -> Result<Outcome<ShoppingStatus>, CanvasError> {
        if !is_srs_course(&row.course_id) {
            return Ok(Outcome::new(ShoppingStatus::NotSrs));
        }
        if self.ignored_accounts.contains(row.account_id.trim()) {
            return Ok(Outcome::with_detail(
                ShoppingStatus::IgnoredAccount,
                row.account_id.clone(),
            ));
        }

        let Some(course) = found(self.client.get_course(row.canvas_course_id))? else {
            return Ok(Outcome::new(ShoppingStatus::CourseNotFound));
        };

        let target = self.action.target_visibility();
        if course.is_public_to_auth_users.unwrap_or(false) == target {
            return Ok(Outcome::new(self.unchanged()));
        }

        let update = CourseUpdate {
            is_public_to_auth_users: Some(target),
            ..CourseUpdate::default()
        };
        self.client.update_course(row.canvas_course_id, &update)?;
        Ok(Outcome::new(self.changed()))
    }

    fn failure_status(&self, error: &CanvasError) -> ShoppingStatus {
        if error.is_not_found() {
            ShoppingStatus::CourseNotFound
        } else {
            ShoppingStatus::FailedToUpdate
        }
    }
}
