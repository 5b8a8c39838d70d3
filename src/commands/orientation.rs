use std::cell::RefCell;
use std::collections::HashMap;

use serde::Deserialize;
use tracing::info;

use crate::canvas::{CanvasClient, EnrollmentRole};
use crate::commands::found;
use crate::config::OrientationSettings;
use crate::domain::{CanvasId, UserRef};
use crate::error::CanvasError;
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};
use crate::report::InputRow;

/// A row of the incoming-student list for one graduation year.
#[derive(Debug, Clone, Deserialize)]
pub struct OrientationRow {
    pub penn_id: String,
    #[serde(default)]
    pub pennkey: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub group: String,
}

impl InputRow for OrientationRow {
    const REQUIRED_COLUMNS: &'static [&'static str] = &["penn_id", "pennkey", "full_name", "group"];

    fn key(&self) -> String {
        self.penn_id.trim().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationStatus {
    Enrolled,
    NoGroup,
    UserNotFound,
    FailedToEnroll,
}

impl RowStatus for OrientationStatus {
    const ALL: &'static [Self] = &[
        OrientationStatus::Enrolled,
        OrientationStatus::NoGroup,
        OrientationStatus::UserNotFound,
        OrientationStatus::FailedToEnroll,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            OrientationStatus::Enrolled => "enrolled",
            OrientationStatus::NoGroup => "no group",
            OrientationStatus::UserNotFound => "user not found",
            OrientationStatus::FailedToEnroll => "failed to enroll",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            OrientationStatus::Enrolled => StatusCategory::Success,
            OrientationStatus::NoGroup | OrientationStatus::UserNotFound => {
                StatusCategory::RecoverableError
            }
            OrientationStatus::FailedToEnroll => StatusCategory::FatalError,
        }
    }
}

/// Enrolls students into the orientation course and their assigned group.
pub struct OrientationTask<'a, C: CanvasClient> {
    client: &'a C,
    course_id: CanvasId,
    category_id: CanvasId,
    groups: RefCell<HashMap<String, CanvasId>>,
}

impl<'a, C: CanvasClient> OrientationTask<'a, C> {
    /// Resolves the group category and caches its groups. A missing
    /// category is a setup failure.
    pub fn prepare(client: &'a C, settings: &OrientationSettings) -> Result<Self, CanvasError> {
        let wanted = settings.group_category.trim();
        let category = client
            .list_group_categories(settings.course_id)?
            .into_iter()
            .find(|category| category.name.trim().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CanvasError::GroupCategoryNotFound(wanted.to_string()))?;

        let groups = client
            .list_groups(category.id)?
            .into_iter()
            .map(|group| (group_key(&group.name), group.id))
            .collect::<HashMap<_, _>>();
        info!(
            course = %settings.course_id,
            category = %category.name,
            groups = groups.len(),
            "resolved orientation groups"
        );

        Ok(Self {
            client,
            course_id: settings.course_id,
            category_id: category.id,
            groups: RefCell::new(groups),
        })
    }

    fn group_id(&self, name: &str) -> Result<CanvasId, CanvasError> {
        let key = group_key(name);
        if let Some(id) = self.groups.borrow().get(&key) {
            return Ok(*id);
        }
        let group = self.client.create_group(self.category_id, name.trim())?;
        info!(group = %group.name, id = %group.id, "created orientation group");
        self.groups.borrow_mut().insert(key, group.id);
        Ok(group.id)
    }
}

impl<C: CanvasClient> BatchTask for OrientationTask<'_, C> {
    type Row = OrientationRow;
    type Status = OrientationStatus;

    fn name(&self) -> &'static str {
        "orientation"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["penn_id", "pennkey", "full_name", "group"]
    }

    fn describe(&self, row: &OrientationRow) -> Vec<String> {
        vec![
            row.penn_id.clone(),
            row.pennkey.clone(),
            row.full_name.clone(),
            row.group.clone(),
        ]
    }

    fn process(&self, row: &OrientationRow) -> Result<Outcome<OrientationStatus>, CanvasError> {
        if row.group.trim().is_empty() {
            return Ok(Outcome::new(OrientationStatus::NoGroup));
        }
        let user_ref = UserRef::SisUserId(row.penn_id.trim().to_string());
        let Some(user) = found(self.client.get_user(&user_ref))? else {
            return Ok(Outcome::new(OrientationStatus::UserNotFound));
        };

        self.client
            .enroll_user(self.course_id, user.id, EnrollmentRole::Student)?;
        let group_id = self.group_id(&row.group)?;
        self.client.create_group_membership(group_id, user.id)?;

        Ok(Outcome::with_detail(
            OrientationStatus::Enrolled,
            row.group.trim(),
        ))
    }

    fn failure_status(&self, _error: &CanvasError) -> OrientationStatus {
        OrientationStatus::FailedToEnroll
    }
}

fn group_key(name: &str) -> String {
    name.trim().to_lowercase()
}
