use serde::Deserialize;

use crate::canvas::CanvasClient;
use crate::commands::found;
use crate::domain::CanvasId;
use crate::error::CanvasError;
use crate::pipeline::{BatchTask, Outcome, RowStatus, StatusCategory};
use crate::report::{InputRow, canvas_id};

/// A row of the Canvas `users` provisioning report.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    #[serde(deserialize_with = "canvas_id")]
    pub canvas_user_id: CanvasId,
    #[serde(default)]
    pub login_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub status: String,
}

impl UserRow {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }
}

impl InputRow for UserRow {
    const REQUIRED_COLUMNS: &'static [&'static str] =
        &["canvas_user_id", "login_id", "full_name", "email", "status"];

    fn key(&self) -> String {
        self.canvas_user_id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Activated,
    AlreadyActive,
    NoEmail,
    UserNotFound,
    FailedToActivate,
}

impl RowStatus for EmailStatus {
    const ALL: &'static [Self] = &[
        EmailStatus::Activated,
        EmailStatus::AlreadyActive,
        EmailStatus::NoEmail,
        EmailStatus::UserNotFound,
        EmailStatus::FailedToActivate,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Activated => "activated",
            EmailStatus::AlreadyActive => "already active",
            EmailStatus::NoEmail => "no email",
            EmailStatus::UserNotFound => "user not found",
            EmailStatus::FailedToActivate => "failed to activate",
        }
    }

    fn category(&self) -> StatusCategory {
        match self {
            EmailStatus::Activated | EmailStatus::AlreadyActive => StatusCategory::Success,
            EmailStatus::NoEmail | EmailStatus::UserNotFound => StatusCategory::RecoverableError,
            EmailStatus::FailedToActivate => StatusCategory::FatalError,
        }
    }
}

/// Activates unconfirmed email channels by re-creating them with
/// confirmation skipped.
pub struct EmailTask<'a, C: CanvasClient> {
    client: &'a C,
}

impl<'a, C: CanvasClient> EmailTask<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

impl<C: CanvasClient> BatchTask for EmailTask<'_, C> {
    type Row = UserRow;
    type Status = EmailStatus;

    fn name(&self) -> &'static str {
        "email"
    }

    fn columns(&self) -> &'static [&'static str] {
        &["canvas_user_id", "login_id", "full_name", "email"]
    }

    fn describe(&self, row: &UserRow) -> Vec<String> {
        vec![
            row.canvas_user_id.to_string(),
            row.login_id.clone(),
            row.full_name.clone(),
            row.email.clone(),
        ]
    }

    fn process(&self, row: &UserRow) -> Result<Outcome<EmailStatus>, CanvasError> {
        let Some(channels) = found(self.client.list_communication_channels(row.canvas_user_id))?
        else {
            return Ok(Outcome::new(EmailStatus::UserNotFound));
        };

        let emails: Vec<_> = channels.iter().filter(|channel| channel.is_email()).collect();
        if emails.is_empty() {
            return Ok(Outcome::new(EmailStatus::NoEmail));
        }
        if let Some(active) = emails.iter().find(|channel| channel.is_active()) {
            return Ok(Outcome::with_detail(
                EmailStatus::AlreadyActive,
                active.address.clone(),
            ));
        }

        let unconfirmed: Vec<_> = emails
            .into_iter()
            .filter(|channel| channel.is_unconfirmed())
            .collect();
        if unconfirmed.is_empty() {
            return Ok(Outcome::with_detail(
                EmailStatus::NoEmail,
                "no active or unconfirmed email channel",
            ));
        }

        let mut activated = Vec::new();
        for channel in unconfirmed {
            self.client
                .delete_communication_channel(row.canvas_user_id, channel.id)?;
            let created =
                self.client
                    .create_email_channel(row.canvas_user_id, &channel.address, true)?;
            activated.push(created.address);
        }
        Ok(Outcome::with_detail(
            EmailStatus::Activated,
            activated.join("; "),
        ))
    }

    fn failure_status(&self, error: &CanvasError) -> EmailStatus {
        if error.is_not_found() {
            EmailStatus::UserNotFound
        } else {
            EmailStatus::FailedToActivate
        }
    }
}
