use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CanvasError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasId(u64);

impl CanvasId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CanvasId {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        // Provisioning exports sometimes render ids as floats ("1234.0").
        let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| CanvasError::InvalidCanvasId(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Instance {
    Prod,
    Test,
    Beta,
}

impl Instance {
    pub fn as_str(self) -> &'static str {
        match self {
            Instance::Prod => "prod",
            Instance::Test => "test",
            Instance::Beta => "beta",
        }
    }

    pub fn token_env_var(self) -> String {
        format!("CANVAS_TOKEN_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a user is addressed in a Canvas API path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(CanvasId),
    SisUserId(String),
    SisLoginId(String),
}

impl UserRef {
    pub fn path_segment(&self) -> String {
        match self {
            UserRef::Id(id) => id.to_string(),
            UserRef::SisUserId(value) => format!("sis_user_id:{value}"),
            UserRef::SisLoginId(value) => format!("sis_login_id:{value}"),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path_segment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    PollEverywhere,
    Turnitin,
    Voicethread,
    Zoom,
    Bluejeans,
}

impl Tool {
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::PollEverywhere => "poll-everywhere",
            Tool::Turnitin => "turnitin",
            Tool::Voicethread => "voicethread",
            Tool::Zoom => "zoom",
            Tool::Bluejeans => "bluejeans",
        }
    }

    /// Lowercase fragments that identify the tool in a tab label, tab id or launch URL.
    pub fn needles(self) -> &'static [&'static str] {
        match self {
            Tool::PollEverywhere => &["poll everywhere", "polleverywhere"],
            Tool::Turnitin => &["turnitin"],
            Tool::Voicethread => &["voicethread"],
            Tool::Zoom => &["zoom"],
            Tool::Bluejeans => &["bluejeans", "blue jeans"],
        }
    }

    pub fn matches(self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.needles().iter().any(|needle| lowered.contains(needle))
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        <Tool as ValueEnum>::from_str(value.trim(), true)
            .map_err(|_| CanvasError::InvalidTool(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingAction {
    Enable,
    Disable,
}

impl ShoppingAction {
    pub fn target_visibility(self) -> bool {
        matches!(self, ShoppingAction::Enable)
    }
}

pub fn is_srs_course(sis_course_id: &str) -> bool {
    sis_course_id.trim().starts_with("SRS_")
}

pub fn parse_report_date(value: &str) -> Result<NaiveDate, CanvasError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| CanvasError::InvalidDate(value.to_string()))
}
