use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type TaskId = i64;

/// Filter value that shows every task regardless of tag.
pub const ALL_TAGS: &str = "all";

/// Tags offered for selection even when no stored task carries them.
pub const SUGGESTED_TAGS: [&str; 3] = ["drink", "fruit", "snack"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub tag: Option<String>,
    #[serde(with = "crate::deadline::serde_format")]
    pub deadline: NaiveDateTime,
    pub completed: bool,
}

/// Payload for creating or editing a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TaskInput {
    pub text: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(with = "crate::deadline::serde_format")]
    pub deadline: NaiveDateTime,
}

/// A task as the list shows it. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ViewRow {
    pub id: TaskId,
    pub text: String,
    pub tag: Option<String>,
    #[serde(with = "crate::deadline::serde_format")]
    pub deadline: NaiveDateTime,
    pub completed: bool,
    pub overdue: bool,
}

impl ViewRow {
    pub fn from_task(task: Task, now: NaiveDateTime) -> Self {
        let overdue = !task.completed && task.deadline < now;
        Self {
            id: task.id,
            text: task.text,
            tag: task.tag,
            deadline: task.deadline,
            completed: task.completed,
            overdue,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    #[default]
    Deadline,
    Tag,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Deadline => "deadline",
            SortKey::Tag => "tag",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "deadline" => Ok(SortKey::Deadline),
            "tag" => Ok(SortKey::Tag),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,
    #[serde(default = "default_reminder_lookahead_secs")]
    pub reminder_lookahead_secs: u64,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub filter_tag: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminder_interval_secs: default_reminder_interval_secs(),
            reminder_lookahead_secs: default_reminder_lookahead_secs(),
            sort: SortKey::default(),
            filter_tag: None,
        }
    }
}

impl Settings {
    pub fn lookahead(&self) -> chrono::Duration {
        let secs = i64::try_from(self.reminder_lookahead_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }

    pub fn reminder_interval(&self) -> std::time::Duration {
        // tokio intervals reject a zero period.
        std::time::Duration::from_secs(self.reminder_interval_secs.max(1))
    }
}

fn default_reminder_interval_secs() -> u64 {
    60
}

fn default_reminder_lookahead_secs() -> u64 {
    60
}

/// Collapses blank tags to `None` and trims the rest.
pub fn normalize_tag(tag: Option<&str>) -> Option<String> {
    tag.map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
}
