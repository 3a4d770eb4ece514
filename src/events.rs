use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::models::{Settings, Task, ViewRow};

/// Everything the list window needs to redraw itself.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatePayload {
    pub rows: Vec<ViewRow>,
    pub tags: BTreeSet<String>,
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReminderPayload {
    #[serde(with = "crate::deadline::serde_format")]
    pub scanned_at: NaiveDateTime,
    pub tasks: Vec<Task>,
}

/// Where the presentation layer receives state refreshes and reminders.
pub trait EventSink: Send + Sync {
    fn emit_state_updated(&self, payload: StatePayload);
    fn emit_reminder(&self, payload: ReminderPayload);
}
