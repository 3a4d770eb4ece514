use std::collections::BTreeSet;

use crate::deadline::now_local;
use crate::error::TaskError;
use crate::events::{EventSink, ReminderPayload, StatePayload};
use crate::models::{Settings, SortKey, Task, TaskId, TaskInput, ViewRow};
use crate::state::AppState;

/// Result shape handed to the presentation layer.
#[derive(Debug, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<CommandError>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandError {
    pub kind: &'static str,
    pub message: String,
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(error: &TaskError) -> CommandResult<T> {
    log::warn!("command failed: {error}");
    CommandResult {
        ok: false,
        data: None,
        error: Some(CommandError {
            kind: error.kind(),
            message: error.to_string(),
        }),
    }
}

fn respond<T>(result: Result<T, TaskError>) -> CommandResult<T> {
    match result {
        Ok(data) => ok(data),
        Err(error) => err(&error),
    }
}

/// Re-reads the store and hands the fresh list to the sink. Runs after every mutation so the
/// presentation layer never patches its own copy. A failed re-read is logged and nothing is
/// emitted; the mutation itself has already been committed.
fn publish(ctx: &impl EventSink, state: &AppState) {
    match snapshot(state) {
        Ok(payload) => ctx.emit_state_updated(payload),
        Err(error) => log::warn!("state refresh failed after a committed change: {error}"),
    }
}

fn snapshot(state: &AppState) -> Result<StatePayload, TaskError> {
    Ok(StatePayload {
        rows: state.view(now_local())?,
        tags: state.tags()?,
        settings: state.settings(),
    })
}

/// Runs a mutation, then publishes the refreshed state. The result reflects the mutation only.
fn mutate<T>(
    ctx: &impl EventSink,
    state: &AppState,
    action: impl FnOnce(&AppState) -> Result<T, TaskError>,
) -> CommandResult<T> {
    let result = action(state);
    if result.is_ok() {
        publish(ctx, state);
    }
    respond(result)
}

pub fn load_state(state: &AppState) -> CommandResult<StatePayload> {
    respond(snapshot(state))
}

pub fn create_task(ctx: &impl EventSink, state: &AppState, input: TaskInput) -> CommandResult<Task> {
    mutate(ctx, state, |state| {
        let id = state.create_task(&input)?;
        state.read_task(id)
    })
}

pub fn read_task(state: &AppState, task_id: TaskId) -> CommandResult<Task> {
    respond(state.read_task(task_id))
}

pub fn list_tasks(state: &AppState) -> CommandResult<Vec<Task>> {
    respond(state.tasks())
}

pub fn list_tags(state: &AppState) -> CommandResult<BTreeSet<String>> {
    respond(state.tags())
}

pub fn update_task(
    ctx: &impl EventSink,
    state: &AppState,
    task_id: TaskId,
    input: TaskInput,
) -> CommandResult<Task> {
    mutate(ctx, state, |state| {
        state.update_task(task_id, &input)?;
        state.read_task(task_id)
    })
}

pub fn delete_task(ctx: &impl EventSink, state: &AppState, task_id: TaskId) -> CommandResult<bool> {
    mutate(ctx, state, |state| state.remove_task(task_id).map(|_| true))
}

pub fn delete_tasks(
    ctx: &impl EventSink,
    state: &AppState,
    task_ids: Vec<TaskId>,
) -> CommandResult<bool> {
    mutate(ctx, state, |state| state.remove_tasks(&task_ids).map(|_| true))
}

pub fn set_completed(
    ctx: &impl EventSink,
    state: &AppState,
    task_id: TaskId,
    completed: bool,
) -> CommandResult<Task> {
    mutate(ctx, state, |state| {
        state.set_completed(task_id, completed)?;
        state.read_task(task_id)
    })
}

pub fn toggle_completed(
    ctx: &impl EventSink,
    state: &AppState,
    task_id: TaskId,
) -> CommandResult<Task> {
    mutate(ctx, state, |state| {
        state.toggle_completed(task_id)?;
        state.read_task(task_id)
    })
}

/// A one-off view that leaves the stored filter and sort alone.
pub fn build_view(
    state: &AppState,
    filter_tag: Option<String>,
    sort: SortKey,
) -> CommandResult<Vec<ViewRow>> {
    respond(state.view_with(filter_tag.as_deref(), sort, now_local()))
}

/// Stores the list's filter and sort, then publishes the list they produce.
pub fn set_view_options(
    ctx: &impl EventSink,
    state: &AppState,
    filter_tag: Option<String>,
    sort: SortKey,
) -> CommandResult<Settings> {
    let mut settings = state.settings();
    settings.filter_tag = filter_tag.filter(|tag| !tag.trim().is_empty());
    settings.sort = sort;
    update_settings(ctx, state, settings)
}

pub fn update_settings(
    ctx: &impl EventSink,
    state: &AppState,
    settings: Settings,
) -> CommandResult<Settings> {
    mutate(ctx, state, |state| {
        state.update_settings(settings)?;
        Ok(state.settings())
    })
}

/// Scans now and emits a reminder when anything is due. Returns the due tasks either way.
pub fn check_reminders(ctx: &impl EventSink, state: &AppState) -> CommandResult<Vec<Task>> {
    let now = now_local();
    respond(state.due_tasks(now).map(|tasks| {
        if !tasks.is_empty() {
            ctx.emit_reminder(ReminderPayload {
                scanned_at: now,
                tasks: tasks.clone(),
            });
        }
        tasks
    }))
}
