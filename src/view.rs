use chrono::NaiveDateTime;

use crate::error::TaskError;
use crate::models::{SortKey, Task, ViewRow, ALL_TAGS};
use crate::store::TaskStore;

/// Reads a fresh snapshot from the store and turns it into display rows.
pub fn build_view(
    store: &TaskStore,
    filter_tag: Option<&str>,
    sort: SortKey,
    now: NaiveDateTime,
) -> Result<Vec<ViewRow>, TaskError> {
    Ok(project(store.list_all()?, filter_tag, sort, now))
}

/// Filters, orders and annotates an already loaded task list.
pub fn project(
    tasks: Vec<Task>,
    filter_tag: Option<&str>,
    sort: SortKey,
    now: NaiveDateTime,
) -> Vec<ViewRow> {
    let mut tasks: Vec<Task> = match active_filter(filter_tag) {
        Some(tag) => tasks
            .into_iter()
            .filter(|task| task.tag.as_deref() == Some(tag))
            .collect(),
        None => tasks,
    };

    match sort {
        SortKey::Name => tasks.sort_by(|a, b| a.text.cmp(&b.text).then(a.id.cmp(&b.id))),
        SortKey::Deadline => {
            tasks.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)))
        }
        SortKey::Tag => tasks.sort_by(|a, b| {
            tag_key(a)
                .cmp(tag_key(b))
                .then(a.id.cmp(&b.id))
        }),
    }

    tasks
        .into_iter()
        .map(|task| ViewRow::from_task(task, now))
        .collect()
}

/// `None` when the filter selects every task.
fn active_filter(filter_tag: Option<&str>) -> Option<&str> {
    filter_tag.filter(|tag| !tag.is_empty() && *tag != ALL_TAGS)
}

fn tag_key(task: &Task) -> &str {
    task.tag.as_deref().unwrap_or("")
}
