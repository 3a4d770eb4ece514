use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use crate::error::TaskError;
use crate::models::{Settings, SortKey, Task, TaskId, TaskInput, ViewRow};
use crate::scheduler;
use crate::storage::Storage;
use crate::store::TaskStore;
use crate::view;

/// Shared handle to the task store and settings. Every operation holds the one lock for its
/// whole duration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

impl AppState {
    /// Opens (or creates) the data directory: `tasks.db` and `settings.json`.
    pub fn open(root: PathBuf) -> Result<Self, TaskError> {
        let storage = Storage::new(root);
        storage.ensure_dirs()?;
        let settings = match storage.load_settings() {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("settings unavailable, using defaults: {err}");
                Settings::default()
            }
        };
        let store = TaskStore::open(storage.database_path())?;
        log::info!("task store opened dir={}", storage.root().display());
        Ok(Self::from_parts(store, settings, Some(storage)))
    }

    /// A state whose settings live only in memory.
    pub fn new(store: TaskStore, settings: Settings) -> Self {
        Self::from_parts(store, settings, None)
    }

    fn from_parts(store: TaskStore, settings: Settings, storage: Option<Storage>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                store,
                settings,
                storage,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppData> {
        // The store keeps no in-memory invariants a panic could break.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn create_task(&self, input: &TaskInput) -> Result<TaskId, TaskError> {
        let guard = self.lock();
        guard
            .store
            .create(&input.text, input.tag.as_deref(), input.deadline)
    }

    pub fn read_task(&self, id: TaskId) -> Result<Task, TaskError> {
        self.lock().store.read(id)
    }

    pub fn tasks(&self) -> Result<Vec<Task>, TaskError> {
        self.lock().store.list_all()
    }

    pub fn tags(&self) -> Result<BTreeSet<String>, TaskError> {
        self.lock().store.list_tags()
    }

    pub fn update_task(&self, id: TaskId, input: &TaskInput) -> Result<(), TaskError> {
        let guard = self.lock();
        guard
            .store
            .update(id, &input.text, input.tag.as_deref(), input.deadline)
    }

    pub fn remove_task(&self, id: TaskId) -> Result<(), TaskError> {
        self.lock().store.delete(id)
    }

    pub fn remove_tasks(&self, ids: &[TaskId]) -> Result<(), TaskError> {
        self.lock().store.delete_many(ids)
    }

    pub fn set_completed(&self, id: TaskId, value: bool) -> Result<(), TaskError> {
        self.lock().store.set_completed(id, value)
    }

    pub fn toggle_completed(&self, id: TaskId) -> Result<bool, TaskError> {
        self.lock().store.toggle_completed(id)
    }

    /// The list as the current settings (filter and sort) present it.
    pub fn view(&self, now: NaiveDateTime) -> Result<Vec<ViewRow>, TaskError> {
        let guard = self.lock();
        view::build_view(
            &guard.store,
            guard.settings.filter_tag.as_deref(),
            guard.settings.sort,
            now,
        )
    }

    pub fn view_with(
        &self,
        filter_tag: Option<&str>,
        sort: SortKey,
        now: NaiveDateTime,
    ) -> Result<Vec<ViewRow>, TaskError> {
        view::build_view(&self.lock().store, filter_tag, sort, now)
    }

    /// Reminder-eligible tasks using the configured lookahead.
    pub fn due_tasks(&self, now: NaiveDateTime) -> Result<Vec<Task>, TaskError> {
        let guard = self.lock();
        scheduler::scan(&guard.store, now, guard.settings.lookahead())
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// Replaces the settings and writes them to `settings.json` when the state has a data
    /// directory. On a failed write the previous settings stay in effect.
    pub fn update_settings(&self, settings: Settings) -> Result<(), TaskError> {
        let mut guard = self.lock();
        if let Some(storage) = &guard.storage {
            storage.save_settings(&settings)?;
        }
        guard.settings = settings;
        Ok(())
    }
}

struct AppData {
    store: TaskStore,
    settings: Settings,
    storage: Option<Storage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn input(text: &str, tag: Option<&str>, deadline: NaiveDateTime) -> TaskInput {
        TaskInput {
            text: text.to_string(),
            tag: tag.map(str::to_string),
            deadline,
        }
    }

    fn memory_state() -> AppState {
        AppState::new(TaskStore::open_in_memory().unwrap(), Settings::default())
    }

    #[test]
    fn create_update_complete_and_remove() {
        let state = memory_state();
        let id = state
            .create_task(&input("draft", Some("work"), at(2025, 1, 1, 9, 0, 0)))
            .unwrap();
        assert_eq!(state.tasks().unwrap().len(), 1);

        state.set_completed(id, true).unwrap();
        state
            .update_task(id, &input("final", None, at(2025, 1, 2, 9, 0, 0)))
            .unwrap();
        let task = state.read_task(id).unwrap();
        assert_eq!(task.text, "final");
        assert!(task.completed);

        assert!(!state.toggle_completed(id).unwrap());
        state.remove_task(id).unwrap();
        assert!(matches!(state.read_task(id), Err(TaskError::NotFound(_))));
        assert!(matches!(state.remove_tasks(&[id]), Err(TaskError::NotFound(_))));
    }

    #[test]
    fn view_follows_settings() {
        let state = memory_state();
        let b = state
            .create_task(&input("b", Some("work"), at(2025, 1, 1, 9, 0, 0)))
            .unwrap();
        let a = state
            .create_task(&input("a", Some("work"), at(2025, 1, 2, 9, 0, 0)))
            .unwrap();
        state
            .create_task(&input("c", Some("home"), at(2025, 1, 3, 9, 0, 0)))
            .unwrap();
        let now = at(2025, 1, 1, 0, 0, 0);

        let rows = state.view(now).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id, b);

        state
            .update_settings(Settings {
                sort: SortKey::Name,
                filter_tag: Some("work".to_string()),
                ..Settings::default()
            })
            .unwrap();
        let rows: Vec<TaskId> = state.view(now).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(rows, vec![a, b]);

        let rows = state.view_with(Some("home"), SortKey::Deadline, now).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn due_tasks_use_configured_lookahead() {
        let state = memory_state();
        let id = state
            .create_task(&input("soon", None, at(2025, 1, 1, 9, 5, 0)))
            .unwrap();
        let now = at(2025, 1, 1, 9, 0, 0);
        assert!(state.due_tasks(now).unwrap().is_empty());

        state
            .update_settings(Settings {
                reminder_lookahead_secs: 600,
                ..Settings::default()
            })
            .unwrap();
        let due = state.due_tasks(now).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, id);
    }

    #[test]
    fn open_persists_tasks_and_settings_across_restarts() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("data");
        let id = {
            let state = AppState::open(dir.clone()).unwrap();
            assert_eq!(state.settings(), Settings::default());
            state
                .update_settings(Settings {
                    sort: SortKey::Tag,
                    ..Settings::default()
                })
                .unwrap();
            state
                .create_task(&input("persist", Some("work"), at(2025, 1, 1, 9, 0, 0)))
                .unwrap()
        };

        let state = AppState::open(dir.clone()).unwrap();
        assert_eq!(state.settings().sort, SortKey::Tag);
        assert_eq!(state.read_task(id).unwrap().text, "persist");
        assert!(dir.join("tasks.db").exists());
        assert!(dir.join("settings.json").exists());
    }

    #[test]
    fn failed_settings_write_keeps_previous_settings() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("data");
        let state = AppState::open(dir.clone()).unwrap();
        // A directory where the settings file should go makes the rename fail.
        std::fs::create_dir_all(dir.join("settings.json")).unwrap();

        let result = state.update_settings(Settings {
            sort: SortKey::Name,
            ..Settings::default()
        });
        assert!(matches!(result, Err(TaskError::Storage(_))));
        assert_eq!(state.settings().sort, SortKey::Deadline);
    }

    #[test]
    fn clones_share_one_store() {
        let state = memory_state();
        let other = state.clone();
        other
            .create_task(&input("shared", None, at(2025, 1, 1, 9, 0, 0)))
            .unwrap();
        assert_eq!(state.tasks().unwrap().len(), 1);
    }
}
