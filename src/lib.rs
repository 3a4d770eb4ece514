//! Task store with deadline-aware views and a reminder scanner: the core of a single-window
//! to-do list. The window itself lives elsewhere and talks to this crate through
//! [`commands`] and an [`events::EventSink`].
pub mod commands;
pub mod deadline;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod store;
pub mod view;

pub use error::TaskError;
pub use events::{EventSink, ReminderPayload, StatePayload};
pub use models::{Settings, SortKey, Task, TaskId, TaskInput, ViewRow};
pub use scheduler::{scan, start_scheduler};
pub use state::AppState;
pub use storage::StorageError;
pub use store::TaskStore;
pub use view::build_view;
