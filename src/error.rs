use crate::models::TaskId;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum TaskError {
    /// Rejected input; nothing was written.
    Validation(&'static str),
    NotFound(TaskId),
    Storage(StorageError),
}

impl TaskError {
    /// Stable machine-readable name used in command results.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskError::Validation(_) => "validation",
            TaskError::NotFound(_) => "not_found",
            TaskError::Storage(_) => "storage",
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::Validation(message) => write!(f, "invalid input: {message}"),
            TaskError::NotFound(id) => write!(f, "task not found: {id}"),
            TaskError::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for TaskError {
    fn from(value: StorageError) -> Self {
        TaskError::Storage(value)
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(value: rusqlite::Error) -> Self {
        TaskError::Storage(StorageError::Sql(value))
    }
}

impl From<std::io::Error> for TaskError {
    fn from(value: std::io::Error) -> Self {
        TaskError::Storage(StorageError::Io(value))
    }
}
