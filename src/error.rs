//! Error types shared by the pipeline and the scheduler.

/// Raised by an [`crate::contract::ItemStore`] when a write cannot be committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("store rejected the write: {0}")]
    Rejected(String),

    #[error("store I/O failed: {0}")]
    Io(String),

    #[error("failed to (de)serialise stored items: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

/// Failure of a background task's unit of work. Cancellation is never represented here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("task execution failed: {0}")]
    Execution(String),

    /// The task's executor was already consumed by an earlier run.
    #[error("task executor already consumed")]
    AlreadyTaken,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("unknown speech rule version: {0}")]
    UnknownVersion(String),
}
