//! # contract: seams between the pipeline, the scheduler and their collaborators
//!
//! Two traits live here:
//! - [`ItemStore`]: the persistence collaborator that buffers and commits speakable items.
//! - [`TaskExecutor`]: the cancellable unit of work a background task runs.
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall` (behind the `test-export-mocks` feature, enabled by
//! default) so integration tests can script store failures and executor outcomes.

use async_trait::async_trait;
use mockall::automock;

use crate::error::{PersistenceError, TaskError};
use crate::item::SpeakableItem;
use crate::task::TaskContext;

/// Buffered item persistence.
///
/// `insert` only stages an item; nothing is visible to readers until `save` commits.
/// Only the single executing task writes, while other components may read concurrently and
/// must treat a partially checkpointed screenplay as incomplete rather than corrupt.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Stage one item for the next commit.
    fn insert(&self, item: SpeakableItem);

    /// Commit every staged item. Returns how many items were committed.
    ///
    /// A failed commit drops the batch it tried to write; nothing it held stays staged.
    async fn save(&self) -> Result<usize, PersistenceError>;

    /// Drop every staged item without committing it. Returns how many were dropped.
    fn discard_pending(&self) -> usize;

    /// Committed items of one screenplay, ordered by `order_index`.
    async fn items_for_screenplay(
        &self,
        screenplay_id: &str,
    ) -> Result<Vec<SpeakableItem>, PersistenceError>;

    /// Remove every committed item of one screenplay. Returns how many were removed.
    async fn delete_screenplay(&self, screenplay_id: &str) -> Result<usize, PersistenceError>;
}

/// A unit of cancellable work driven by the background task manager.
///
/// Implementors must poll [`TaskContext::is_cancelled`] between units of work; the manager
/// never preempts a running executor. Returning `Ok(())` after observing cancellation is the
/// expected way to stop.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TaskExecutor: Send {
    async fn execute(&mut self, ctx: TaskContext) -> Result<(), TaskError>;
}
