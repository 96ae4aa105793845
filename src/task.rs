//! Background task: one unit of cancellable work and its lifecycle.
//!
//! ```text
//! Queued -> Running -> Completed | Failed | Cancelled
//!    \__________________________________/^
//!                 cancel()
//! ```
//!
//! Terminal states are final. `cancel()` on a terminal task is a no-op.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::contract::TaskExecutor;
use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Queued => "Queued",
            TaskState::Running => "Running",
            TaskState::Completed => "Completed",
            TaskState::Failed => "Failed",
            TaskState::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug)]
struct TaskStatus {
    state: TaskState,
    current_step: usize,
    total_steps: usize,
    message: String,
    error: Option<TaskError>,
}

/// Point-in-time view of a task, for progress displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub name: String,
    pub is_blocking: bool,
    pub state: TaskState,
    pub current_step: usize,
    pub total_steps: usize,
    pub progress: f64,
    pub message: String,
    pub error: Option<String>,
}

pub struct BackgroundTask {
    id: Uuid,
    name: String,
    /// Advisory only: tells a UI to lock while this runs. The scheduler ignores it.
    is_blocking: bool,
    status: Mutex<TaskStatus>,
    executor: Mutex<Option<Box<dyn TaskExecutor>>>,
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_blocking", &self.is_blocking)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn progress_fraction(current_step: usize, total_steps: usize) -> f64 {
    if total_steps == 0 {
        return 0.0;
    }
    (current_step as f64 / total_steps as f64).clamp(0.0, 1.0)
}

impl BackgroundTask {
    pub fn new(
        name: impl Into<String>,
        is_blocking: bool,
        executor: impl TaskExecutor + 'static,
    ) -> Self {
        Self::from_boxed(name, is_blocking, Box::new(executor))
    }

    pub fn from_boxed(
        name: impl Into<String>,
        is_blocking: bool,
        executor: Box<dyn TaskExecutor>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            is_blocking,
            status: Mutex::new(TaskStatus {
                state: TaskState::Queued,
                current_step: 0,
                total_steps: 0,
                message: "Queued".to_string(),
                error: None,
            }),
            executor: Mutex::new(Some(executor)),
        }
    }

    fn status(&self) -> MutexGuard<'_, TaskStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    pub fn state(&self) -> TaskState {
        self.status().state
    }

    pub fn current_step(&self) -> usize {
        self.status().current_step
    }

    pub fn total_steps(&self) -> usize {
        self.status().total_steps
    }

    pub fn message(&self) -> String {
        self.status().message.clone()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.status().error.clone()
    }

    /// `current_step / total_steps` clamped to `[0, 1]`; `0` while the total is unknown.
    pub fn progress(&self) -> f64 {
        let status = self.status();
        progress_fraction(status.current_step, status.total_steps)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let status = self.status();
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            is_blocking: self.is_blocking,
            state: status.state,
            current_step: status.current_step,
            total_steps: status.total_steps,
            progress: progress_fraction(status.current_step, status.total_steps),
            message: status.message.clone(),
            error: status.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// Request cancellation. A running executor stops at its next cancellation check.
    pub fn cancel(&self) {
        let mut status = self.status();
        if status.state.is_terminal() {
            debug!(task = %self.name, state = ?status.state, "[TASK] Cancel ignored on finished task");
            return;
        }
        info!(task = %self.name, from = ?status.state, "[TASK] Cancelled");
        status.state = TaskState::Cancelled;
        status.message = TaskState::Cancelled.label().to_string();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Queued -> Running. Returns false if the task is no longer queued.
    pub(crate) fn mark_running(&self) -> bool {
        let mut status = self.status();
        if status.state != TaskState::Queued {
            return false;
        }
        status.state = TaskState::Running;
        status.message = TaskState::Running.label().to_string();
        true
    }

    pub(crate) fn take_executor(&self) -> Option<Box<dyn TaskExecutor>> {
        self.executor
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Map the executor's outcome onto the task.
    ///
    /// Success completes the task only if the executor left it `Running`. A failure is
    /// recorded unless the task already reached a terminal state (e.g. it was cancelled
    /// and then failed its final flush).
    pub(crate) fn finish(&self, outcome: Result<(), TaskError>) {
        let mut status = self.status();
        match outcome {
            Ok(()) => {
                if status.state == TaskState::Running {
                    status.state = TaskState::Completed;
                    if status.message == TaskState::Running.label() {
                        status.message = TaskState::Completed.label().to_string();
                    }
                    info!(task = %self.name, "[TASK] Completed");
                } else {
                    debug!(task = %self.name, state = ?status.state, "[TASK] Executor returned after leaving Running");
                }
            }
            Err(e) => {
                if status.state.is_terminal() {
                    warn!(task = %self.name, state = ?status.state, error = %e, "[TASK] Error after terminal state, keeping state");
                } else {
                    warn!(task = %self.name, error = %e, "[TASK] Failed");
                    status.state = TaskState::Failed;
                    status.message = e.to_string();
                    status.error = Some(e);
                }
            }
        }
    }

    fn update_running(&self, f: impl FnOnce(&mut TaskStatus)) {
        let mut status = self.status();
        if status.state == TaskState::Running {
            f(&mut status);
        }
    }
}

/// Handle passed to an executor: progress reporting and cancellation polling.
///
/// Progress updates are dropped once the task has left `Running`.
#[derive(Debug, Clone)]
pub struct TaskContext {
    task: Arc<BackgroundTask>,
}

impl TaskContext {
    pub fn new(task: Arc<BackgroundTask>) -> Self {
        Self { task }
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.is_cancelled()
    }

    pub fn set_total_steps(&self, total: usize) {
        self.task.update_running(|s| s.total_steps = total);
    }

    pub fn set_current_step(&self, step: usize) {
        self.task.update_running(|s| s.current_step = step);
    }

    pub fn set_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.task.update_running(|s| s.message = message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockTaskExecutor;

    fn task() -> BackgroundTask {
        BackgroundTask::new("t", false, MockTaskExecutor::new())
    }

    #[test]
    fn new_task_is_queued_with_zero_progress() {
        let t = task();
        assert_eq!(t.state(), TaskState::Queued);
        assert_eq!(t.total_steps(), 0);
        assert_eq!(t.progress(), 0.0);
        assert!(t.error().is_none());
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress_fraction(5, 10), 0.5);
        assert_eq!(progress_fraction(15, 10), 1.0);
        assert_eq!(progress_fraction(3, 0), 0.0);
    }

    #[test]
    fn cancel_on_terminal_task_is_noop() {
        let t = task();
        assert!(t.mark_running());
        t.finish(Ok(()));
        assert_eq!(t.state(), TaskState::Completed);
        t.cancel();
        assert_eq!(t.state(), TaskState::Completed);
    }

    #[test]
    fn plain_success_replaces_running_message() {
        let t = task();
        t.mark_running();
        t.finish(Ok(()));
        assert_eq!(t.message(), "Completed");

        let custom = Arc::new(task());
        custom.mark_running();
        TaskContext::new(custom.clone()).set_message("Done: 4 files");
        custom.finish(Ok(()));
        assert_eq!(custom.state(), TaskState::Completed);
        assert_eq!(custom.message(), "Done: 4 files");
    }

    #[test]
    fn cancelled_queued_task_cannot_start() {
        let t = task();
        t.cancel();
        assert_eq!(t.state(), TaskState::Cancelled);
        assert_eq!(t.message(), "Cancelled");
        assert!(!t.mark_running());
    }

    #[test]
    fn success_does_not_overwrite_cancellation() {
        let t = task();
        t.mark_running();
        t.cancel();
        t.finish(Ok(()));
        assert_eq!(t.state(), TaskState::Cancelled);
        assert!(t.error().is_none());
    }

    #[test]
    fn failure_records_error_unless_terminal() {
        let t = task();
        t.mark_running();
        t.finish(Err(TaskError::Execution("boom".into())));
        assert_eq!(t.state(), TaskState::Failed);
        assert_eq!(t.error(), Some(TaskError::Execution("boom".into())));

        let c = task();
        c.mark_running();
        c.cancel();
        c.finish(Err(TaskError::Execution("late".into())));
        assert_eq!(c.state(), TaskState::Cancelled);
        assert!(c.error().is_none());
    }

    #[test]
    fn context_updates_only_apply_while_running() {
        let t = Arc::new(task());
        let ctx = TaskContext::new(t.clone());
        ctx.set_total_steps(10);
        assert_eq!(t.total_steps(), 0);

        t.mark_running();
        ctx.set_total_steps(10);
        ctx.set_current_step(4);
        ctx.set_message("working");
        let snap = t.snapshot();
        assert_eq!(snap.total_steps, 10);
        assert_eq!(snap.current_step, 4);
        assert_eq!(snap.progress, 0.4);
        assert_eq!(snap.message, "working");

        t.cancel();
        ctx.set_current_step(9);
        assert_eq!(t.current_step(), 4);
        assert!(ctx.is_cancelled());
    }
}
