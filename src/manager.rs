//! Background task manager: a FIFO queue drained by a single cooperative worker.
//!
//! At most one processing loop runs at a time; a `processing` flag guards re-entry so
//! [`BackgroundTaskManager::run_next`] and [`BackgroundTaskManager::run_until_idle`] are
//! safe to call repeatedly. The loop always picks the first task that is still `Queued`,
//! so tasks cancelled while waiting are skipped and never run. A failing task does not stop
//! the queue.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::TaskError;
use crate::task::{BackgroundTask, TaskContext, TaskState};

#[derive(Debug, Default)]
pub struct BackgroundTaskManager {
    tasks: Mutex<Vec<Arc<BackgroundTask>>>,
    running: Mutex<Option<Arc<BackgroundTask>>>,
    processing: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl BackgroundTaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` to the queue. Returns the shared handle used to observe or cancel it.
    pub fn enqueue(&self, task: BackgroundTask) -> Arc<BackgroundTask> {
        let task = Arc::new(task);
        info!(task = %task.name(), id = %task.id(), "[QUEUE] Task enqueued");
        lock(&self.tasks).push(task.clone());
        task
    }

    pub fn tasks(&self) -> Vec<Arc<BackgroundTask>> {
        lock(&self.tasks).clone()
    }

    pub fn running_task(&self) -> Option<Arc<BackgroundTask>> {
        lock(&self.running).clone()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Spawn the processing loop on the current tokio runtime unless one is already active.
    pub fn run_next(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.try_begin() {
            debug!("[QUEUE] run_next ignored, queue already processing");
            return None;
        }
        let manager = Arc::clone(self);
        Some(tokio::spawn(async move {
            manager.process_loop().await;
        }))
    }

    /// Drain the queue on the calling task. Returns false if another loop was already active.
    pub async fn run_until_idle(&self) -> bool {
        if !self.try_begin() {
            debug!("[QUEUE] run_until_idle ignored, queue already processing");
            return false;
        }
        self.process_loop().await;
        true
    }

    /// Cancel `task`. A running executor observes this at its next cancellation check.
    pub fn cancel_task(&self, task: &BackgroundTask) {
        task.cancel();
    }

    /// Drop completed tasks. Failed and cancelled tasks stay visible.
    pub fn clear_completed(&self) {
        let mut tasks = lock(&self.tasks);
        let before = tasks.len();
        tasks.retain(|t| t.state() != TaskState::Completed);
        debug!(removed = before - tasks.len(), "[QUEUE] Cleared completed tasks");
    }

    fn try_begin(&self) -> bool {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn next_queued(&self) -> Option<Arc<BackgroundTask>> {
        lock(&self.tasks)
            .iter()
            .find(|t| t.state() == TaskState::Queued)
            .cloned()
    }

    /// Caller must hold the `processing` flag.
    async fn process_loop(&self) {
        loop {
            while let Some(task) = self.next_queued() {
                self.run_task(task).await;
            }
            self.processing.store(false, Ordering::SeqCst);

            // A task enqueued between the last check and releasing the flag would otherwise
            // wait for the next explicit run_next.
            if self.next_queued().is_none() || !self.try_begin() {
                break;
            }
        }
        info!("[QUEUE] Queue idle");
    }

    async fn run_task(&self, task: Arc<BackgroundTask>) {
        if !task.mark_running() {
            return;
        }
        *lock(&self.running) = Some(task.clone());
        info!(task = %task.name(), id = %task.id(), "[QUEUE] Running task");

        let outcome = match task.take_executor() {
            Some(mut executor) => {
                let ctx = TaskContext::new(task.clone());
                match AssertUnwindSafe(executor.execute(ctx)).catch_unwind().await {
                    Ok(result) => result,
                    Err(_) => {
                        error!(task = %task.name(), "[QUEUE][ERROR] Executor panicked");
                        Err(TaskError::Execution("executor panicked".to_string()))
                    }
                }
            }
            None => Err(TaskError::AlreadyTaken),
        };

        task.finish(outcome);
        *lock(&self.running) = None;
        info!(task = %task.name(), state = ?task.state(), "[QUEUE] Task finished");
    }
}
