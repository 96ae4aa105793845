//! Speakable-item generation as a background task.
//!
//! Wraps one speech pass over a document with:
//! - `total_steps` set to the element count before any work starts,
//! - a cancellation check before every scene heading, dialogue block or single element,
//! - a checkpoint commit every `save_interval` produced items, advancing `current_step`,
//! - a final commit and a `Completed: N items processed` summary.
//!
//! Cancellation commits whatever was staged since the last checkpoint and returns `Ok`, so
//! the task stays `Cancelled` and never carries an error.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use crate::contract::{ItemStore, TaskExecutor};
use crate::element::ScreenplayDocument;
use crate::error::{PersistenceError, TaskError};
use crate::processor::ScreenplaySpeechProcessor;
use crate::task::{BackgroundTask, TaskContext};

pub const DEFAULT_SAVE_INTERVAL: usize = 25;

/// Outcome counters of one generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub produced: usize,
    pub persisted: usize,
    pub cancelled: bool,
}

/// Shared view of a generation task's counters, readable after the task was boxed.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport(Arc<Mutex<GenerationSummary>>);

impl GenerationReport {
    pub fn summary(&self) -> GenerationSummary {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut GenerationSummary)) {
        f(&mut self.0.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

pub struct SpeakableItemGenerationTask {
    document: ScreenplayDocument,
    processor: Arc<ScreenplaySpeechProcessor>,
    store: Arc<dyn ItemStore>,
    save_interval: usize,
    replace_existing: bool,
    report: GenerationReport,
}

impl SpeakableItemGenerationTask {
    pub fn new(
        document: ScreenplayDocument,
        processor: Arc<ScreenplaySpeechProcessor>,
        store: Arc<dyn ItemStore>,
    ) -> Self {
        Self {
            document,
            processor,
            store,
            save_interval: DEFAULT_SAVE_INTERVAL,
            replace_existing: false,
            report: GenerationReport::default(),
        }
    }

    /// Checkpoint every `interval` produced items. Zero is treated as one.
    pub fn with_save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval.max(1);
        self
    }

    /// Delete the screenplay's previously committed items before generating.
    pub fn replacing_existing(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }

    pub fn report(&self) -> GenerationReport {
        self.report.clone()
    }

    /// Wrap into a blocking background task named after the screenplay.
    pub fn into_task(self) -> BackgroundTask {
        let name = format!("Generate speakable items: {}", self.document.screenplay_id());
        BackgroundTask::new(name, true, self)
    }

    async fn commit(&self, pending: &mut usize) -> Result<(), PersistenceError> {
        if *pending == 0 {
            return Ok(());
        }
        *pending = 0;
        match self.store.save().await {
            Ok(committed) => {
                self.report.update(|s| s.persisted += committed);
                Ok(())
            }
            Err(e) => {
                // Nothing from a failed run may leak into the next commit on a shared store.
                let dropped = self.store.discard_pending();
                debug!(dropped, "[GENERATE] Dropped staged items after failed commit");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TaskExecutor for SpeakableItemGenerationTask {
    async fn execute(&mut self, ctx: TaskContext) -> Result<(), TaskError> {
        let screenplay_id = self.document.screenplay_id();
        let total = self.document.elements.len();
        ctx.set_total_steps(total);
        ctx.set_message(format!("Generating speakable items for {}", screenplay_id));
        info!(screenplay_id = %screenplay_id, elements = total, save_interval = self.save_interval, "[GENERATE] Starting generation");

        if self.replace_existing {
            let removed = self.store.delete_screenplay(&screenplay_id).await?;
            debug!(screenplay_id = %screenplay_id, removed, "[GENERATE] Removed previous items");
        }

        let mut pending = 0usize;
        let mut produced = 0usize;
        let mut cancelled = false;
        {
            let mut pass = self.processor.pass(&self.document.elements, &screenplay_id);
            while !pass.is_finished() {
                if ctx.is_cancelled() {
                    info!(screenplay_id = %screenplay_id, at = pass.position(), produced, "[GENERATE] Cancellation observed");
                    cancelled = true;
                    break;
                }
                let Some(step) = pass.next() else { break };
                for item in step.items {
                    self.store.insert(item);
                    pending += 1;
                    produced += 1;
                }
                self.report.update(|s| s.produced = produced);

                if pending >= self.save_interval {
                    ctx.set_current_step(pass.position());
                    ctx.set_message(format!("Processed {} of {} elements", pass.position(), total));
                    if let Err(e) = self.commit(&mut pending).await {
                        error!(screenplay_id = %screenplay_id, error = %e, "[GENERATE][ERROR] Checkpoint failed");
                        return Err(e.into());
                    }
                    debug!(screenplay_id = %screenplay_id, step = pass.position(), produced, "[GENERATE] Checkpoint saved");
                    tokio::task::yield_now().await;
                }
            }
        }

        if let Err(e) = self.commit(&mut pending).await {
            error!(screenplay_id = %screenplay_id, error = %e, "[GENERATE][ERROR] Final save failed");
            return Err(e.into());
        }

        if cancelled {
            self.report.update(|s| s.cancelled = true);
            return Ok(());
        }

        ctx.set_current_step(total);
        ctx.set_message(format!("Completed: {} items processed", produced));
        info!(screenplay_id = %screenplay_id, produced, "[GENERATE] Generation completed");
        Ok(())
    }
}
