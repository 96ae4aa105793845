//! Concrete item stores.
//!
//! - [`MemoryItemStore`]: in-process store, used by tests and embedders that persist elsewhere.
//! - [`JsonLinesItemStore`]: one JSON object per line on disk, rewritten atomically on every
//!   commit so readers never observe a half-written file.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};

use crate::contract::ItemStore;
use crate::error::PersistenceError;
use crate::item::SpeakableItem;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

fn sorted_for(items: &[SpeakableItem], screenplay_id: &str) -> Vec<SpeakableItem> {
    let mut out: Vec<SpeakableItem> = items
        .iter()
        .filter(|i| i.screenplay_id == screenplay_id)
        .cloned()
        .collect();
    out.sort_by_key(|i| i.order_index);
    out
}

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    pending: Mutex<Vec<SpeakableItem>>,
    committed: Mutex<Vec<SpeakableItem>>,
    saves: Mutex<usize>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed item, in commit order.
    pub fn committed(&self) -> Vec<SpeakableItem> {
        lock(&self.committed).clone()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        *lock(&self.saves)
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    fn insert(&self, item: SpeakableItem) {
        lock(&self.pending).push(item);
    }

    async fn save(&self) -> Result<usize, PersistenceError> {
        let staged: Vec<SpeakableItem> = lock(&self.pending).drain(..).collect();
        let count = staged.len();
        lock(&self.committed).extend(staged);
        *lock(&self.saves) += 1;
        debug!(count, "[STORE] Memory store committed items");
        Ok(count)
    }

    fn discard_pending(&self) -> usize {
        lock(&self.pending).drain(..).count()
    }

    async fn items_for_screenplay(
        &self,
        screenplay_id: &str,
    ) -> Result<Vec<SpeakableItem>, PersistenceError> {
        Ok(sorted_for(&lock(&self.committed), screenplay_id))
    }

    async fn delete_screenplay(&self, screenplay_id: &str) -> Result<usize, PersistenceError> {
        let mut committed = lock(&self.committed);
        let before = committed.len();
        committed.retain(|i| i.screenplay_id != screenplay_id);
        Ok(before - committed.len())
    }
}

#[derive(Debug)]
pub struct JsonLinesItemStore {
    path: PathBuf,
    pending: Mutex<Vec<SpeakableItem>>,
    committed: tokio::sync::Mutex<Vec<SpeakableItem>>,
}

impl JsonLinesItemStore {
    /// Open `path`, loading any items a previous run committed. A missing file is empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let committed = match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let mut items = Vec::new();
                for (n, line) in content.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let item: SpeakableItem = serde_json::from_str(line).map_err(|e| {
                        error!(path = %path.display(), line = n + 1, error = %e, "[STORE][ERROR] Corrupt item line");
                        PersistenceError::from(e)
                    })?;
                    items.push(item);
                }
                items
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!(path = %path.display(), error = %e, "[STORE][ERROR] Failed to read item file");
                return Err(e.into());
            }
        };
        info!(path = %path.display(), items = committed.len(), "[STORE] Opened JSON lines store");
        Ok(Self {
            path,
            pending: Mutex::new(Vec::new()),
            committed: tokio::sync::Mutex::new(committed),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_all(&self, items: &[SpeakableItem]) -> Result<(), PersistenceError> {
        let mut buf = Vec::new();
        for item in items {
            serde_json::to_writer(&mut buf, item)?;
            buf.push(b'\n');
        }
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &buf))
            .await
            .map_err(|e| PersistenceError::Io(format!("writer task failed: {e}")))?
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| PersistenceError::Io(e.error.to_string()))?;
    Ok(())
}

#[async_trait]
impl ItemStore for JsonLinesItemStore {
    fn insert(&self, item: SpeakableItem) {
        lock(&self.pending).push(item);
    }

    async fn save(&self) -> Result<usize, PersistenceError> {
        let mut committed = self.committed.lock().await;
        let staged: Vec<SpeakableItem> = lock(&self.pending).drain(..).collect();
        let count = staged.len();

        let mut next = committed.clone();
        next.extend(staged);
        if let Err(e) = self.write_all(&next).await {
            error!(path = %self.path.display(), error = %e, dropped = count, "[STORE][ERROR] Commit failed, batch dropped");
            return Err(e);
        }
        *committed = next;
        debug!(path = %self.path.display(), count, "[STORE] Committed items");
        Ok(count)
    }

    fn discard_pending(&self) -> usize {
        let dropped = lock(&self.pending).drain(..).count();
        if dropped > 0 {
            debug!(path = %self.path.display(), dropped, "[STORE] Discarded staged items");
        }
        dropped
    }

    async fn items_for_screenplay(
        &self,
        screenplay_id: &str,
    ) -> Result<Vec<SpeakableItem>, PersistenceError> {
        let committed = self.committed.lock().await;
        Ok(sorted_for(&committed, screenplay_id))
    }

    async fn delete_screenplay(&self, screenplay_id: &str) -> Result<usize, PersistenceError> {
        let mut committed = self.committed.lock().await;
        let kept: Vec<SpeakableItem> = committed
            .iter()
            .filter(|i| i.screenplay_id != screenplay_id)
            .cloned()
            .collect();
        let removed = committed.len() - kept.len();
        if removed > 0 {
            self.write_all(&kept).await?;
            *committed = kept;
            info!(screenplay_id, removed, "[STORE] Deleted screenplay items");
        }
        Ok(removed)
    }
}
