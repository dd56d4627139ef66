//! In-memory implementation of IQueueStore
//!
//! Keeps the latest snapshot in memory. Used by tests and by embedding
//! hosts that handle durability themselves (or accept losing the queue on
//! process exit). A save-failure toggle lets tests exercise the queue's
//! best-effort persistence path.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use driftsync_core::ports::{IQueueStore, QueueSnapshot};

/// In-memory queue store
#[derive(Default)]
pub struct MemoryQueueStore {
    snapshot: Mutex<Option<QueueSnapshot>>,
    fail_saves: AtomicBool,
}

impl MemoryQueueStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with a snapshot
    pub fn with_snapshot(snapshot: QueueSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Makes subsequent saves fail, for exercising best-effort persistence
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the stored snapshot, if any
    pub async fn snapshot(&self) -> Option<QueueSnapshot> {
        self.snapshot.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl IQueueStore for MemoryQueueStore {
    async fn save(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("simulated storage failure");
        }
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<QueueSnapshot>> {
        Ok(self.snapshot.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip() {
        let store = MemoryQueueStore::new();
        assert!(store.load().await.unwrap().is_none());

        let snap = QueueSnapshot::new(1, Vec::new());
        store.save(&snap).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_fail_saves_toggle() {
        let store = MemoryQueueStore::new();
        store.set_fail_saves(true);
        assert!(store.save(&QueueSnapshot::new(1, Vec::new())).await.is_err());

        store.set_fail_saves(false);
        assert!(store.save(&QueueSnapshot::new(2, Vec::new())).await.is_ok());
        assert_eq!(store.snapshot().await.unwrap().revision, 2);
    }
}
