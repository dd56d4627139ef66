//! JSON file implementation of IQueueStore
//!
//! Persists the queue snapshot as a single pretty-printed JSON file.
//! Writes go to a temporary sibling file first and are renamed into
//! place, so a crash mid-write never leaves a truncated snapshot behind.
//!
//! ## Revision checking
//!
//! The store remembers the revision it last wrote or loaded. Before every
//! save it re-reads the on-disk revision; a mismatch means another writer
//! (a second process, another tab's queue) flushed to the same path, and
//! the save fails with [`StoreError::RevisionConflict`] instead of
//! overwriting it. One queue instance per storage path remains the
//! supported configuration.

use std::io::ErrorKind;
use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use driftsync_core::ports::{IQueueStore, QueueSnapshot};

use crate::StoreError;

/// JSON-file-backed implementation of the queue store port
pub struct JsonFileQueueStore {
    path: PathBuf,
    /// Revision this store last wrote or loaded; `None` until then
    last_revision: Mutex<Option<u64>>,
}

impl JsonFileQueueStore {
    /// Creates a store over the given file path
    ///
    /// The file and its parent directories are created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_revision: Mutex::new(None),
        }
    }

    /// Returns the backing file path
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read_snapshot(&self) -> Result<Option<QueueSnapshot>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let snapshot: QueueSnapshot = serde_json::from_slice(&bytes)?;
                Ok(Some(snapshot))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn write_snapshot(&self, snapshot: &QueueSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "queue.json".into());
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IQueueStore for JsonFileQueueStore {
    async fn save(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()> {
        let mut last = self.last_revision.lock().await;

        if let Some(existing) = self.read_snapshot().await? {
            match *last {
                Some(expected) if existing.revision == expected => {}
                Some(expected) => {
                    warn!(
                        path = %self.path.display(),
                        expected,
                        found = existing.revision,
                        "Refusing to overwrite foreign queue snapshot"
                    );
                    return Err(StoreError::RevisionConflict {
                        expected,
                        found: existing.revision,
                    }
                    .into());
                }
                None => {
                    warn!(
                        path = %self.path.display(),
                        found = existing.revision,
                        "Refusing to overwrite snapshot never loaded by this store"
                    );
                    return Err(StoreError::ForeignSnapshot {
                        found: existing.revision,
                    }
                    .into());
                }
            }
        }

        self.write_snapshot(snapshot).await?;
        *last = Some(snapshot.revision);

        debug!(
            path = %self.path.display(),
            revision = snapshot.revision,
            operations = snapshot.operations.len(),
            "Persisted queue snapshot"
        );

        Ok(())
    }

    async fn load(&self) -> anyhow::Result<Option<QueueSnapshot>> {
        let mut last = self.last_revision.lock().await;
        let snapshot = self.read_snapshot().await?;
        *last = snapshot.as_ref().map(|s| s.revision);

        match &snapshot {
            Some(snap) => debug!(
                path = %self.path.display(),
                revision = snap.revision,
                operations = snap.operations.len(),
                "Loaded queue snapshot"
            ),
            None => debug!(path = %self.path.display(), "No queue snapshot on disk"),
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_core::domain::{Collection, OperationKind, QueuedOperation};
    use serde_json::json;

    fn snapshot(revision: u64, count: usize) -> QueueSnapshot {
        let operations = (0..count)
            .map(|i| {
                QueuedOperation::new(
                    OperationKind::Create,
                    Collection::Quizzes,
                    json!({"index": i}),
                    3,
                )
            })
            .collect();
        QueueSnapshot::new(revision, operations)
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path().join("queue.json"));

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path().join("nested").join("queue.json"));

        let snap = snapshot(1, 2);
        store.save(&snap).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.operations.len(), 2);
        assert_eq!(loaded.operations[0].id(), snap.operations[0].id());
    }

    #[tokio::test]
    async fn test_sequential_saves_advance_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path().join("queue.json"));

        store.save(&snapshot(1, 1)).await.unwrap();
        store.save(&snapshot(2, 2)).await.unwrap();
        store.save(&snapshot(3, 0)).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.revision, 3);
        assert!(loaded.operations.is_empty());
    }

    #[tokio::test]
    async fn test_foreign_writer_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");

        let ours = JsonFileQueueStore::new(&path);
        ours.save(&snapshot(1, 1)).await.unwrap();

        // A second instance on the same path loads and flushes its own
        // revision underneath us.
        let theirs = JsonFileQueueStore::new(&path);
        theirs.load().await.unwrap();
        theirs.save(&snapshot(9, 3)).await.unwrap();

        let err = ours.save(&snapshot(2, 1)).await.unwrap_err();
        let store_err = err.downcast_ref::<StoreError>().unwrap();
        assert!(matches!(
            store_err,
            StoreError::RevisionConflict { expected: 1, found: 9 }
        ));
    }

    #[tokio::test]
    async fn test_save_over_never_loaded_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");

        let first = JsonFileQueueStore::new(&path);
        first.save(&snapshot(4, 1)).await.unwrap();

        // A fresh store that never loaded must not clobber the file.
        let second = JsonFileQueueStore::new(&path);
        let err = second.save(&snapshot(1, 0)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>().unwrap(),
            StoreError::ForeignSnapshot { found: 4 }
        ));
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileQueueStore::new(dir.path().join("queue.json"));
        store.save(&snapshot(1, 1)).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("queue.json")]);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_surfaces_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileQueueStore::new(&path);
        assert!(store.load().await.is_err());
    }
}
