//! Queue store port (driven/secondary port)
//!
//! This module defines the interface for persisting the offline queue
//! across process restarts.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (JSON file, in-memory, etc.) and don't need domain-level
//!   classification.
//! - The persisted form is the durable *description* of each operation
//!   only: [`QueuedOperation`] carries no executable action, so a snapshot
//!   is a plain JSON array. The executable binding is re-attached by the
//!   queue on reload via its handler registry.
//! - Every snapshot carries a monotonic `revision` so adapters can detect
//!   a foreign writer on the same storage key instead of silently
//!   clobbering it. One queue instance per storage key remains the
//!   supported configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::QueuedOperation;

/// The persisted form of the offline queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Monotonic revision, incremented on every flush
    pub revision: u64,
    /// When this snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// The queued operations, in FIFO order
    pub operations: Vec<QueuedOperation>,
}

impl QueueSnapshot {
    /// Creates a snapshot of the given operations at the given revision
    pub fn new(revision: u64, operations: Vec<QueuedOperation>) -> Self {
        Self {
            revision,
            saved_at: Utc::now(),
            operations,
        }
    }
}

/// Port trait for durable queue storage
///
/// ## Implementation Notes
///
/// - `save` must replace the previous snapshot atomically; partial writes
///   must never be observable by a subsequent `load`.
/// - `load` returns `Ok(None)` when no snapshot has ever been written.
/// - Implementations should fail `save` rather than overwrite a snapshot
///   they did not write themselves (revision mismatch).
#[async_trait::async_trait]
pub trait IQueueStore: Send + Sync {
    /// Persists a snapshot, replacing any previous one
    async fn save(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()>;

    /// Loads the most recent snapshot, or `None` if none exists
    async fn load(&self) -> anyhow::Result<Option<QueueSnapshot>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Collection, OperationKind};
    use serde_json::json;

    #[test]
    fn test_snapshot_roundtrip() {
        let ops = vec![QueuedOperation::new(
            OperationKind::Create,
            Collection::Quizzes,
            json!({"title": "New quiz"}),
            3,
        )];
        let snapshot = QueueSnapshot::new(7, ops);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: QueueSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back.revision, 7);
        assert_eq!(back.operations.len(), 1);
        assert_eq!(back.operations[0].id(), snapshot.operations[0].id());
    }

    #[test]
    fn test_snapshot_is_plain_json_array_of_descriptions() {
        let snapshot = QueueSnapshot::new(1, Vec::new());
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value["operations"].is_array());
    }
}
