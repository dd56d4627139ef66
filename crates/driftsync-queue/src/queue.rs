//! The durable offline operation queue
//!
//! ## Drain pass
//!
//! ```text
//!  enqueue ──► [ pending, pending, ... ]          (FIFO, capacity-bounded)
//!                   │
//!             process_queue()                     (one pass at a time)
//!                   │
//!          ┌── mark processing, invoke action ──┐
//!          │                                     │
//!       success                               failure
//!          │                                     │
//!      completed                    attempts < max_retries?
//!      + persist                     yes: retry immediately
//!                                    no: failed + persist, next item
//! ```
//!
//! One operation's permanent failure never aborts the pass. The pass ends
//! when no runnable operations remain or connectivity is lost.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use driftsync_core::config::QueueConfig;
use driftsync_core::domain::{
    Collection, OperationId, OperationKind, OperationStatus, QueueState, QueuedOperation,
};
use driftsync_core::ports::{IConnectivityMonitor, IQueueStore, QueueSnapshot};

use crate::error::QueueError;
use crate::handlers::{HandlerRegistry, OperationAction, OperationFuture};

// ============================================================================
// QueueOptions
// ============================================================================

/// Tuning options for the offline queue
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Maximum operations held, completed items included until cleared
    pub capacity: usize,
    /// Attempt budget for operations that don't specify their own
    pub default_max_retries: u32,
    /// Whether a successful enqueue while online signals the runtime to
    /// schedule a drain
    pub auto_drain: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            capacity: 100,
            default_max_retries: 3,
            auto_drain: true,
        }
    }
}

impl From<&QueueConfig> for QueueOptions {
    fn from(config: &QueueConfig) -> Self {
        Self {
            capacity: config.max_queue_size,
            default_max_retries: config.max_retries,
            auto_drain: config.auto_drain,
        }
    }
}

// ============================================================================
// NewOperation
// ============================================================================

/// Input to [`OfflineQueue::enqueue`]
///
/// Carries the durable description plus, optionally, an inline executable
/// action. The action is the only non-durable part: it is held in memory
/// and dropped from the persisted snapshot. Operations without an inline
/// action are executed through the [`HandlerRegistry`].
pub struct NewOperation {
    kind: OperationKind,
    collection: Collection,
    data: Value,
    action: Option<OperationAction>,
    max_retries: Option<u32>,
}

impl NewOperation {
    /// Describes a mutation of the given kind against a collection
    pub fn new(kind: OperationKind, collection: Collection, data: Value) -> Self {
        Self {
            kind,
            collection,
            data,
            action: None,
            max_retries: None,
        }
    }

    /// Convenience constructor for a create mutation
    pub fn create(collection: Collection, data: Value) -> Self {
        Self::new(OperationKind::Create, collection, data)
    }

    /// Convenience constructor for an update mutation
    pub fn update(collection: Collection, data: Value) -> Self {
        Self::new(OperationKind::Update, collection, data)
    }

    /// Convenience constructor for a delete mutation
    pub fn delete(collection: Collection, data: Value) -> Self {
        Self::new(OperationKind::Delete, collection, data)
    }

    /// Attaches an inline executable action
    ///
    /// Takes precedence over any registered handler for this operation.
    pub fn with_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: OperationAction = Arc::new(move |data| -> OperationFuture {
            Box::pin(action(data))
        });
        self.action = Some(action);
        self
    }

    /// Overrides the queue-wide attempt budget for this operation
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

// ============================================================================
// DrainSummary
// ============================================================================

/// Summary of a completed drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Operations that reached `completed` during this pass
    pub completed: u32,
    /// Operations that reached terminal `failed` during this pass
    pub failed: u32,
    /// Whether the pass ended early because connectivity was lost
    pub went_offline: bool,
}

// ============================================================================
// OfflineQueue
// ============================================================================

/// Outcome of recording a failed attempt
enum AttemptOutcome {
    /// Retry budget remains; try again within this pass
    Retry,
    /// Retries exhausted; the operation is terminally failed
    Exhausted,
    /// The operation was removed while its action was in flight
    Removed,
}

struct QueueInner {
    operations: Vec<QueuedOperation>,
    actions: HashMap<OperationId, OperationAction>,
    revision: u64,
}

/// Durable, capacity-bounded, FIFO operation buffer with bounded retry
///
/// The backing store is treated as single-writer: one queue instance per
/// storage key is the supported configuration.
pub struct OfflineQueue {
    inner: Mutex<QueueInner>,
    /// Pass-in-progress guard; see [`OfflineQueue::process_queue`]
    pass_lock: Mutex<()>,
    store: Arc<dyn IQueueStore>,
    connectivity: Arc<dyn IConnectivityMonitor>,
    handlers: Arc<HandlerRegistry>,
    options: QueueOptions,
    drain_signal: Notify,
}

impl OfflineQueue {
    /// Creates a queue, restoring any persisted snapshot
    ///
    /// Operations persisted as `processing` were interrupted mid-flight by
    /// a crash or shutdown and are reset to `pending`. Executable actions
    /// are re-bound lazily from the handler registry at processing time.
    ///
    /// # Errors
    /// Fails if the store holds a snapshot that cannot be read — a corrupt
    /// store must be surfaced, not silently discarded.
    pub async fn new(
        store: Arc<dyn IQueueStore>,
        connectivity: Arc<dyn IConnectivityMonitor>,
        handlers: Arc<HandlerRegistry>,
        options: QueueOptions,
    ) -> anyhow::Result<Self> {
        let snapshot = store.load().await.context("load queue snapshot")?;

        let (mut operations, revision) = match snapshot {
            Some(snap) => (snap.operations, snap.revision),
            None => (Vec::new(), 0),
        };

        let mut interrupted = 0;
        for op in &mut operations {
            if op.status() == OperationStatus::Processing {
                op.reset_interrupted();
                interrupted += 1;
            }
        }

        let unbound = operations
            .iter()
            .filter(|op| {
                op.is_runnable() && handlers.resolve(op.collection(), op.kind()).is_none()
            })
            .count();

        if !operations.is_empty() {
            info!(
                operations = operations.len(),
                interrupted,
                revision,
                "Restored offline queue from snapshot"
            );
        }
        if unbound > 0 {
            warn!(
                unbound,
                "Restored operations have no registered handler; they will fail at processing unless one is registered"
            );
        }

        Ok(Self {
            inner: Mutex::new(QueueInner {
                operations,
                actions: HashMap::new(),
                revision,
            }),
            pass_lock: Mutex::new(()),
            store,
            connectivity,
            handlers,
            options,
            drain_signal: Notify::new(),
        })
    }

    /// Returns the connectivity monitor the queue observes
    pub fn connectivity(&self) -> &Arc<dyn IConnectivityMonitor> {
        &self.connectivity
    }

    /// Resolves when the queue requests an automatic drain
    pub(crate) async fn drain_requested(&self) {
        self.drain_signal.notified().await;
    }

    // ========================================================================
    // Enqueue
    // ========================================================================

    /// Appends a pending operation, persists, and (when automatic draining
    /// is enabled and the monitor reports online) signals the runtime to
    /// schedule a drain
    ///
    /// # Errors
    /// [`QueueError::QueueFull`] when the queue is at capacity. Completed
    /// operations count toward capacity until explicitly cleared.
    pub async fn enqueue(&self, new_op: NewOperation) -> Result<OperationId, QueueError> {
        let id = {
            let mut inner = self.inner.lock().await;

            if inner.operations.len() >= self.options.capacity {
                warn!(
                    size = inner.operations.len(),
                    capacity = self.options.capacity,
                    "Rejecting enqueue: queue is full"
                );
                return Err(QueueError::QueueFull {
                    size: inner.operations.len(),
                    capacity: self.options.capacity,
                });
            }

            let max_retries = new_op
                .max_retries
                .unwrap_or(self.options.default_max_retries);
            let op = QueuedOperation::new(new_op.kind, new_op.collection, new_op.data, max_retries);
            let id = op.id();

            debug!(
                operation = %id,
                kind = %op.kind(),
                collection = %op.collection(),
                "Enqueued operation"
            );

            if let Some(action) = new_op.action {
                inner.actions.insert(id, action);
            }
            inner.operations.push(op);
            self.persist(&mut inner).await;
            id
        };

        if self.options.auto_drain && self.connectivity.is_online() {
            self.drain_signal.notify_one();
        }

        Ok(id)
    }

    // ========================================================================
    // Drain pass
    // ========================================================================

    /// Runs a single logical drain pass
    ///
    /// Re-entrant calls while a pass is already running do not start a
    /// second pass: the late caller awaits the in-flight pass's completion
    /// and returns an empty summary. Within a pass, runnable operations
    /// are processed strictly in enqueue order; a later-enqueued operation
    /// never overtakes an earlier pending one, and each action is invoked
    /// at most once per attempt.
    pub async fn process_queue(&self) -> DrainSummary {
        let _pass = match self.pass_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Drain pass already in progress; awaiting its completion");
                let _observed = self.pass_lock.lock().await;
                return DrainSummary::default();
            }
        };

        let mut summary = DrainSummary::default();
        // Operations this pass has already given up on (no bound action);
        // without this the FIFO scan would re-claim them immediately.
        let mut skipped: HashSet<OperationId> = HashSet::new();

        debug!("Starting drain pass");

        'pass: loop {
            if !self.connectivity.is_online() {
                debug!("Queue is offline; ending drain pass");
                summary.went_offline = true;
                break;
            }

            let claimed = self.claim_next(&skipped).await;
            let Some((id, collection, kind, data, action)) = claimed else {
                break;
            };

            let Some(action) = action else {
                let reason = format!("no handler registered for {collection}/{kind}");
                warn!(
                    operation = %id,
                    collection = %collection,
                    kind = %kind,
                    "No executable action bound; marking operation failed"
                );
                self.begin_attempt(id).await;
                self.note_failure(id, &reason, true).await;
                summary.failed += 1;
                skipped.insert(id);
                continue;
            };

            loop {
                if !self.begin_attempt(id).await {
                    // Removed while claimed; nothing left to run.
                    break;
                }
                debug!(operation = %id, "Invoking operation action");
                match action(data.clone()).await {
                    Ok(()) => {
                        if self.note_success(id).await {
                            summary.completed += 1;
                        }
                        break;
                    }
                    Err(err) => {
                        let error_text = format!("{err:#}");
                        warn!(
                            operation = %id,
                            error = %error_text,
                            offline = crate::error::is_offline_error(&err),
                            "Operation attempt failed"
                        );
                        match self.note_failure(id, &error_text, false).await {
                            AttemptOutcome::Retry => {
                                if !self.connectivity.is_online() {
                                    // Park the operation for the next pass
                                    // instead of burning retries offline.
                                    self.park(id).await;
                                    summary.went_offline = true;
                                    break 'pass;
                                }
                                // Retry the same operation immediately
                                // within this pass.
                            }
                            AttemptOutcome::Exhausted => {
                                summary.failed += 1;
                                break;
                            }
                            AttemptOutcome::Removed => break,
                        }
                    }
                }
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            went_offline = summary.went_offline,
            "Drain pass completed"
        );

        summary
    }

    /// Claims the first runnable operation: marks it processing, persists,
    /// and resolves its executable action
    async fn claim_next(
        &self,
        skipped: &HashSet<OperationId>,
    ) -> Option<(OperationId, Collection, OperationKind, Value, Option<OperationAction>)> {
        let mut inner = self.inner.lock().await;

        let pos = inner
            .operations
            .iter()
            .position(|op| op.is_runnable() && !skipped.contains(&op.id()))?;

        let (id, collection, kind, data) = {
            let op = &mut inner.operations[pos];
            if let Err(err) = op.mark_processing() {
                error!(operation = %op.id(), error = %err, "Failed to claim runnable operation");
                return None;
            }
            (
                op.id(),
                op.collection().clone(),
                op.kind(),
                op.data().clone(),
            )
        };

        let action = inner
            .actions
            .get(&id)
            .cloned()
            .or_else(|| self.handlers.resolve(&collection, kind));

        self.persist(&mut inner).await;

        Some((id, collection, kind, data, action))
    }

    /// Counts an invocation against the operation's attempt budget;
    /// returns false if the operation was removed while claimed
    async fn begin_attempt(&self, id: OperationId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.operations.iter().position(|op| op.id() == id) else {
            warn!(operation = %id, "Operation removed while claimed for processing");
            return false;
        };
        inner.operations[pos].record_attempt();
        true
    }

    /// Marks an operation completed; returns false if it was removed
    /// while its action was in flight
    async fn note_success(&self, id: OperationId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.operations.iter().position(|op| op.id() == id) else {
            warn!(operation = %id, "Operation removed while its action was in flight");
            return false;
        };
        {
            let op = &mut inner.operations[pos];
            if let Err(err) = op.mark_completed() {
                error!(operation = %id, error = %err, "Failed to mark operation completed");
                return false;
            }
        }
        debug!(operation = %id, "Operation completed");
        self.persist(&mut inner).await;
        true
    }

    /// Records a failed attempt; `terminal` forces the failed status
    /// regardless of remaining retries (used for unbound operations)
    async fn note_failure(&self, id: OperationId, error_text: &str, terminal: bool) -> AttemptOutcome {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.operations.iter().position(|op| op.id() == id) else {
            warn!(operation = %id, "Operation removed while its action was in flight");
            return AttemptOutcome::Removed;
        };

        let exhausted = {
            let op = &mut inner.operations[pos];
            op.record_failure(error_text);
            if terminal || !op.has_retries_left() {
                if let Err(err) = op.mark_failed() {
                    error!(operation = %id, error = %err, "Failed to mark operation failed");
                }
                true
            } else {
                false
            }
        };

        if exhausted {
            self.persist(&mut inner).await;
            AttemptOutcome::Exhausted
        } else {
            AttemptOutcome::Retry
        }
    }

    /// Resets an in-flight operation back to pending (connectivity lost
    /// mid-pass); it will be retried by a later pass
    async fn park(&self, id: OperationId) {
        let mut inner = self.inner.lock().await;
        if let Some(pos) = inner.operations.iter().position(|op| op.id() == id) {
            inner.operations[pos].reset_interrupted();
            self.persist(&mut inner).await;
            debug!(operation = %id, "Operation parked until connectivity returns");
        }
    }

    // ========================================================================
    // Inspection & maintenance
    // ========================================================================

    /// Returns the derived status counts
    pub async fn state(&self) -> QueueState {
        let inner = self.inner.lock().await;
        QueueState::from_operations(&inner.operations)
    }

    /// Returns a snapshot of the operation with the given ID
    pub async fn operation(&self, id: OperationId) -> Option<QueuedOperation> {
        let inner = self.inner.lock().await;
        inner.operations.iter().find(|op| op.id() == id).cloned()
    }

    /// Removes an operation regardless of status
    pub async fn remove_operation(&self, id: OperationId) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let Some(pos) = inner.operations.iter().position(|op| op.id() == id) else {
            return Err(QueueError::NotFound(id));
        };
        inner.operations.remove(pos);
        inner.actions.remove(&id);
        self.persist(&mut inner).await;
        debug!(operation = %id, "Operation removed");
        Ok(())
    }

    /// Drops all completed operations, freeing capacity
    pub async fn clear_completed(&self) {
        let mut inner = self.inner.lock().await;
        let removed: Vec<OperationId> = inner
            .operations
            .iter()
            .filter(|op| op.status() == OperationStatus::Completed)
            .map(|op| op.id())
            .collect();
        if removed.is_empty() {
            return;
        }
        inner
            .operations
            .retain(|op| op.status() != OperationStatus::Completed);
        for id in &removed {
            inner.actions.remove(id);
        }
        self.persist(&mut inner).await;
        debug!(cleared = removed.len(), "Cleared completed operations");
    }

    /// Drops every operation, regardless of status
    pub async fn clear_queue(&self) {
        let mut inner = self.inner.lock().await;
        let cleared = inner.operations.len();
        inner.operations.clear();
        inner.actions.clear();
        self.persist(&mut inner).await;
        info!(cleared, "Cleared offline queue");
    }

    /// Returns true while work remains to be applied remotely
    /// (`pending` or `processing` operations exist)
    pub async fn has_pending_operations(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.operations.iter().any(|op| {
            matches!(
                op.status(),
                OperationStatus::Pending | OperationStatus::Processing
            )
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Flushes the current state to the store, best-effort
    ///
    /// A persistence failure is logged; the in-memory queue remains
    /// authoritative for the current process.
    async fn persist(&self, inner: &mut QueueInner) {
        inner.revision += 1;
        let snapshot = QueueSnapshot::new(inner.revision, inner.operations.clone());
        if let Err(err) = self.store.save(&snapshot).await {
            warn!(
                revision = snapshot.revision,
                error = %format!("{err:#}"),
                "Failed to persist queue snapshot; in-memory state remains authoritative"
            );
        }
    }
}
