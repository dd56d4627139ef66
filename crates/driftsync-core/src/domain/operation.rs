//! Queued operation domain entity
//!
//! This module defines the durable description of a buffered mutation and
//! its status lifecycle:
//!
//! ```text
//!     ┌─────────┐   drain    ┌────────────┐   success   ┌───────────┐
//!     │ Pending │ ─────────► │ Processing │ ──────────► │ Completed │
//!     └─────────┘            └────────────┘             └───────────┘
//!          ▲                       │
//!          │ reload after crash    │ retries exhausted
//!          │                       ▼
//!          │                 ┌───────────┐
//!          └──────────────── │  Failed   │
//!            (retries left)  └───────────┘
//! ```
//!
//! The executable async action that performs the mutation is deliberately
//! NOT part of this entity: only the durable description (`kind`,
//! `collection`, `data`) is persisted, and the executable binding is held
//! separately by the queue and re-attached by collection/kind on reload.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::OperationId;

// ============================================================================
// OperationKind
// ============================================================================

/// The kind of mutation a queued operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Create a new document
    Create,
    /// Update an existing document
    Update,
    /// Delete a document
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OperationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(OperationKind::Create),
            "update" => Ok(OperationKind::Update),
            "delete" => Ok(OperationKind::Delete),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown operation kind: {other}"
            ))),
        }
    }
}

// ============================================================================
// Collection
// ============================================================================

/// Target resource category of a queued operation
///
/// Known collections are enumerated explicitly; anything else falls
/// through the `Other` arm so hosts can extend without forking the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Collection {
    /// Quiz documents
    Quizzes,
    /// Per-user progress records
    Progress,
    /// Question documents
    Questions,
    /// Any unregistered collection
    Other(String),
}

impl Collection {
    /// Returns the wire tag for this collection
    pub fn as_str(&self) -> &str {
        match self {
            Collection::Quizzes => "quizzes",
            Collection::Progress => "progress",
            Collection::Questions => "questions",
            Collection::Other(tag) => tag,
        }
    }
}

impl From<String> for Collection {
    fn from(s: String) -> Self {
        match s.as_str() {
            "quizzes" => Collection::Quizzes,
            "progress" => Collection::Progress,
            "questions" => Collection::Questions,
            _ => Collection::Other(s),
        }
    }
}

impl From<&str> for Collection {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Collection> for String {
    fn from(c: Collection) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// OperationStatus
// ============================================================================

/// Lifecycle status of a queued operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Waiting to be processed
    #[default]
    Pending,
    /// Its action is currently running
    Processing,
    /// The action succeeded; removable via `clear_completed`
    Completed,
    /// Retries exhausted; remains until explicitly removed or cleared
    Failed,
}

impl OperationStatus {
    /// Returns true for statuses that will not be retried automatically
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Processing => "processing",
            OperationStatus::Completed => "completed",
            OperationStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// QueuedOperation
// ============================================================================

/// The durable description of a buffered mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Unique identifier, assigned at enqueue
    id: OperationId,
    /// What kind of mutation this is
    kind: OperationKind,
    /// Which resource category it targets
    collection: Collection,
    /// Serializable payload describing the intended mutation
    data: serde_json::Value,
    /// Current lifecycle status
    status: OperationStatus,
    /// How many times the action has been attempted
    attempts: u32,
    /// Attempt budget before the operation becomes terminally failed
    max_retries: u32,
    /// When the operation was enqueued
    created_at: DateTime<Utc>,
    /// When the operation last changed
    updated_at: DateTime<Utc>,
    /// Message from the most recent failed attempt
    #[serde(skip_serializing_if = "Option::is_none", default)]
    last_error: Option<String>,
}

impl QueuedOperation {
    /// Creates a new pending operation
    pub fn new(
        kind: OperationKind,
        collection: Collection,
        data: serde_json::Value,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OperationId::new(),
            kind,
            collection,
            data,
            status: OperationStatus::Pending,
            attempts: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            last_error: None,
        }
    }

    /// Returns the operation ID
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Returns the operation kind
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the target collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Returns the mutation payload
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Returns the current status
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Returns the number of attempts made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the attempt budget
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns when the operation was enqueued
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the operation last changed
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the message from the most recent failed attempt
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a drain pass should pick this operation up
    ///
    /// Pending operations are always runnable; failed operations are
    /// runnable again only while attempts remain.
    pub fn is_runnable(&self) -> bool {
        match self.status {
            OperationStatus::Pending => true,
            OperationStatus::Failed => self.attempts < self.max_retries,
            OperationStatus::Processing | OperationStatus::Completed => false,
        }
    }

    /// Whether the attempt budget has room for another try
    pub fn has_retries_left(&self) -> bool {
        self.attempts < self.max_retries
    }

    /// Transition to `Processing` at the start of an attempt
    pub fn mark_processing(&mut self) -> Result<(), DomainError> {
        if !self.is_runnable() {
            return Err(self.invalid_transition(OperationStatus::Processing));
        }
        self.status = OperationStatus::Processing;
        self.touch();
        Ok(())
    }

    /// Transition to `Completed` after a successful attempt
    pub fn mark_completed(&mut self) -> Result<(), DomainError> {
        if self.status != OperationStatus::Processing {
            return Err(self.invalid_transition(OperationStatus::Completed));
        }
        self.status = OperationStatus::Completed;
        self.last_error = None;
        self.touch();
        Ok(())
    }

    /// Counts an invocation of the action against the attempt budget
    ///
    /// Called once per invocation, including immediate retries within a
    /// drain pass.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
        self.touch();
    }

    /// Stores the error from a failed attempt
    ///
    /// The status stays `Processing`; the caller decides whether to retry
    /// immediately or mark the operation terminally failed.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.touch();
    }

    /// Transition to terminal `Failed` once retries are exhausted
    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        if self.status != OperationStatus::Processing {
            return Err(self.invalid_transition(OperationStatus::Failed));
        }
        self.status = OperationStatus::Failed;
        self.touch();
        Ok(())
    }

    /// Resets an operation interrupted mid-flight back to `Pending`
    ///
    /// Used on reload: an operation persisted as `Processing` was cut off
    /// by a crash or shutdown and must be retried from scratch.
    pub fn reset_interrupted(&mut self) {
        if self.status == OperationStatus::Processing {
            self.status = OperationStatus::Pending;
            self.touch();
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn invalid_transition(&self, to: OperationStatus) -> DomainError {
        DomainError::InvalidStatus {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

// ============================================================================
// QueueState
// ============================================================================

/// Derived, read-only status counts over the queue
///
/// `total == pending + processing + completed + failed` holds by
/// construction: the counts are computed from a single snapshot of the
/// operation list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    /// Number of operations in the queue, regardless of status
    pub total: usize,
    /// Operations waiting to be processed
    pub pending: usize,
    /// Operations whose action is currently running
    pub processing: usize,
    /// Operations that succeeded and await clearing
    pub completed: usize,
    /// Operations that exhausted their retries
    pub failed: usize,
}

impl QueueState {
    /// Computes the counts from an operation list
    pub fn from_operations(operations: &[QueuedOperation]) -> Self {
        let mut state = Self {
            total: operations.len(),
            ..Self::default()
        };
        for op in operations {
            match op.status() {
                OperationStatus::Pending => state.pending += 1,
                OperationStatus::Processing => state.processing += 1,
                OperationStatus::Completed => state.completed += 1,
                OperationStatus::Failed => state.failed += 1,
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_op(max_retries: u32) -> QueuedOperation {
        QueuedOperation::new(
            OperationKind::Update,
            Collection::Quizzes,
            json!({"id": "q1", "title": "New"}),
            max_retries,
        )
    }

    #[test]
    fn test_new_operation_is_pending() {
        let op = make_op(3);
        assert_eq!(op.status(), OperationStatus::Pending);
        assert_eq!(op.attempts(), 0);
        assert!(op.is_runnable());
        assert!(op.last_error().is_none());
    }

    #[test]
    fn test_success_lifecycle() {
        let mut op = make_op(3);
        op.mark_processing().unwrap();
        assert_eq!(op.status(), OperationStatus::Processing);
        assert!(!op.is_runnable());

        op.mark_completed().unwrap();
        assert_eq!(op.status(), OperationStatus::Completed);
        assert!(op.status().is_terminal());
    }

    #[test]
    fn test_failure_lifecycle() {
        let mut op = make_op(2);
        op.mark_processing().unwrap();
        op.record_attempt();
        op.record_failure("network down");
        assert_eq!(op.attempts(), 1);
        assert!(op.has_retries_left());

        op.record_attempt();
        op.record_failure("network still down");
        assert_eq!(op.attempts(), 2);
        assert!(!op.has_retries_left());

        op.mark_failed().unwrap();
        assert_eq!(op.status(), OperationStatus::Failed);
        assert_eq!(op.last_error(), Some("network still down"));
        assert!(!op.is_runnable());
    }

    #[test]
    fn test_failed_with_retries_left_is_runnable() {
        let mut op = make_op(3);
        op.mark_processing().unwrap();
        op.record_attempt();
        op.record_failure("transient");
        op.mark_failed().unwrap();

        // One attempt spent out of three: still runnable
        assert!(op.is_runnable());
        assert!(op.mark_processing().is_ok());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut op = make_op(3);
        assert!(matches!(
            op.mark_completed(),
            Err(DomainError::InvalidStatus { .. })
        ));

        op.mark_processing().unwrap();
        op.mark_completed().unwrap();
        assert!(op.mark_processing().is_err());
        assert!(op.mark_failed().is_err());
    }

    #[test]
    fn test_reset_interrupted() {
        let mut op = make_op(3);
        op.mark_processing().unwrap();
        op.reset_interrupted();
        assert_eq!(op.status(), OperationStatus::Pending);

        // No-op on anything but Processing
        op.mark_processing().unwrap();
        op.mark_completed().unwrap();
        op.reset_interrupted();
        assert_eq!(op.status(), OperationStatus::Completed);
    }

    #[test]
    fn test_collection_roundtrip() {
        for tag in ["quizzes", "progress", "questions", "badges"] {
            let c = Collection::from(tag);
            assert_eq!(c.as_str(), tag);
        }
        assert_eq!(Collection::from("quizzes"), Collection::Quizzes);
        assert_eq!(
            Collection::from("badges"),
            Collection::Other("badges".to_string())
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("create".parse::<OperationKind>().unwrap(), OperationKind::Create);
        assert_eq!("update".parse::<OperationKind>().unwrap(), OperationKind::Update);
        assert_eq!("delete".parse::<OperationKind>().unwrap(), OperationKind::Delete);
        assert!("upsert".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_queue_state_accounting() {
        let mut ops = vec![make_op(3), make_op(3), make_op(3), make_op(3)];
        ops[1].mark_processing().unwrap();
        ops[2].mark_processing().unwrap();
        ops[2].mark_completed().unwrap();
        ops[3].mark_processing().unwrap();
        ops[3].record_attempt();
        ops[3].record_failure("boom");
        ops[3].mark_failed().unwrap();

        let state = QueueState::from_operations(&ops);
        assert_eq!(state.total, 4);
        assert_eq!(state.pending, 1);
        assert_eq!(state.processing, 1);
        assert_eq!(state.completed, 1);
        assert_eq!(state.failed, 1);
        assert_eq!(
            state.total,
            state.pending + state.processing + state.completed + state.failed
        );
    }

    #[test]
    fn test_serialization_omits_nothing_durable() {
        let mut op = make_op(3);
        op.mark_processing().unwrap();
        op.record_attempt();
        op.record_failure("offline");

        let json = serde_json::to_string(&op).unwrap();
        let back: QueuedOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), op.id());
        assert_eq!(back.attempts(), 1);
        assert_eq!(back.last_error(), Some("offline"));
        assert_eq!(back.status(), OperationStatus::Processing);
    }
}
