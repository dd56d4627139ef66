//! Error types for the offline queue

use driftsync_core::domain::OperationId;
use thiserror::Error;

/// Errors surfaced by queue operations
///
/// Per-operation action failures are never surfaced as errors: they are
/// caught inside the drain pass, retried, and recorded on the operation's
/// status and `last_error`.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has reached its configured capacity
    ///
    /// Completed operations count toward capacity until explicitly
    /// cleared. The caller must catch this and either drop, coalesce, or
    /// surface the failure to the user.
    #[error("queue is full ({size}/{capacity})")]
    QueueFull { size: usize, capacity: usize },

    /// No operation with the given ID exists in the queue
    #[error("operation not found: {0}")]
    NotFound(OperationId),
}

/// Determines whether an error looks like a connectivity failure
///
/// A heuristic on error message content, used by host code to decide
/// whether to keep retrying versus surface a hard error to the user.
/// Connectivity failures include network errors, timeouts, DNS failures,
/// and explicit offline markers; anything else (validation, permission,
/// not-found) is treated as a logical failure.
pub fn is_offline_error(err: &anyhow::Error) -> bool {
    let err_str = format!("{err:#}").to_lowercase();

    err_str.contains("offline")
        || err_str.contains("network")
        || err_str.contains("connection")
        || err_str.contains("timeout")
        || err_str.contains("timed out")
        || err_str.contains("dns")
        || err_str.contains("unreachable")
        || err_str.contains("reset by peer")
        || err_str.contains("broken pipe")
        || err_str.contains("failed to fetch")
}
