//! Error types for the conflict engine

use thiserror::Error;

/// Errors that can occur while building conflict policies
///
/// Resolution itself never errors: an unresolvable conflict is a typed
/// result (`requires_user_input == true`), not an exception.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A configured per-type policy is invalid
    #[error("invalid conflict policy for '{document_type}': {reason}")]
    InvalidPolicy {
        document_type: String,
        reason: String,
    },
}
