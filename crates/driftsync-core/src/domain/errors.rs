//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid status transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid document identifier
    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    /// Invalid user identifier
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid resolution strategy name
    #[error("Invalid resolution strategy: {0}")]
    InvalidStrategy(String),

    /// Invalid operation status transition attempt
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatus {
        /// The current status
        from: String,
        /// The attempted target status
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
