//! DriftSync Store - Queue snapshot persistence
//!
//! Driven adapters implementing the `IQueueStore` port from
//! `driftsync-core`:
//!
//! - [`JsonFileQueueStore`] - a single JSON file with atomic replace and
//!   optimistic revision checking
//! - [`MemoryQueueStore`] - in-memory storage for tests and embedding
//!   hosts that manage durability themselves
//!
//! ## Single-writer contract
//!
//! One queue instance per storage key is the supported configuration.
//! The file store enforces this best-effort: every snapshot carries a
//! monotonic revision, and a `save` that would overwrite a revision this
//! store did not write fails with [`StoreError::RevisionConflict`] rather
//! than silently clobbering a foreign writer.

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileQueueStore;
pub use memory::MemoryQueueStore;

/// Errors that can occur during snapshot storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The on-disk snapshot was written by someone else
    #[error("snapshot revision conflict: expected {expected}, found {found} (foreign writer on the same storage key?)")]
    RevisionConflict { expected: u64, found: u64 },

    /// A snapshot exists on disk but this store never wrote or loaded one
    #[error("snapshot revision {found} found on disk but this store never wrote or loaded one")]
    ForeignSnapshot { found: u64 },
}
