//! Port definitions (trait interfaces for adapters)
//!
//! Ports are the seams of the hexagonal architecture: the queue engine
//! depends on these traits, and adapter crates provide implementations
//! (JSON file storage, platform connectivity monitors).

pub mod connectivity;
pub mod queue_store;

pub use connectivity::{IConnectivityMonitor, SharedConnectivity};
pub use queue_store::{IQueueStore, QueueSnapshot};
