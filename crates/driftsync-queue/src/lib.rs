//! DriftSync Queue - Durable offline operation queue
//!
//! Buffers mutating operations generated while disconnected (or while a
//! write is in flight), replays them exactly once per success, retries
//! transient failures a bounded number of times, and survives process
//! restarts.
//!
//! ## Key Components
//!
//! - [`OfflineQueue`] - capacity-bounded, FIFO, persisted operation buffer
//! - [`HandlerRegistry`] - dispatch table re-binding executable actions to
//!   reloaded operations by collection and kind
//! - [`QueueRuntime`] - connectivity-aware driver that triggers draining
//!   automatically in production and is inert in deterministic execution
//! - [`is_offline_error`] - heuristic separating connectivity failures
//!   from logical failures
//!
//! ## Concurrency model
//!
//! Single logical writer, cooperative scheduling. Operations execute
//! strictly in enqueue order within a drain pass; overlapping
//! `process_queue` calls are serialized by a pass-in-progress guard, so an
//! operation's action runs at most once per pass.

pub mod error;
pub mod handlers;
pub mod queue;
pub mod runtime;

pub use error::{is_offline_error, QueueError};
pub use handlers::{HandlerRegistry, OperationAction};
pub use queue::{DrainSummary, NewOperation, OfflineQueue, QueueOptions};
pub use runtime::{QueueRuntime, RuntimeMode};
