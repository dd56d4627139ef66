//! Handler registry - re-binds executable actions to durable operations
//!
//! A queued operation's async action is a closure and cannot be
//! persisted. The durable description (`kind`, `collection`, `data`)
//! survives restarts; the executable binding is re-attached from this
//! dispatch table, keyed by collection and operation kind.
//!
//! Hosts register one handler per `(collection, kind)` pair at startup,
//! before constructing the queue. An inline action supplied at enqueue
//! time takes precedence over the registered handler for that operation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use driftsync_core::domain::{Collection, OperationKind};

/// The future returned by an operation action
pub type OperationFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// An executable operation action: consumes the operation's payload and
/// performs the real remote mutation
pub type OperationAction = Arc<dyn Fn(Value) -> OperationFuture + Send + Sync>;

/// Dispatch table mapping `(collection, kind)` to an executable action
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<(Collection, OperationKind), OperationAction>,
}

impl HandlerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a `(collection, kind)` pair, replacing
    /// any previous one
    pub fn register<F, Fut>(&self, collection: Collection, kind: OperationKind, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: OperationAction = Arc::new(move |data| Box::pin(handler(data)));
        self.handlers.insert((collection, kind), action);
    }

    /// Looks up the handler for a `(collection, kind)` pair
    pub fn resolve(&self, collection: &Collection, kind: OperationKind) -> Option<OperationAction> {
        self.handlers
            .get(&(collection.clone(), kind))
            .map(|entry| entry.value().clone())
    }

    /// Returns the number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
