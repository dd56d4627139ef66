//! Queue runtime - connectivity-aware drain driver
//!
//! Sits between the connectivity monitor and the [`OfflineQueue`]. In
//! automatic mode it owns a driver task that drains the queue when
//! connectivity returns and when the queue signals a post-enqueue drain
//! request. In manual mode it is inert, so tests and embedding hosts can
//! single-step processing with explicit `process_queue` calls.
//!
//! ## Flow
//!
//! ```text
//! connectivity watch ──┐
//!                      ├──► driver task ──► queue.process_queue()
//! enqueue signal ──────┘
//! ```
//!
//! Shutdown is cooperative: [`destroy`](QueueRuntime::destroy) stops
//! scheduling new passes but never cancels a pass already in flight.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::queue::OfflineQueue;

/// Execution mode of the queue runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Production: connectivity transitions and enqueues trigger drains
    Automatic,
    /// Deterministic: no listeners, only explicit `process_queue` calls
    Manual,
}

/// Connectivity-aware driver for the offline queue
pub struct QueueRuntime {
    queue: Arc<OfflineQueue>,
    mode: RuntimeMode,
    shutdown: CancellationToken,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl QueueRuntime {
    /// Starts the runtime
    ///
    /// In [`RuntimeMode::Automatic`] a driver task is spawned immediately;
    /// it performs an initial drain if the queue is online with pending
    /// work, then reacts to connectivity transitions and drain requests.
    /// In [`RuntimeMode::Manual`] no task is spawned.
    pub fn start(queue: Arc<OfflineQueue>, mode: RuntimeMode) -> Self {
        let shutdown = CancellationToken::new();

        let driver = match mode {
            RuntimeMode::Manual => {
                info!("Queue runtime in manual mode; automatic draining disabled");
                None
            }
            RuntimeMode::Automatic => {
                let task = tokio::spawn(drive(queue.clone(), shutdown.clone()));
                Some(task)
            }
        };

        Self {
            queue,
            mode,
            shutdown,
            driver: std::sync::Mutex::new(driver),
        }
    }

    /// Returns the runtime's execution mode
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Returns the queue this runtime drives
    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    /// Detaches connectivity listeners and halts future automatic drains
    ///
    /// Does not cancel an operation already mid-flight: the driver
    /// finishes its current pass before observing the shutdown token.
    pub fn destroy(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Destroying queue runtime");
            self.shutdown.cancel();
        }
    }

    /// Destroys the runtime and waits for the driver task to finish
    pub async fn destroy_and_wait(self) {
        self.destroy();
        let task = match self.driver.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for QueueRuntime {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Driver loop: drains on connectivity restoration and drain requests
async fn drive(queue: Arc<OfflineQueue>, shutdown: CancellationToken) {
    info!("Queue runtime starting");

    let mut connectivity_rx = queue.connectivity().subscribe();

    // Initial drain: work may have been restored from a snapshot while
    // connectivity is already up.
    if queue.connectivity().is_online() && queue.has_pending_operations().await {
        debug!("Initial drain of restored queue");
        queue.process_queue().await;
    }

    loop {
        let should_drain = tokio::select! {
            _ = shutdown.cancelled() => break,

            changed = connectivity_rx.changed() => {
                match changed {
                    Ok(()) => {
                        let online = *connectivity_rx.borrow_and_update();
                        if online {
                            info!("Connectivity restored; draining offline queue");
                        } else {
                            debug!("Connectivity lost");
                        }
                        online
                    }
                    // Monitor dropped; no further transitions will arrive.
                    Err(_) => break,
                }
            }

            _ = queue.drain_requested() => true,
        };

        if should_drain && queue.connectivity().is_online() {
            // Never raced against the shutdown token: a pass in flight
            // always runs to completion.
            queue.process_queue().await;
        }
    }

    info!("Queue runtime stopped");
}
