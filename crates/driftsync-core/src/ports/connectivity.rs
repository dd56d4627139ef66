//! Connectivity port
//!
//! The queue runtime gates automatic draining on an online/offline signal.
//! The signal source is platform-specific (a browser's online events, a
//! netlink watcher, a health-check loop), so it is modeled as a port: the
//! runtime subscribes to transitions and reads the current state, nothing
//! more.

use tokio::sync::watch;

/// Port trait for observing connectivity
///
/// Implementations must be cheap to query: `is_online` is called at the
/// top of every drain iteration.
pub trait IConnectivityMonitor: Send + Sync {
    /// Returns the current connectivity state
    fn is_online(&self) -> bool;

    /// Subscribes to connectivity transitions
    ///
    /// The receiver yields the new state on every change; the current
    /// value is readable immediately via `borrow`.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity monitor driven by an externally supplied boolean
///
/// Hosts feed platform online/offline transitions in via
/// [`set_online`](SharedConnectivity::set_online); tests use it to
/// single-step connectivity deterministically.
pub struct SharedConnectivity {
    tx: watch::Sender<bool>,
}

impl SharedConnectivity {
    /// Creates a monitor with the given initial state
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Creates a monitor that starts online
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Creates a monitor that starts offline
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Updates the connectivity state, notifying subscribers on change
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
    }
}

impl Default for SharedConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

impl IConnectivityMonitor for SharedConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(SharedConnectivity::online().is_online());
        assert!(!SharedConnectivity::offline().is_online());
    }

    #[test]
    fn test_set_online() {
        let monitor = SharedConnectivity::offline();
        monitor.set_online(true);
        assert!(monitor.is_online());
        monitor.set_online(false);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let monitor = SharedConnectivity::offline();
        let mut rx = monitor.subscribe();
        assert!(!*rx.borrow());

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_redundant_set_does_not_notify() {
        let monitor = SharedConnectivity::online();
        let mut rx = monitor.subscribe();
        rx.mark_unchanged();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }
}
