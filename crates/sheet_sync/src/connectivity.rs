//! Connectivity tracking.
//!
//! The host (browser bridge, desktop shell, or a health check) reports
//! online/offline edges to a [`ConnectivityObserver`]. The sync core reads the
//! current state before any remote attempt and subscribes to transitions to
//! replay the queue when the connection comes back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Whether the remote endpoint is believed reachable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectivity {
    /// Remote saves may be attempted
    Online,
    /// Edits are queued locally
    Offline,
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity::Offline
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connectivity::Online => f.write_str("Online"),
            Connectivity::Offline => f.write_str("Offline"),
        }
    }
}

/// Shared, cloneable handle to the current connectivity state
#[derive(Clone, Debug)]
pub struct ConnectivityObserver {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityObserver {
    /// Create an observer with an initial state
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current state
    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Check if currently online
    pub fn is_online(&self) -> bool {
        self.current() == Connectivity::Online
    }

    /// Check if currently offline
    pub fn is_offline(&self) -> bool {
        self.current() == Connectivity::Offline
    }

    /// Report a state. Returns `true` if this was a transition.
    pub fn set(&self, state: Connectivity) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {}", state);
        }
        changed
    }

    /// Report that the connection came back.
    pub fn set_online(&self) -> bool {
        self.set(Connectivity::Online)
    }

    /// Report that the connection was lost.
    pub fn set_offline(&self) -> bool {
        self.set(Connectivity::Offline)
    }

    /// Receive future transitions
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityObserver {
    fn default() -> Self {
        Self::new(Connectivity::default())
    }
}
