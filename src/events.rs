//! Degradation notifications.
//!
//! The original UI listens for a single global "backend degraded" event and
//! flips status badges. Here that is a broadcast channel: the breaker and the
//! probe both emit on it, subscribers (status indicators, background sync
//! supervisors) each get their own receiver.

use tokio::sync::broadcast;

/// Events published when the vault's view of the backend changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultEvent {
    /// The circuit breaker opened; remote operations will be skipped until
    /// the cooldown elapses.
    CircuitTripped,
}

/// Shared publish/subscribe handle for [`VaultEvent`]s.
#[derive(Debug, Clone)]
pub struct VaultEvents {
    tx: broadcast::Sender<VaultEvent>,
}

impl VaultEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send with no live receivers is not an error;
    /// nothing in the vault requires a listener.
    pub fn emit(&self, event: VaultEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for VaultEvents {
    fn default() -> Self {
        Self::new()
    }
}
