//! Circuit breaker gating remote operations.
//!
//! # States
//! - Closed: remote operations proceed
//! - Open: remote operations are skipped, local store serves everything
//!
//! # State Transitions
//! ```text
//! Closed → Open: trip() persists now + cooldown as an open-until timestamp
//! Open → Closed: the timestamp passes; no half-open probing, purely a
//!                time gate
//! ```
//!
//! The open-until timestamp lives in the local store, so a restart during a
//! cooldown stays in local-only operation until the window elapses. A
//! persisted mode flag can force local-only operation regardless of time.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::events::{VaultEvent, VaultEvents};
use crate::observability::metrics;
use crate::store::local::LocalStore;

/// Local-store key holding the epoch-millis timestamp the breaker stays
/// open until.
const OPEN_UNTIL_KEY: &str = "vault_breaker_open_until";

/// Local-store key for the storage mode flag.
const MODE_KEY: &str = "vault_storage_mode";

/// Mode value forcing local-only operation.
const MODE_LOCAL: &str = "local";

pub struct CircuitBreaker {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    events: VaultEvents,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(
        store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        events: VaultEvents,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            events,
            cooldown,
        }
    }

    /// True while the persisted mode forces local-only operation, or the
    /// stored open-until timestamp is still in the future.
    pub fn is_open(&self) -> bool {
        if self.forced_local() {
            return true;
        }
        match self.open_until() {
            Some(until) => self.clock.now_millis() < until,
            None => false,
        }
    }

    /// The stored open-until timestamp, if a trip was ever recorded.
    pub fn open_until(&self) -> Option<u64> {
        self.store
            .get(OPEN_UNTIL_KEY)
            .and_then(|raw| raw.parse::<u64>().ok())
    }

    /// Open the breaker for the configured cooldown and notify listeners.
    /// `source` labels which component detected the failure.
    pub fn trip(&self, source: &'static str) {
        self.trip_for(self.cooldown, source);
    }

    /// Open the breaker for an explicit duration. The probe and failed remote
    /// calls both land here, so listeners observe one behavior.
    pub fn trip_for(&self, cooldown: Duration, source: &'static str) {
        let until = self.clock.now_millis() + cooldown.as_millis() as u64;
        self.store.set(OPEN_UNTIL_KEY, &until.to_string());

        tracing::warn!(
            source = source,
            open_until = until,
            cooldown_ms = cooldown.as_millis() as u64,
            "Circuit breaker tripped, operating from local store"
        );
        metrics::record_breaker_trip(source);
        self.events.emit(VaultEvent::CircuitTripped);
    }

    /// Whether the persisted mode flag forces local-only operation.
    pub fn forced_local(&self) -> bool {
        self.store
            .get(MODE_KEY)
            .map(|mode| mode == MODE_LOCAL)
            .unwrap_or(false)
    }

    /// Force or release local-only operation.
    pub fn set_forced_local(&self, forced: bool) {
        if forced {
            self.store.set(MODE_KEY, MODE_LOCAL);
        } else {
            self.store.remove(MODE_KEY);
        }
    }
}
