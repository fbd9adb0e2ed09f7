//! Connectivity probing.
//!
//! # Responsibilities
//! - Answer "is the remote backend usable right now?" without hammering it
//! - Trip the breaker on saturation signals (timeout, 5xx, 429)
//!
//! One bounded probe per call, no retries. Results are memoized for a
//! minimum interval so status badges polling the probe do not turn into a
//! request stream.

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::clock::Clock;
use crate::config::schema::ProbeConfig;
use crate::observability::metrics;
use crate::resilience::breaker::CircuitBreaker;
use crate::store::remote::RemoteStore;
use crate::store::types::VaultError;

/// Result of a connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub ok: bool,
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
    /// Stable failure tag, when the check failed.
    pub error: Option<&'static str>,
}

impl ProbeOutcome {
    fn healthy(status: u16) -> Self {
        Self {
            ok: true,
            status: Some(status),
            error: None,
        }
    }

    fn failed(status: Option<u16>, error: &'static str) -> Self {
        Self {
            ok: false,
            status,
            error: Some(error),
        }
    }
}

struct Snapshot {
    outcome: ProbeOutcome,
    /// When a response was last received. Transport failures keep the prior
    /// value so the next check probes again instead of trusting the memo.
    at_millis: u64,
}

pub struct ConnectivityProbe {
    remote: Arc<dyn RemoteStore>,
    breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    config: ProbeConfig,
    last: ArcSwapOption<Snapshot>,
}

impl ConnectivityProbe {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
        config: ProbeConfig,
    ) -> Self {
        Self {
            remote,
            breaker,
            clock,
            config,
            last: ArcSwapOption::empty(),
        }
    }

    /// Check backend reachability. Absent `force`, a result younger than the
    /// minimum interval is returned unchanged.
    pub async fn check(&self, force: bool) -> ProbeOutcome {
        let now = self.clock.now_millis();

        if !force {
            if let Some(snapshot) = self.last.load_full() {
                if now.saturating_sub(snapshot.at_millis) < self.config.min_interval_ms {
                    return snapshot.outcome;
                }
            }
        }

        if self.breaker.is_open() {
            metrics::record_probe("VAULT_COOLING");
            return ProbeOutcome::failed(None, "VAULT_COOLING");
        }

        let deadline = Duration::from_millis(self.config.timeout_ms);

        let (outcome, responded) = match time::timeout(deadline, self.remote.ping()).await {
            Ok(Ok(status)) => {
                if status >= 500 || status == 429 {
                    tracing::warn!(status = status, "Probe saw saturated backend");
                    self.breaker.trip("probe");
                    (ProbeOutcome::failed(Some(status), "VAULT_SATURATED"), true)
                } else {
                    (ProbeOutcome::healthy(status), true)
                }
            }
            Ok(Err(err)) => {
                if err.trips_breaker() {
                    tracing::warn!(error = %err, "Probe transport failure");
                    self.breaker.trip("probe");
                } else {
                    tracing::debug!(error = %err, "Probe failed without implicating backend");
                }
                (ProbeOutcome::failed(err.status(), err.tag()), false)
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.timeout_ms, "Probe timed out");
                self.breaker.trip("probe");
                (ProbeOutcome::failed(None, VaultError::Timeout.tag()), false)
            }
        };

        let at_millis = if responded {
            self.clock.now_millis()
        } else {
            // Keep the old memo timestamp so the next check re-probes.
            self.last.load().as_ref().map(|s| s.at_millis).unwrap_or(0)
        };
        self.last.store(Some(Arc::new(Snapshot { outcome, at_millis })));

        metrics::record_probe(outcome.error.unwrap_or("ok"));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::VaultEvents;
    use crate::store::local::MemoryStore;
    use crate::store::test_support::FakeRemote;
    use std::sync::atomic::Ordering;

    const START: u64 = 1_000_000_000;

    struct Fixture {
        probe: ConnectivityProbe,
        remote: Arc<FakeRemote>,
        breaker: Arc<CircuitBreaker>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let remote = Arc::new(FakeRemote::new());
        let clock = Arc::new(ManualClock::new(START));
        let breaker = Arc::new(CircuitBreaker::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            VaultEvents::new(),
            Duration::from_millis(120_000),
        ));
        let probe = ConnectivityProbe::new(
            remote.clone(),
            breaker.clone(),
            clock.clone(),
            ProbeConfig::default(),
        );
        Fixture {
            probe,
            remote,
            breaker,
            clock,
        }
    }

    #[tokio::test]
    async fn healthy_probe_reports_status() {
        let f = fixture();
        f.remote.script_ping(Ok(200));

        let outcome = f.probe.check(false).await;
        assert!(outcome.ok);
        assert_eq!(outcome.status, Some(200));
        assert_eq!(outcome.error, None);
        assert!(!f.breaker.is_open());
    }

    #[tokio::test]
    async fn results_are_memoized_within_interval() {
        let f = fixture();
        f.remote.script_ping(Ok(200));

        let first = f.probe.check(false).await;
        f.clock.advance(10_000);
        let second = f.probe.check(false).await;

        assert_eq!(first, second);
        assert_eq!(f.remote.ping_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn force_bypasses_the_memo() {
        let f = fixture();
        f.remote.script_ping(Ok(200));
        f.remote.script_ping(Ok(204));

        f.probe.check(false).await;
        let forced = f.probe.check(true).await;

        assert_eq!(forced.status, Some(204));
        assert_eq!(f.remote.ping_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn memo_expires_after_interval() {
        let f = fixture();
        f.remote.script_ping(Ok(200));
        f.remote.script_ping(Ok(204));

        f.probe.check(false).await;
        f.clock.advance(30_001);
        let refreshed = f.probe.check(false).await;

        assert_eq!(refreshed.status, Some(204));
        assert_eq!(f.remote.ping_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn saturated_status_trips_the_breaker() {
        let f = fixture();
        f.remote.script_ping(Ok(503));

        let outcome = f.probe.check(false).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.status, Some(503));
        assert_eq!(outcome.error, Some("VAULT_SATURATED"));
        assert!(f.breaker.is_open());
    }

    #[tokio::test]
    async fn rate_limiting_trips_the_breaker() {
        let f = fixture();
        f.remote.script_ping(Ok(429));

        let outcome = f.probe.check(false).await;
        assert_eq!(outcome.error, Some("VAULT_SATURATED"));
        assert!(f.breaker.is_open());
    }

    #[tokio::test]
    async fn offline_does_not_trip_the_breaker() {
        let f = fixture();
        f.remote
            .script_ping(Err(VaultError::Offline("connect refused".into())));

        let outcome = f.probe.check(false).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error, Some("OFFLINE"));
        assert!(!f.breaker.is_open());
    }

    #[tokio::test]
    async fn open_breaker_short_circuits_without_probing() {
        let f = fixture();
        f.breaker.trip("test");

        let outcome = f.probe.check(true).await;
        assert_eq!(outcome.error, Some("VAULT_COOLING"));
        assert_eq!(f.remote.ping_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_backend_times_out_and_trips() {
        let f = fixture();
        // Backend that never answers within the 3 s deadline.
        f.remote.ping_delay_ms.store(60_000, Ordering::SeqCst);

        let outcome = f.probe.check(false).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error, Some("VAULT_TIMEOUT"));
        assert!(f.breaker.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_does_not_refresh_the_memo() {
        let f = fixture();
        f.remote.ping_delay_ms.store(60_000, Ordering::SeqCst);
        f.probe.check(false).await;

        // The timeout left the memo stale, so the very next check probes
        // again instead of serving the failure for the full interval.
        f.remote.ping_delay_ms.store(0, Ordering::SeqCst);
        f.clock.advance(130_000); // past the cooldown from the trip
        f.remote.script_ping(Ok(200));

        let outcome = f.probe.check(false).await;
        assert!(outcome.ok);
        assert_eq!(f.remote.ping_calls.load(Ordering::SeqCst), 2);
    }
}
