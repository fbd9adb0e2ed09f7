//! Bounded retry with exponential backoff.
//!
//! Used for the flaky generation-API fetch path, where a transient failure is
//! worth retrying on the spot. Deliberately not used by the sync cache: its
//! failure handling is the breaker plus local fallback, and stacking retries
//! under that would multiply pressure on an already saturated backend.

use std::future::Future;
use std::time::Duration;

use crate::config::schema::RetryConfig;

/// Exponential backoff schedule with ±30% jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_delay_ms: u64,
    max_delay_ms: u64,
    attempt: u32,
}

impl Backoff {
    /// Cap on the exponent; 2^64 would overflow the millisecond math.
    const MAX_ATTEMPT: u32 = 63;

    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, advancing the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(self.attempt));
        self.attempt = (self.attempt + 1).min(Self::MAX_ATTEMPT);

        let capped = exponential.min(self.max_delay_ms);
        let jitter = 0.7 + fastrand::f64() * 0.6;
        Duration::from_millis((capped as f64 * jitter) as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Run `op` up to `config.max_attempts` times, sleeping a jittered
/// exponential delay between attempts. Only errors `is_transient` accepts are
/// retried; anything else propagates immediately. `op` always runs at least
/// once, so a zero-attempt config degrades to a single try.
pub async fn retry_with_backoff<T, E, F, Fut, C>(
    config: &RetryConfig,
    is_transient: C,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = Backoff::new(config.base_delay_ms, config.max_delay_ms);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < config.max_attempts && is_transient(&err) => {
                let delay = backoff.next_delay();
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
