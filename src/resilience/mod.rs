//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Remote operation:
//!     → breaker.rs (skip entirely while open)
//!     → On saturation failure: breaker.rs trip() → fail fast locally
//! Connectivity:
//!     → probe.rs (bounded probe, memoized, feeds the breaker)
//! Out-of-band fetches:
//!     → retry.rs (jittered exponential backoff, never used by the cache)
//! ```
//!
//! # Design Decisions
//! - The breaker is a persisted time gate, not a half-open state machine;
//!   expiry of the cooldown is the only way back to closed
//! - Saturation (timeout/5xx/429) trips; being offline does not
//! - Probe and failed remote calls converge on the same trip path so the UI
//!   observes one behavior

pub mod breaker;
pub mod probe;
pub mod retry;

pub use breaker::CircuitBreaker;
pub use probe::{ConnectivityProbe, ProbeOutcome};
pub use retry::{retry_with_backoff, Backoff};
