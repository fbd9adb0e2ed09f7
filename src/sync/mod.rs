//! Dual-write synchronization.
//!
//! # Data Flow
//! ```text
//! save → local store (synchronous, always)
//!      → cache.rs debounce → remote upsert (skipped while degraded)
//! load → cache.rs read cache → remote fetch → local fallback
//! ```

pub mod cache;

pub use cache::{HydrationGuard, VaultCache};
