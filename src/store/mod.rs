//! Storage backends.
//!
//! # Data Flow
//! ```text
//! save() → local.rs (synchronous durability floor)
//!        → remote.rs (debounced, breaker-gated)
//! load() → remote.rs when reachable, write-through to local.rs
//!        → local.rs fallback otherwise
//! ```

pub mod local;
pub mod remote;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use local::{JsonFileStore, LocalStore, MemoryStore};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use types::{RecordKey, VaultError, VaultResult};
