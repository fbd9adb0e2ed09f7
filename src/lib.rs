//! Offline-resilient dual-write persistence.
//!
//! Every save lands in a local store synchronously, then syncs to a remote
//! backend after a debounce window. A connectivity probe and a persisted,
//! time-gated circuit breaker decide when the backend is worth talking to;
//! while it is not, the vault serves and accepts everything locally and
//! catches up later.
//!
//! ```no_run
//! use vault_sync::{RecordKey, Vault, VaultConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = Vault::new(VaultConfig::default())?;
//! let key = RecordKey::new("projects", "p1");
//! vault.save(&key, serde_json::json!({"name": "demo"}), false).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod events;
pub mod observability;
pub mod resilience;
pub mod store;
pub mod sync;
pub mod vault;

pub use config::schema::VaultConfig;
pub use config::{load_config, ConfigError};
pub use events::{VaultEvent, VaultEvents};
pub use resilience::{CircuitBreaker, ConnectivityProbe, ProbeOutcome};
pub use store::{JsonFileStore, LocalStore, MemoryStore, RecordKey, RemoteStore, VaultError, VaultResult};
pub use sync::{HydrationGuard, VaultCache};
pub use vault::Vault;
