//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the configuration schema with production defaults
//! - Load configuration from TOML files
//! - Validate values before any component is built

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    LocalStoreConfig, ObservabilityConfig, ProbeConfig, RemoteConfig, RetryConfig, SyncConfig,
    VaultConfig,
};
