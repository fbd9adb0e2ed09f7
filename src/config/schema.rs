//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Defaults carry the production constants: a 3 s probe deadline, 30 s probe
//! memoization, 2 min breaker cooldown, 5 s save debounce, 60 s read TTL.

use serde::{Deserialize, Serialize};

/// Root configuration for the vault.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VaultConfig {
    /// Remote backend endpoint and credentials.
    pub remote: RemoteConfig,

    /// Connectivity probe settings.
    pub probe: ProbeConfig,

    /// Dual-write sync settings.
    pub sync: SyncConfig,

    /// Retry settings for the out-of-band fetch helper.
    pub retry: RetryConfig,

    /// Local persistent store settings.
    pub local: LocalStoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the backend (e.g., "https://example.supabase.co").
    pub base_url: String,

    /// API key sent with every request.
    pub api_key: String,

    /// Per-request timeout in milliseconds for reads and writes.
    pub request_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hard client-side deadline for a single probe, in milliseconds.
    pub timeout_ms: u64,

    /// Minimum interval between real probes; within it the memoized result
    /// is returned unchanged.
    pub min_interval_ms: u64,

    /// How long the breaker stays open after a trip, in milliseconds.
    pub cooldown_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            min_interval_ms: 30_000,
            cooldown_ms: 120_000,
        }
    }
}

/// Dual-write sync configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a scheduled remote write fires, in milliseconds.
    pub debounce_ms: u64,

    /// How long a remote read stays fresh in the read cache, in milliseconds.
    pub read_ttl_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 5_000,
            read_ttl_ms: 60_000,
        }
    }
}

/// Retry configuration for the standalone backoff helper.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
        }
    }
}

/// Local persistent store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LocalStoreConfig {
    /// Path of the JSON file backing the store. `None` keeps everything
    /// in memory.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
