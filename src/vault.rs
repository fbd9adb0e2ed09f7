//! Public facade assembling the vault from configuration.
//!
//! # Responsibilities
//! - Wire the local store, remote client, breaker, probe, and cache together
//! - Expose the small surface embedders actually use: save, load, delete,
//!   connectivity checks, hydration, and event subscription
//!
//! Every component is an owned instance behind `Arc`. Two vaults in one
//! process share nothing unless handed the same stores.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::clock::{Clock, SystemClock};
use crate::config::loader::ConfigError;
use crate::config::schema::VaultConfig;
use crate::config::validation::validate_config;
use crate::events::{VaultEvent, VaultEvents};
use crate::resilience::breaker::CircuitBreaker;
use crate::resilience::probe::{ConnectivityProbe, ProbeOutcome};
use crate::store::local::{JsonFileStore, LocalStore, MemoryStore};
use crate::store::remote::{HttpRemoteStore, RemoteStore};
use crate::store::types::{RecordKey, VaultResult};
use crate::sync::cache::{HydrationGuard, VaultCache};

pub struct Vault {
    cache: VaultCache,
    probe: Arc<ConnectivityProbe>,
    breaker: Arc<CircuitBreaker>,
    events: VaultEvents,
}

impl Vault {
    /// Build a vault from configuration: HTTP remote client, file-backed
    /// local store when a path is configured (in-memory otherwise), system
    /// clock.
    pub fn new(config: VaultConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let local: Arc<dyn LocalStore> = match &config.local.path {
            Some(path) => Arc::new(JsonFileStore::open(path).map_err(ConfigError::Io)?),
            None => Arc::new(MemoryStore::new()),
        };
        let remote = Arc::new(HttpRemoteStore::new(&config.remote)?);

        Ok(Self::with_stores(config, local, remote, Arc::new(SystemClock)))
    }

    /// Assemble over injected stores and clock. For embedders that manage
    /// their own persistence, and for tests.
    pub fn with_stores(
        config: VaultConfig,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = VaultEvents::new();
        let breaker = Arc::new(CircuitBreaker::new(
            local.clone(),
            clock.clone(),
            events.clone(),
            Duration::from_millis(config.probe.cooldown_ms),
        ));
        let probe = Arc::new(ConnectivityProbe::new(
            remote.clone(),
            breaker.clone(),
            clock.clone(),
            config.probe.clone(),
        ));
        let cache = VaultCache::new(local, remote, breaker.clone(), clock, config.sync.clone());

        Self {
            cache,
            probe,
            breaker,
            events,
        }
    }

    /// Save a record; see [`VaultCache::save`].
    pub async fn save(&self, key: &RecordKey, value: Value, immediate: bool) -> VaultResult<()> {
        self.cache.save(key, value, immediate).await
    }

    /// Load a record; see [`VaultCache::load`].
    pub async fn load(&self, key: &RecordKey) -> Option<Value> {
        self.cache.load(key).await
    }

    /// Delete a record; see [`VaultCache::delete`].
    pub async fn delete(&self, key: &RecordKey) {
        self.cache.delete(key).await
    }

    /// Check backend reachability; see [`ConnectivityProbe::check`].
    pub async fn check_connectivity(&self, force: bool) -> ProbeOutcome {
        self.probe.check(force).await
    }

    /// Suppress remote writes while loading remote data into local state.
    pub fn begin_hydration(&self) -> HydrationGuard {
        self.cache.begin_hydration()
    }

    /// The shared circuit breaker, for status displays and manual mode
    /// control.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Subscribe to degradation events.
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    /// Number of debounced writes currently scheduled.
    pub fn pending_writes(&self) -> usize {
        self.cache.pending_writes()
    }
}
