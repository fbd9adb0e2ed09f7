//! Debounced dual-write cache.
//!
//! # Responsibilities
//! - Land every save in the local store synchronously before anything else
//! - Push records to the remote store after a quiet period, coalescing
//!   rapid edits into one write
//! - Serve reads from a short-lived cache, then remote, then the local copy
//!
//! # Design Decisions
//! - The local write is the durability floor; nothing on the remote path can
//!   lose data that already landed locally
//! - At most one remote write per key is ever in flight. A flush arriving
//!   while one runs parks its payload in a single-slot cell; the running
//!   flush drains the cell, so the newest value wins without recursion
//! - Background sync failures are swallowed after updating breaker state;
//!   only `immediate` saves surface errors to the caller
//!
//! # Data Flow
//! ```text
//! save → local store (sync) → park payload → debounce timer → flush
//!                                          ↘ immediate: flush now, awaited
//! load → read cache (60 s TTL) → remote fetch → write-through
//!                              ↘ breaker open / fetch failed: local copy
//! ```

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::schema::SyncConfig;
use crate::observability::metrics;
use crate::resilience::breaker::CircuitBreaker;
use crate::store::local::LocalStore;
use crate::store::remote::RemoteStore;
use crate::store::types::{RecordKey, VaultResult};

/// A remote read held for the configured TTL.
struct CachedRead {
    value: Value,
    at_millis: u64,
}

struct CacheInner {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    breaker: Arc<CircuitBreaker>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,

    /// Generation of the live debounce timer per key. A newer save replaces
    /// the generation; the superseded timer finds it gone and exits.
    pending: DashMap<String, u64>,
    next_gen: AtomicU64,

    /// Latest unsynced payload per key. Whoever holds the write lock drains
    /// this, so rapid edits collapse into the most recent value.
    latest: DashMap<String, Value>,
    write_locks: DashMap<String, Arc<Mutex<()>>>,

    read_cache: DashMap<String, CachedRead>,
    /// One remote fetch per cold key at a time; waiters serve the cached
    /// answer the holder wrote through.
    read_locks: DashMap<String, Arc<Mutex<()>>>,

    /// Nonzero while hydration guards are alive; remote writes are skipped.
    hydrations: Arc<AtomicUsize>,
}

impl CacheInner {
    fn hydrating(&self) -> bool {
        self.hydrations.load(Ordering::SeqCst) > 0
    }
}

/// Suppresses remote writes while alive. Dropping it re-enables them, so a
/// panicking hydration path cannot leave writes suppressed forever.
pub struct HydrationGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for HydrationGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct VaultCache {
    inner: Arc<CacheInner>,
}

impl VaultCache {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        breaker: Arc<CircuitBreaker>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                local,
                remote,
                breaker,
                clock,
                config,
                pending: DashMap::new(),
                next_gen: AtomicU64::new(0),
                latest: DashMap::new(),
                write_locks: DashMap::new(),
                read_cache: DashMap::new(),
                read_locks: DashMap::new(),
                hydrations: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Save a record. The local write always happens, synchronously. The
    /// remote write is skipped while hydrating, while the breaker is open,
    /// or for records that were never created remotely; otherwise it runs
    /// after the debounce window, or right away when `immediate` is set.
    ///
    /// Only `immediate` saves report remote failures. Scheduled ones log,
    /// update breaker state, and keep the data local.
    pub async fn save(&self, key: &RecordKey, value: Value, immediate: bool) -> VaultResult<()> {
        let inner = &self.inner;
        let lk = key.local_key();

        inner.local.set(&lk, &value.to_string());
        inner.read_cache.remove(&lk);

        if inner.hydrating() {
            tracing::debug!(key = %key, "Hydration in progress, keeping write local");
            return Ok(());
        }
        if key.is_local_only() {
            tracing::debug!(key = %key, "Record has no remote identity, keeping write local");
            return Ok(());
        }
        if inner.breaker.is_open() {
            tracing::debug!(key = %key, "Circuit open, keeping write local");
            metrics::record_remote_write("deferred");
            return Ok(());
        }

        inner.latest.insert(lk.clone(), value);

        if immediate {
            inner.pending.remove(&lk);
            metrics::record_pending_writes(inner.pending.len());
            return self.flush(key).await;
        }

        let gen = inner.next_gen.fetch_add(1, Ordering::SeqCst);
        inner.pending.insert(lk, gen);
        metrics::record_pending_writes(inner.pending.len());

        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let debounce = Duration::from_millis(cache.inner.config.debounce_ms);
            tokio::time::sleep(debounce).await;

            // A newer save replaced the generation; its timer owns the flush.
            let claimed = cache
                .inner
                .pending
                .remove_if(&key.local_key(), |_, g| *g == gen);
            if claimed.is_none() {
                return;
            }
            metrics::record_pending_writes(cache.inner.pending.len());

            if let Err(err) = cache.flush(&key).await {
                tracing::warn!(key = %key, error = %err, "Background sync failed, data held locally");
            }
        });

        Ok(())
    }

    /// Load a record. A read-cache entry younger than the TTL wins; otherwise
    /// the remote store is consulted and its answer written through. Any
    /// remote failure degrades to the local copy, so this never errors
    /// toward the caller.
    pub async fn load(&self, key: &RecordKey) -> Option<Value> {
        let inner = &self.inner;
        let lk = key.local_key();

        if let Some(value) = self.fresh_cached(&lk) {
            metrics::record_read("cache");
            return Some(value);
        }

        if key.is_local_only() || inner.breaker.is_open() {
            metrics::record_read("local");
            return self.load_local(&lk);
        }

        // One fetch per cold key; concurrent loads queue here and serve
        // whatever the first one wrote through.
        let lock = inner
            .read_locks
            .entry(lk.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        if let Some(value) = self.fresh_cached(&lk) {
            drop(guard);
            drop(lock);
            self.release_read_lock(&lk);
            metrics::record_read("cache");
            return Some(value);
        }

        let result = match inner.remote.fetch(key).await {
            Ok(Some(value)) => {
                inner.local.set(&lk, &value.to_string());
                inner.read_cache.insert(
                    lk.clone(),
                    CachedRead {
                        value: value.clone(),
                        at_millis: inner.clock.now_millis(),
                    },
                );
                metrics::record_read("remote");
                Some(value)
            }
            Ok(None) => {
                metrics::record_read("local");
                self.load_local(&lk)
            }
            Err(err) => {
                if err.trips_breaker() {
                    inner.breaker.trip("sync");
                }
                tracing::warn!(key = %key, error = %err, "Remote read failed, serving local copy");
                metrics::record_read("local_fallback");
                self.load_local(&lk)
            }
        };

        drop(guard);
        drop(lock);
        self.release_read_lock(&lk);
        result
    }

    /// Delete a record everywhere. The local removal always happens; the
    /// remote delete is skipped for local-only records and while the breaker
    /// is open, and its failure is swallowed since the local copy is gone
    /// either way.
    pub async fn delete(&self, key: &RecordKey) {
        let inner = &self.inner;
        let lk = key.local_key();

        inner.local.remove(&lk);
        inner.read_cache.remove(&lk);
        inner.latest.remove(&lk);
        inner.pending.remove(&lk);
        // Lock entries for a gone record are only kept while someone still
        // holds a handle to them; otherwise the maps would grow with every
        // distinct key the process ever touched.
        inner
            .write_locks
            .remove_if(&lk, |_, lock| Arc::strong_count(lock) == 1);
        self.release_read_lock(&lk);

        if key.is_local_only() || inner.breaker.is_open() {
            return;
        }

        if let Err(err) = inner.remote.delete(key).await {
            if err.trips_breaker() {
                inner.breaker.trip("sync");
            }
            tracing::warn!(key = %key, error = %err, "Remote delete failed");
        }
    }

    /// Suppress remote writes until the returned guard drops. Used while
    /// loading remote data into local state, where echoing every record back
    /// at the backend would double traffic for nothing.
    pub fn begin_hydration(&self) -> HydrationGuard {
        self.inner.hydrations.fetch_add(1, Ordering::SeqCst);
        HydrationGuard {
            counter: self.inner.hydrations.clone(),
        }
    }

    /// Number of debounced writes currently waiting out their quiet period.
    pub fn pending_writes(&self) -> usize {
        self.inner.pending.len()
    }

    /// Push the newest parked payload for `key` to the remote store. If a
    /// write for the key is already in flight, returns immediately; the
    /// holder drains the parked payload when it finishes.
    fn flush<'a>(
        &'a self,
        key: &'a RecordKey,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = VaultResult<()>> + Send + 'a>> {
        Box::pin(async move {
        let inner = &self.inner;
        let lk = key.local_key();
        let lock = inner
            .write_locks
            .entry(lk.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        loop {
            let result = {
                let Ok(_guard) = lock.try_lock() else {
                    // In flight elsewhere. The payload was parked before
                    // this point, so the holder's drain loop will see it.
                    return Ok(());
                };

                let mut drained = Ok(());
                while let Some((_, value)) = inner.latest.remove(&lk) {
                    if let Err(err) = inner.remote.upsert(key, &value).await {
                        metrics::record_remote_write(err.tag());
                        if err.trips_breaker() {
                            inner.breaker.trip("sync");
                        }
                        drained = Err(err);
                        break;
                    }
                    metrics::record_remote_write("ok");
                    tracing::debug!(key = %key, "Record synced to remote store");
                }
                drained
            };

            // A save may park between our last drain and its failed
            // try_lock. Re-acquire rather than strand that payload.
            if !inner.latest.contains_key(&lk) {
                return result;
            }

            if let Err(err) = result {
                // A save that lost the try_lock to us already returned Ok
                // trusting this flush to carry its payload. Hand the parked
                // value to a follow-up flush so the failure still reaches
                // our caller without dropping theirs.
                let cache = self.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    if let Err(err) = cache.flush(&key).await {
                        tracing::warn!(key = %key, error = %err, "Deferred sync failed, data held locally");
                    }
                });
                return Err(err);
            }
        }
        })
    }

    /// The read-cache entry for `lk`, when it is younger than the TTL.
    fn fresh_cached(&self, lk: &str) -> Option<Value> {
        let entry = self.inner.read_cache.get(lk)?;
        let age = self
            .inner
            .clock
            .now_millis()
            .saturating_sub(entry.at_millis);
        if age < self.inner.config.read_ttl_ms {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Drop the per-key fetch lock once nothing else holds a handle to it.
    fn release_read_lock(&self, lk: &str) {
        self.inner
            .read_locks
            .remove_if(lk, |_, lock| Arc::strong_count(lock) == 1);
    }

    fn load_local(&self, lk: &str) -> Option<Value> {
        let raw = self.inner.local.get(lk)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(key = lk, error = %err, "Local copy is not valid JSON");
                None
            }
        }
    }
}
