//! Scripted in-process remote store for tests.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::store::remote::RemoteStore;
use crate::store::types::{RecordKey, VaultError, VaultResult};

/// Fake remote backend: records every call, serves scripted outcomes, and can
/// stall writes to exercise in-flight interleavings.
#[derive(Default)]
pub struct FakeRemote {
    /// Backing rows, keyed by the record's display form.
    pub rows: DashMap<String, Value>,
    /// Outcomes returned by successive `ping` calls; once exhausted, 200.
    pub ping_statuses: Mutex<VecDeque<VaultResult<u16>>>,
    /// Errors injected into successive `upsert` calls before any succeed.
    pub upsert_errors: Mutex<VecDeque<VaultError>>,
    /// Errors injected into successive `fetch` calls before any succeed.
    pub fetch_errors: Mutex<VecDeque<VaultError>>,
    /// Completed upserts in arrival order.
    pub upserts: Mutex<Vec<(RecordKey, Value)>>,
    /// Simulated latency applied inside `upsert`.
    pub upsert_delay_ms: AtomicU64,
    /// Simulated latency applied inside `ping`.
    pub ping_delay_ms: AtomicU64,
    /// Simulated latency applied inside `fetch`.
    pub fetch_delay_ms: AtomicU64,

    pub ping_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,

    in_flight: AtomicUsize,
    /// Peak number of concurrently executing upserts.
    pub max_in_flight: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_ping(&self, result: VaultResult<u16>) {
        self.ping_statuses.lock().unwrap().push_back(result);
    }

    pub fn script_upsert_error(&self, error: VaultError) {
        self.upsert_errors.lock().unwrap().push_back(error);
    }

    pub fn script_fetch_error(&self, error: VaultError) {
        self.fetch_errors.lock().unwrap().push_back(error);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }

    pub fn last_upsert(&self) -> Option<(RecordKey, Value)> {
        self.upserts.lock().unwrap().last().cloned()
    }

    pub fn insert_row(&self, key: &RecordKey, value: Value) {
        self.rows.insert(key.to_string(), value);
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn ping(&self) -> VaultResult<u16> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.ping_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match self.ping_statuses.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(200),
        }
    }

    async fn fetch(&self, key: &RecordKey) -> VaultResult<Option<Value>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some(err) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.rows.get(&key.to_string()).map(|r| r.value().clone()))
    }

    async fn upsert(&self, key: &RecordKey, value: &Value) -> VaultResult<()> {
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);

        let delay = self.upsert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = match self.upsert_errors.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => {
                self.rows.insert(key.to_string(), value.clone());
                self.upserts.lock().unwrap().push((key.clone(), value.clone()));
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, key: &RecordKey) -> VaultResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.rows.remove(&key.to_string());
        Ok(())
    }
}
