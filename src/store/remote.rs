//! Remote backend client.
//!
//! # Responsibilities
//! - Talk to the hosted key-value backend over HTTPS
//! - Map transport and status failures onto the vault error taxonomy
//! - Provide the cheap reachability probe used by the connectivity check
//!
//! The backend is a Supabase-style REST surface: records live in collections,
//! are addressed by id filters, and the payload sits in a `data` column.

use async_trait::async_trait;
use serde_json::{json, Value};
use url::Url;

use crate::config::loader::ConfigError;
use crate::config::schema::RemoteConfig;
use crate::config::validation::ValidationError;
use crate::store::types::{RecordKey, VaultError, VaultResult};

/// Asynchronous record store on the remote backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Cheap reachability check. Returns the raw HTTP status so the caller
    /// can classify it; errors only for transport-level failures.
    async fn ping(&self) -> VaultResult<u16>;

    /// Read the payload stored under `key`, if the record exists.
    async fn fetch(&self, key: &RecordKey) -> VaultResult<Option<Value>>;

    /// Create or replace the record under `key`.
    async fn upsert(&self, key: &RecordKey, value: &Value) -> VaultResult<()>;

    /// Remove the record under `key`. Removing a missing record succeeds.
    async fn delete(&self, key: &RecordKey) -> VaultResult<()>;
}

/// [`RemoteStore`] backed by an HTTP REST endpoint.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl HttpRemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ConfigError::Validation(vec![ValidationError {
                field: "remote.base_url".to_string(),
                message: e.to_string(),
            }])
        })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| {
                ConfigError::Validation(vec![ValidationError {
                    field: "remote".to_string(),
                    message: format!("failed to build HTTP client: {}", e),
                }])
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.as_str().trim_end_matches('/'),
            suffix
        )
    }

    fn record_endpoint(&self, key: &RecordKey) -> String {
        self.endpoint(&format!("{}?id=eq.{}", key.collection, key.id))
    }

    /// Statuses that indicate the backend itself is unhealthy become
    /// breaker-tripping errors; auth failures and plain 4xx do not.
    fn classify_status(status: u16) -> VaultResult<()> {
        match status {
            200..=399 => Ok(()),
            401 | 403 => Err(VaultError::AuthRequired { status }),
            429 => Err(VaultError::Saturated { status }),
            500..=599 => Err(VaultError::Saturated { status }),
            _ => Err(VaultError::Failed { status }),
        }
    }

    fn classify_transport(error: reqwest::Error) -> VaultError {
        if error.is_timeout() {
            VaultError::Timeout
        } else if error.is_connect() {
            VaultError::Offline(error.to_string())
        } else {
            // Mid-stream failures look like saturation from the client's
            // side; treat them like a timeout so the breaker reacts.
            VaultError::Timeout
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn ping(&self) -> VaultResult<u16> {
        let response = self
            .client
            .get(self.endpoint(""))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        Ok(response.status().as_u16())
    }

    async fn fetch(&self, key: &RecordKey) -> VaultResult<Option<Value>> {
        let response = self
            .client
            .get(self.record_endpoint(key))
            .header("apikey", &self.api_key)
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(Self::classify_transport)?;

        Self::classify_status(response.status().as_u16())?;

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| VaultError::Malformed(e.to_string()))?;

        Ok(rows.into_iter().next().and_then(|row| {
            let payload = row.get("data").cloned();
            if payload.is_none() {
                tracing::warn!(key = %key, "Remote row missing data column");
            }
            payload
        }))
    }

    async fn upsert(&self, key: &RecordKey, value: &Value) -> VaultResult<()> {
        let body = json!({ "id": key.id, "data": value });

        let response = self
            .client
            .post(self.endpoint(&key.collection))
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&body)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        Self::classify_status(response.status().as_u16())
    }

    async fn delete(&self, key: &RecordKey) -> VaultResult<()> {
        let response = self
            .client
            .delete(self.record_endpoint(key))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        Self::classify_status(response.status().as_u16())
    }
}
