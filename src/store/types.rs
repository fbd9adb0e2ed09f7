//! Record identity and error definitions for the storage layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix for records created while the backend was unreachable. Such records
/// exist only locally and are never pushed to the remote store.
const LOCAL_ID_PREFIX: &str = "local_";

/// Logical identity of a record: an entity collection plus an id within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Entity collection on the remote backend ("projects", "strategies", ...).
    pub collection: String,
    /// Record id. Ids minted offline carry the `local_` prefix.
    pub id: String,
}

impl RecordKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Mint a key for a record created without a remote round-trip.
    pub fn local(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
        }
    }

    /// True for records that were never created remotely. Remote writes for
    /// these are skipped entirely.
    pub fn is_local_only(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    /// Key under which this record's payload lives in the local store.
    pub fn local_key(&self) -> String {
        format!("vault_{}_{}", self.collection, self.id)
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Errors surfaced by remote storage operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The request exceeded its client-side deadline.
    #[error("remote request timed out")]
    Timeout,

    /// The backend answered 5xx or 429. Treated as backend-unhealthy.
    #[error("remote backend saturated (status {status})")]
    Saturated { status: u16 },

    /// Transport-level connect failure. Nothing to blame the server for.
    #[error("network unreachable: {0}")]
    Offline(String),

    /// The breaker is open; the operation was skipped without a remote call.
    #[error("circuit breaker open, operating locally")]
    Cooling,

    /// The backend demands credentials the caller does not have.
    #[error("authentication required (status {status})")]
    AuthRequired { status: u16 },

    /// The backend answered but the body did not decode.
    #[error("malformed remote response: {0}")]
    Malformed(String),

    /// Any other non-success status. Not a health signal.
    #[error("remote request failed (status {status})")]
    Failed { status: u16 },
}

impl VaultError {
    /// Stable tag for UI display and logs.
    pub fn tag(&self) -> &'static str {
        match self {
            VaultError::Timeout => "VAULT_TIMEOUT",
            VaultError::Saturated { .. } => "VAULT_SATURATED",
            VaultError::Offline(_) => "OFFLINE",
            VaultError::Cooling => "VAULT_COOLING",
            VaultError::AuthRequired { .. } => "AUTH_REQUIRED",
            VaultError::Malformed(_) => "MALFORMED",
            VaultError::Failed { .. } => "VAULT_ERROR",
        }
    }

    /// Whether this failure should open the circuit breaker. Only signals
    /// that implicate the backend qualify: timeouts and 5xx/429. A plain
    /// connect failure means the client is offline, not that the backend is
    /// unhealthy.
    pub fn trips_breaker(&self) -> bool {
        matches!(self, VaultError::Timeout | VaultError::Saturated { .. })
    }

    /// HTTP status carried by the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            VaultError::Saturated { status }
            | VaultError::AuthRequired { status }
            | VaultError::Failed { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for remote storage operations.
pub type VaultResult<T> = Result<T, VaultError>;
