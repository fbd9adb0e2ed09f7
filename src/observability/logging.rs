//! Structured logging.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured
/// level. Safe to call once per process; embedders that install their own
/// subscriber should skip this.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vault_sync={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
