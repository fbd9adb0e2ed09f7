//! Cross-cutting observability: logging and metrics.

pub mod logging;
pub mod metrics;
