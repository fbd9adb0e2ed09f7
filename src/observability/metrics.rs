//! Metrics collection.
//!
//! Records onto the `metrics` facade; whatever recorder the embedding
//! application installs receives these. No exporter is started here.

/// Count a breaker trip, labeled by which component detected the failure.
pub fn record_breaker_trip(source: &'static str) {
    metrics::counter!("vault_breaker_trips_total", "source" => source).increment(1);
}

/// Count a remote write, labeled by outcome ("ok", "error", "deferred").
pub fn record_remote_write(outcome: &'static str) {
    metrics::counter!("vault_remote_writes_total", "outcome" => outcome).increment(1);
}

/// Count a remote read, labeled by where the value came from
/// ("cache", "remote", "local").
pub fn record_read(source: &'static str) {
    metrics::counter!("vault_reads_total", "source" => source).increment(1);
}

/// Count a connectivity probe, labeled by result tag.
pub fn record_probe(result: &'static str) {
    metrics::counter!("vault_probes_total", "result" => result).increment(1);
}

/// Track the number of entries in the local store.
pub fn record_local_store_size(size: usize) {
    metrics::gauge!("vault_local_store_entries").set(size as f64);
}

/// Track the number of debounced writes currently scheduled.
pub fn record_pending_writes(count: usize) {
    metrics::gauge!("vault_pending_writes").set(count as f64);
}
