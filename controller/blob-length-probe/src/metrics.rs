//! Metrics stub for the blob length probe
//!
//! Records are emitted as structured log events.

use azure_blob::ProbeErrorKind;
use std::time::Duration;
use tracing::info;

/// Metrics recorder for probe runs
#[derive(Clone, Debug, Default)]
pub struct Metrics;

impl Metrics {
    /// Record a successful blob count
    pub fn record_probe(&self, metric_name: &str, length: i64, elapsed: Duration) {
        info!(
            metric_name = %metric_name,
            length = length,
            elapsed_ms = elapsed.as_millis() as u64,
            "Recorded blob count"
        );
    }

    /// Record a failed probe by error kind
    pub fn record_error(&self, kind: ProbeErrorKind, metric_name: &str) {
        info!(
            error_kind = %kind,
            metric_name = %metric_name,
            "Recorded probe error"
        );
    }
}
