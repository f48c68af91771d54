//! Blob Length Probe - counts blobs in an Azure storage container once and reports the
//! external metric a blob-backed autoscaler would publish
//!
//! Configuration comes from flags or environment variables. The metric type is resolved
//! before any network call, so an unsupported type fails without touching storage.

pub mod config;
pub mod metrics;
pub mod report;

pub use config::Config;
pub use metrics::Metrics;
pub use report::{run_probe, MetricReport};
