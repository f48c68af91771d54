//! One probe run, from configuration to metric report

use crate::config::Config;
use crate::metrics::Metrics;
use anyhow::{Context, Result};
use azure_blob::{get_blob_list_length, BlobMetadata};
use reqwest::Client;
use scalers::{get_metric_target, get_metric_target_type, remove_index_from_metric_name, MetricTarget};
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// External metric reading for one scaler instance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub metric_name: String,
    pub target: MetricTarget,
    pub length: i64,
    /// Whether the count is above the activation threshold
    pub active: bool,
}

pub async fn run_probe(
    config: &Config,
    cancel: &CancellationToken,
    metrics: &Metrics,
) -> Result<MetricReport> {
    let scaler_config = config
        .scaler_config()
        .context("Invalid scaler configuration")?;
    let target_type = get_metric_target_type(&scaler_config)?;
    let pod_identity = config.pod_identity()?;
    let metadata = BlobMetadata::parse(&scaler_config, &pod_identity)
        .context("Invalid Azure Blob trigger metadata")?;

    let base_name = remove_index_from_metric_name(metadata.scaler_index, &metadata.metric_name)?;
    debug!(
        metric_name = %metadata.metric_name,
        base_name = %base_name,
        target_type = %target_type,
        "Resolved metric"
    );

    let mut builder = Client::builder();
    if let Some(timeout) = scaler_config.global_http_timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().context("Failed to build HTTP client")?;

    let started = Instant::now();
    let outcome = get_blob_list_length(
        cancel,
        &client,
        &pod_identity,
        &metadata.connection,
        &metadata.location,
        config.list_options(),
    )
    .await;

    if let Some(e) = outcome.error {
        metrics.record_error(e.kind(), &metadata.metric_name);
        return Err(anyhow::Error::new(e).context(format!(
            "Failed to count blobs in container {}",
            metadata.location.container_name
        )));
    }
    metrics.record_probe(&metadata.metric_name, outcome.length, started.elapsed());

    let report = MetricReport {
        target: get_metric_target(target_type, metadata.target_blob_count),
        active: outcome.length > metadata.activation_blob_count,
        length: outcome.length,
        metric_name: metadata.metric_name,
    };
    info!(
        metric_name = %report.metric_name,
        length = report.length,
        active = report.active,
        "Probe complete"
    );

    Ok(report)
}
