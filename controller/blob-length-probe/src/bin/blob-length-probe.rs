//! Blob Length Probe binary - counts blobs once and prints the metric report as JSON

use blob_length_probe::{run_probe, Config, Metrics};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Logs go to stderr, stdout carries the report
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("Starting Blob Length Probe");
    info!("  Container: {}", config.blob_container_name);
    info!("  Prefix: {}", config.blob_prefix.as_deref().unwrap_or("<none>"));
    info!("  Pod identity: {}", config.pod_identity);
    info!("  Scaler index: {}", config.scaler_index);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling probe");
            on_interrupt.cancel();
        }
    });

    match run_probe(&config, &cancel, &Metrics).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            error!("Blob length probe failed: {:#}", e);
            Err(e)
        }
    }
}
