//! Configuration for the blob length probe

use azure_blob::credential::UnknownPodIdentityProvider;
use azure_blob::list::{DEFAULT_MAX_COUNT, DEFAULT_PAGE_SIZE};
use azure_blob::{ListOptions, PodIdentity, PodIdentityProvider};
use clap::Parser;
use scalers::{MetricTargetType, ScalerConfig, ScalerError};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Configuration for one probe run
#[derive(Debug, Clone, Parser)]
#[command(name = "blob-length-probe")]
#[command(about = "Counts blobs in an Azure storage container and prints the external metric")]
pub struct Config {
    /// Container to count blobs in
    #[arg(long, env)]
    pub blob_container_name: String,

    /// Only count blobs under this virtual directory
    #[arg(long, env)]
    pub blob_prefix: Option<String>,

    /// Virtual directory delimiter
    #[arg(long, env, default_value = "/")]
    pub blob_delimiter: String,

    /// Storage connection string (account key or SAS)
    #[arg(long, env = "AZURE_STORAGE_CONNECTION_STRING", hide_env_values = true)]
    pub connection: Option<String>,

    /// Storage account, required with an Azure pod identity
    #[arg(long, env)]
    pub account_name: Option<String>,

    /// Storage endpoint suffix, overrides `cloud`
    #[arg(long, env)]
    pub endpoint_suffix: Option<String>,

    /// Azure cloud name (AzurePublicCloud, AzureChinaCloud, ...)
    #[arg(long, env)]
    pub cloud: Option<String>,

    /// Pod identity provider: none, azure or azure-workload
    #[arg(long, env, default_value = "none")]
    pub pod_identity: String,

    /// Client id of a user-assigned identity
    #[arg(long, env)]
    pub identity_id: Option<String>,

    /// Metric target type: Value or AverageValue
    #[arg(long, env)]
    pub metric_type: Option<String>,

    /// Metric name override, indexed with the scaler index
    #[arg(long, env)]
    pub metric_name: Option<String>,

    /// Position of the scaler among the scaled object's triggers
    #[arg(long, env, default_value_t = 0)]
    pub scaler_index: usize,

    /// Target blob count per replica
    #[arg(long, env, default_value_t = 5)]
    pub blob_count: i64,

    /// Blob count above which the scaler is active
    #[arg(long, env, default_value_t = 0)]
    pub activation_blob_count: i64,

    /// Blobs requested per listing page (1-5000)
    #[arg(long, env, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Stop counting at this many blobs, 0 counts everything
    #[arg(long, env, default_value_t = DEFAULT_MAX_COUNT)]
    pub max_count: u64,

    /// HTTP timeout in seconds
    #[arg(long, env, default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blob_container_name: env::var("BLOB_CONTAINER_NAME").unwrap_or_default(),
            blob_prefix: env::var("BLOB_PREFIX").ok(),
            blob_delimiter: env::var("BLOB_DELIMITER").unwrap_or_else(|_| "/".to_string()),
            connection: env::var("AZURE_STORAGE_CONNECTION_STRING").ok(),
            account_name: env::var("ACCOUNT_NAME").ok(),
            endpoint_suffix: env::var("ENDPOINT_SUFFIX").ok(),
            cloud: env::var("CLOUD").ok(),
            pod_identity: env::var("POD_IDENTITY").unwrap_or_else(|_| "none".to_string()),
            identity_id: env::var("IDENTITY_ID").ok(),
            metric_type: env::var("METRIC_TYPE").ok(),
            metric_name: env::var("METRIC_NAME").ok(),
            scaler_index: env::var("SCALER_INDEX")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            blob_count: env::var("BLOB_COUNT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            activation_blob_count: env::var("ACTIVATION_BLOB_COUNT")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            page_size: env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
            max_count: env::var("MAX_COUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_COUNT),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    /// Scaler configuration equivalent to a trigger with these settings
    pub fn scaler_config(&self) -> Result<ScalerConfig, ScalerError> {
        let mut metadata = HashMap::new();
        let mut set = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                metadata.insert(key.to_string(), value);
            }
        };

        set("blobContainerName", Some(self.blob_container_name.clone()));
        set("blobPrefix", self.blob_prefix.clone());
        set("blobDelimiter", Some(self.blob_delimiter.clone()));
        set("blobCount", Some(self.blob_count.to_string()));
        set("activationBlobCount", Some(self.activation_blob_count.to_string()));
        set("accountName", self.account_name.clone());
        set("endpointSuffix", self.endpoint_suffix.clone());
        set("cloud", self.cloud.clone());
        set("metricName", self.metric_name.clone());

        let mut auth_params = HashMap::new();
        if let Some(connection) = &self.connection {
            auth_params.insert("connection".to_string(), connection.clone());
        }

        let metric_type = self
            .metric_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.trim().parse::<MetricTargetType>())
            .transpose()?;

        Ok(ScalerConfig {
            trigger_metadata: metadata,
            auth_params,
            global_http_timeout: Some(self.http_timeout()),
            scaler_index: self.scaler_index,
            metric_type,
            ..Default::default()
        })
    }

    pub fn pod_identity(&self) -> Result<PodIdentity, UnknownPodIdentityProvider> {
        Ok(PodIdentity {
            provider: self.pod_identity.parse::<PodIdentityProvider>()?,
            identity_id: self.identity_id.clone().filter(|id| !id.is_empty()),
        })
    }

    pub fn list_options(&self) -> ListOptions {
        ListOptions {
            page_size: self.page_size,
            max_count: (self.max_count > 0).then_some(self.max_count),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
