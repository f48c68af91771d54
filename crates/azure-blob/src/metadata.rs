//! Azure Blob trigger metadata

use crate::connection::DEFAULT_ENDPOINT_SUFFIX;
use crate::credential::PodIdentity;
use crate::probe::ContainerLocation;
use scalers::{generate_metric_name_with_index, normalize_metric_name, ScalerConfig, ScalerError};

pub const DEFAULT_TARGET_BLOB_COUNT: i64 = 5;
pub const DEFAULT_ACTIVATION_BLOB_COUNT: i64 = 0;
pub const DEFAULT_BLOB_DELIMITER: &str = "/";

/// Parsed trigger metadata for one Azure Blob scaler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    pub target_blob_count: i64,
    pub activation_blob_count: i64,
    /// Storage connection string, empty when an Azure identity is used
    pub connection: String,
    pub location: ContainerLocation,
    /// Indexed metric name, `s<index>-azure-blob-<container>` unless overridden
    pub metric_name: String,
    pub scaler_index: usize,
}

impl BlobMetadata {
    pub fn parse(config: &ScalerConfig, pod_identity: &PodIdentity) -> Result<Self, ScalerError> {
        let target_blob_count = config.parse_metadata("blobCount", DEFAULT_TARGET_BLOB_COUNT)?;
        let activation_blob_count =
            config.parse_metadata("activationBlobCount", DEFAULT_ACTIVATION_BLOB_COUNT)?;

        if target_blob_count <= 0 {
            return Err(ScalerError::InvalidMetadata {
                key: "blobCount".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let container_name = config.required_metadata("blobContainerName")?.to_string();
        let delimiter = config
            .metadata("blobDelimiter")
            .unwrap_or(DEFAULT_BLOB_DELIMITER)
            .to_string();
        // Listing a "directory" means listing everything under `<prefix><delimiter>`
        let prefix = config
            .metadata("blobPrefix")
            .map(|prefix| format!("{}{}", prefix, delimiter));

        let endpoint_suffix = match config.metadata("endpointSuffix") {
            Some(suffix) => suffix.to_string(),
            None => endpoint_suffix_for_cloud(config.metadata("cloud"))?,
        };

        let connection = config
            .auth_param_or_env("connection", "connection")
            .unwrap_or_default()
            .to_string();
        let account_name = config
            .metadata("accountName")
            .or_else(|| config.metadata_from_env("accountName"))
            .map(str::to_string);

        if connection.is_empty() {
            if !pod_identity.uses_azure_identity() {
                return Err(ScalerError::MissingMetadata {
                    key: "connection".to_string(),
                });
            }
            if account_name.is_none() {
                return Err(ScalerError::MissingMetadata {
                    key: "accountName".to_string(),
                });
            }
        }

        let base_name = match config.metadata("metricName") {
            Some(name) => normalize_metric_name(name),
            None => normalize_metric_name(&format!("azure-blob-{}", container_name)),
        };

        Ok(Self {
            target_blob_count,
            activation_blob_count,
            connection,
            location: ContainerLocation {
                container_name,
                prefix,
                delimiter: Some(delimiter),
                account_name,
                endpoint_suffix: Some(endpoint_suffix),
            },
            metric_name: generate_metric_name_with_index(config.scaler_index, &base_name),
            scaler_index: config.scaler_index,
        })
    }
}

/// Storage endpoint suffix for a named Azure cloud
pub fn endpoint_suffix_for_cloud(cloud: Option<&str>) -> Result<String, ScalerError> {
    let suffix = match cloud.map(str::to_ascii_lowercase).as_deref() {
        None | Some("azurepubliccloud") => DEFAULT_ENDPOINT_SUFFIX,
        Some("azureusgovernmentcloud") => "core.usgovcloudapi.net",
        Some("azurechinacloud") => "core.chinacloudapi.cn",
        Some("azuregermancloud") => "core.cloudapi.de",
        Some("private") => {
            return Err(ScalerError::MissingMetadata {
                key: "endpointSuffix".to_string(),
            })
        }
        Some(_) => {
            return Err(ScalerError::InvalidMetadata {
                key: "cloud".to_string(),
                message: format!("unknown Azure cloud '{}'", cloud.unwrap_or_default()),
            })
        }
    };
    Ok(suffix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::PodIdentityProvider;

    fn config(metadata: &[(&str, &str)]) -> ScalerConfig {
        let mut config = ScalerConfig {
            scaler_index: 1,
            ..Default::default()
        };
        for (k, v) in metadata {
            config
                .trigger_metadata
                .insert(k.to_string(), v.to_string());
        }
        config
    }

    #[test]
    fn test_parse_with_connection_from_env() {
        let mut config = config(&[
            ("blobContainerName", "images"),
            ("blobPrefix", "2024"),
            ("connectionFromEnv", "STORAGE_CONNECTION"),
        ]);
        config.resolved_env.insert(
            "STORAGE_CONNECTION".to_string(),
            "AccountName=acct;AccountKey=a2V5".to_string(),
        );

        let meta = BlobMetadata::parse(&config, &PodIdentity::default()).unwrap();

        assert_eq!(meta.target_blob_count, DEFAULT_TARGET_BLOB_COUNT);
        assert_eq!(meta.connection, "AccountName=acct;AccountKey=a2V5");
        assert_eq!(meta.location.prefix.as_deref(), Some("2024/"));
        assert_eq!(meta.location.delimiter.as_deref(), Some("/"));
        assert_eq!(meta.metric_name, "s1-azure-blob-images");
    }

    #[test]
    fn test_missing_container() {
        let err = BlobMetadata::parse(&config(&[]), &PodIdentity::default()).unwrap_err();
        assert_eq!(
            err,
            ScalerError::MissingMetadata {
                key: "blobContainerName".to_string()
            }
        );
    }

    #[test]
    fn test_missing_connection_without_identity() {
        let err = BlobMetadata::parse(
            &config(&[("blobContainerName", "images")]),
            &PodIdentity::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::MissingMetadata { ref key } if key == "connection"));
    }

    #[test]
    fn test_workload_identity_requires_account_name() {
        let identity = PodIdentity::new(PodIdentityProvider::AzureWorkload);

        let err = BlobMetadata::parse(&config(&[("blobContainerName", "images")]), &identity)
            .unwrap_err();
        assert!(matches!(err, ScalerError::MissingMetadata { ref key } if key == "accountName"));

        let meta = BlobMetadata::parse(
            &config(&[
                ("blobContainerName", "images"),
                ("accountName", "acct"),
                ("cloud", "AzureChinaCloud"),
                ("metricName", "images/daily"),
            ]),
            &identity,
        )
        .unwrap();
        assert_eq!(meta.location.account_name.as_deref(), Some("acct"));
        assert_eq!(
            meta.location.endpoint_suffix.as_deref(),
            Some("core.chinacloudapi.cn")
        );
        assert_eq!(meta.metric_name, "s1-images-daily");
    }

    #[test]
    fn test_invalid_blob_count() {
        let err = BlobMetadata::parse(
            &config(&[
                ("blobContainerName", "images"),
                ("blobCount", "0"),
            ]),
            &PodIdentity::new(PodIdentityProvider::Azure),
        )
        .unwrap_err();
        assert!(matches!(err, ScalerError::InvalidMetadata { ref key, .. } if key == "blobCount"));
    }

    #[test]
    fn test_private_cloud_needs_suffix() {
        assert!(endpoint_suffix_for_cloud(Some("Private")).is_err());
        assert!(endpoint_suffix_for_cloud(Some("Mars")).is_err());
        assert_eq!(
            endpoint_suffix_for_cloud(None).unwrap(),
            DEFAULT_ENDPOINT_SUFFIX
        );
    }
}
