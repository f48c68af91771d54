//! Bearer tokens for storage access through Azure identities
//!
//! Two sources are supported: the instance metadata service (pod identity / managed
//! identity) and workload identity federation, which exchanges the projected service
//! account token for an Azure AD access token. One token is requested per probe call.

use crate::error::BlobError;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use tracing::debug;

pub const STORAGE_RESOURCE: &str = "https://storage.azure.com/";
pub const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

const IMDS_API_VERSION: &str = "2018-02-01";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    InstanceMetadata {
        endpoint: String,
        client_id: Option<String>,
    },
    WorkloadIdentity(WorkloadIdentitySettings),
}

/// Settings injected by the workload identity webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadIdentitySettings {
    pub authority_host: String,
    pub tenant_id: String,
    pub client_id: String,
    pub federated_token_file: PathBuf,
}

impl WorkloadIdentitySettings {
    /// Read `AZURE_*` variables; `identity_id` overrides `AZURE_CLIENT_ID`
    pub fn from_env(identity_id: Option<&str>) -> Result<Self, BlobError> {
        Self::from_lookup(identity_id, |name| env::var(name).ok())
    }

    pub fn from_lookup<F>(identity_id: Option<&str>, lookup: F) -> Result<Self, BlobError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BlobError::Identity {
                    message: format!("{} is not set, is workload identity enabled for the pod?", name),
                })
        };

        let client_id = match identity_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => required("AZURE_CLIENT_ID")?,
        };

        Ok(Self {
            authority_host: lookup("AZURE_AUTHORITY_HOST")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            tenant_id: required("AZURE_TENANT_ID")?,
            client_id,
            federated_token_file: PathBuf::from(required("AZURE_FEDERATED_TOKEN_FILE")?),
        })
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl TokenSource {
    pub fn instance_metadata(client_id: Option<String>) -> Self {
        TokenSource::InstanceMetadata {
            endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            client_id,
        }
    }

    pub async fn fetch_token(&self, client: &Client) -> Result<String, BlobError> {
        match self {
            TokenSource::InstanceMetadata {
                endpoint,
                client_id,
            } => fetch_imds_token(client, endpoint, client_id.as_deref()).await,
            TokenSource::WorkloadIdentity(settings) => {
                fetch_workload_identity_token(client, settings).await
            }
        }
    }
}

async fn fetch_imds_token(
    client: &Client,
    endpoint: &str,
    client_id: Option<&str>,
) -> Result<String, BlobError> {
    let url = format!("{}/metadata/identity/oauth2/token", endpoint.trim_end_matches('/'));
    debug!(endpoint = %endpoint, "Requesting storage token from instance metadata service");

    let mut query = vec![
        ("api-version", IMDS_API_VERSION),
        ("resource", STORAGE_RESOURCE),
    ];
    if let Some(id) = client_id {
        query.push(("client_id", id));
    }

    let request = client.get(&url).header("Metadata", "true").query(&query);
    read_token(request).await
}

async fn fetch_workload_identity_token(
    client: &Client,
    settings: &WorkloadIdentitySettings,
) -> Result<String, BlobError> {
    let assertion = tokio::fs::read_to_string(&settings.federated_token_file)
        .await
        .map_err(|e| BlobError::Identity {
            message: format!(
                "Failed to read federated token file {}: {}",
                settings.federated_token_file.display(),
                e
            ),
        })?;

    debug!(
        tenant_id = %settings.tenant_id,
        client_id = %settings.client_id,
        "Exchanging federated token for storage token"
    );

    let form = [
        ("client_id", settings.client_id.as_str()),
        ("scope", STORAGE_SCOPE),
        ("client_assertion_type", CLIENT_ASSERTION_TYPE),
        ("client_assertion", assertion.trim()),
        ("grant_type", "client_credentials"),
    ];

    let request = client.post(settings.token_url()).form(&form);
    read_token(request).await
}

async fn read_token(request: reqwest::RequestBuilder) -> Result<String, BlobError> {
    let response = request.send().await.map_err(|e| BlobError::Identity {
        message: format!("HTTP request failed: {}", e),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read body>".to_string());
        return Err(BlobError::Identity {
            message: format!("token endpoint returned {}: {}", status, body),
        });
    }

    let token: TokenResponse = response.json().await.map_err(|e| BlobError::Identity {
        message: format!("Failed to parse token response: {}", e),
    })?;

    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = WorkloadIdentitySettings::from_lookup(
            None,
            lookup(&[
                ("AZURE_CLIENT_ID", "client"),
                ("AZURE_TENANT_ID", "tenant"),
                ("AZURE_FEDERATED_TOKEN_FILE", "/var/run/secrets/token"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.client_id, "client");
        assert_eq!(settings.authority_host, DEFAULT_AUTHORITY_HOST);
        assert_eq!(
            settings.token_url(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_identity_id_overrides_client_id() {
        let settings = WorkloadIdentitySettings::from_lookup(
            Some("user-assigned"),
            lookup(&[
                ("AZURE_TENANT_ID", "tenant"),
                ("AZURE_FEDERATED_TOKEN_FILE", "/token"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.client_id, "user-assigned");
    }

    #[test]
    fn test_missing_tenant_is_identity_error() {
        let err = WorkloadIdentitySettings::from_lookup(
            None,
            lookup(&[("AZURE_CLIENT_ID", "client")]),
        )
        .unwrap_err();

        assert!(err.to_string().contains("AZURE_TENANT_ID"));
        assert!(matches!(err, BlobError::Identity { .. }));
    }
}
