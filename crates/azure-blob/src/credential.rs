//! Credential resolution and request authorization for the blob service
//!
//! The authentication mode is settled once, when a probe is built. Listing code only asks
//! the resolved credential to authorize each page request and never looks at the mode.

use crate::connection::{
    blob_endpoint_for, StorageConnectionString, DEFAULT_ENDPOINT_SUFFIX, DEFAULT_PROTOCOL,
};
use crate::error::BlobError;
use crate::identity::{TokenSource, WorkloadIdentitySettings};
use crate::probe::ContainerLocation;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

pub const STORAGE_API_VERSION: &str = "2021-08-06";

const MS_DATE: &str = "x-ms-date";
const MS_VERSION: &str = "x-ms-version";

/// Headers that make up the fixed part of a Shared Key string-to-sign, in order
const SIGNED_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Pod identity provider configured on the scaled object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodIdentityProvider {
    #[default]
    None,
    Azure,
    AzureWorkload,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown pod identity provider '{0}', expected 'none', 'azure' or 'azure-workload'")]
pub struct UnknownPodIdentityProvider(pub String);

impl FromStr for PodIdentityProvider {
    type Err = UnknownPodIdentityProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(PodIdentityProvider::None),
            "azure" => Ok(PodIdentityProvider::Azure),
            "azure-workload" => Ok(PodIdentityProvider::AzureWorkload),
            other => Err(UnknownPodIdentityProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PodIdentity {
    pub provider: PodIdentityProvider,
    /// Client id of a user-assigned identity
    pub identity_id: Option<String>,
}

impl PodIdentity {
    pub fn new(provider: PodIdentityProvider) -> Self {
        Self {
            provider,
            identity_id: None,
        }
    }

    pub fn uses_azure_identity(&self) -> bool {
        self.provider != PodIdentityProvider::None
    }
}

/// Account name and decoded key for Shared Key authorization
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    key: Vec<u8>,
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeyCredential {
    pub fn new(account_name: impl Into<String>, encoded_key: &str) -> Result<Self, BlobError> {
        let key = STANDARD
            .decode(encoded_key.trim())
            .map_err(|e| BlobError::KeyDecode {
                message: format!("illegal base64 data in account key: {}", e),
            })?;

        Ok(Self {
            account_name: account_name.into(),
            key,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn sign(&self, string_to_sign: &str) -> Result<String, BlobError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).map_err(|e| BlobError::KeyDecode {
            message: format!("account key rejected by HMAC: {}", e),
        })?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn authorization(&self, method: &Method, url: &Url, headers: &HeaderMap) -> Result<String, BlobError> {
        let signature = self.sign(&string_to_sign(method, url, headers, &self.account_name))?;
        Ok(format!("SharedKey {}:{}", self.account_name, signature))
    }
}

/// Shared Key string-to-sign for the blob service
pub fn string_to_sign(method: &Method, url: &Url, headers: &HeaderMap, account_name: &str) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };

    let mut out = format!("{}\n", method.as_str());
    for name in SIGNED_HEADERS {
        let value = header(name);
        // A zero content length is signed as empty
        if name == "content-length" && value == "0" {
            out.push('\n');
        } else {
            out.push_str(value);
            out.push('\n');
        }
    }

    let mut ms_headers: Vec<(String, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .map(|(name, value)| (name.as_str().to_string(), value.to_str().unwrap_or("").trim()))
        .collect();
    ms_headers.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in ms_headers {
        out.push_str(&format!("{}:{}\n", name, value));
    }

    out.push_str(&canonicalized_resource(url, account_name));
    out
}

fn canonicalized_resource(url: &Url, account_name: &str) -> String {
    let mut resource = format!("/{}{}", account_name, url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }

    for (name, mut values) in params {
        values.sort();
        resource.push_str(&format!("\n{}:{}", name, values.join(",")));
    }

    resource
}

/// How requests against the blob service are authorized
#[derive(Debug, Clone)]
pub enum BlobCredential {
    SharedKey(SharedKeyCredential),
    /// Shared access signature query string, without the leading `?`
    Sas(String),
    Bearer(TokenSource),
}

/// Blob service endpoint together with the credential used against it
#[derive(Debug, Clone)]
pub struct BlobService {
    pub endpoint: String,
    pub credential: BlobCredential,
}

impl BlobService {
    pub fn new(endpoint: impl Into<String>, credential: BlobCredential) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential,
        }
    }

    /// Settle endpoint and credential from static configuration.
    ///
    /// A non-empty connection string always wins. Without one, an Azure pod identity
    /// provider and an explicit account name are required.
    pub fn resolve(
        pod_identity: &PodIdentity,
        connection_string: &str,
        location: &ContainerLocation,
    ) -> Result<Self, BlobError> {
        if !connection_string.trim().is_empty() || !pod_identity.uses_azure_identity() {
            return Self::from_connection_string(connection_string);
        }

        let account_name = location
            .account_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                BlobError::parse("connection string is empty and no account name was given for identity authentication")
            })?;
        let endpoint_suffix = location
            .endpoint_suffix
            .as_deref()
            .filter(|suffix| !suffix.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);

        let source = match pod_identity.provider {
            PodIdentityProvider::AzureWorkload => TokenSource::WorkloadIdentity(
                WorkloadIdentitySettings::from_env(pod_identity.identity_id.as_deref())?,
            ),
            _ => TokenSource::instance_metadata(pod_identity.identity_id.clone()),
        };

        debug!(
            account_name = %account_name,
            provider = ?pod_identity.provider,
            "Using identity based blob authentication"
        );

        Ok(Self::new(
            blob_endpoint_for(DEFAULT_PROTOCOL, account_name, endpoint_suffix),
            BlobCredential::Bearer(source),
        ))
    }

    pub fn from_connection_string(connection_string: &str) -> Result<Self, BlobError> {
        let parsed = StorageConnectionString::parse(connection_string)?;
        let endpoint = parsed.blob_endpoint()?;

        let credential = match (&parsed.account_key, &parsed.shared_access_signature) {
            (Some(key), _) => {
                let account = parsed
                    .account_name
                    .clone()
                    .ok_or_else(|| BlobError::parse("AccountKey given without AccountName"))?;
                BlobCredential::SharedKey(SharedKeyCredential::new(account, key)?)
            }
            (None, Some(sas)) => BlobCredential::Sas(sas.trim_start_matches('?').to_string()),
            (None, None) => {
                return Err(BlobError::parse(
                    "connection string has neither AccountKey nor SharedAccessSignature",
                ))
            }
        };

        Ok(Self::new(endpoint, credential))
    }
}

/// Credential material ready to apply to the requests of one probe call
pub(crate) enum RequestAuth<'a> {
    SharedKey(&'a SharedKeyCredential),
    Sas(&'a str),
    Bearer(String),
}

impl BlobCredential {
    /// Fetch whatever the credential needs up front, at most one token per call
    pub(crate) async fn request_auth(&self, client: &Client) -> Result<RequestAuth<'_>, BlobError> {
        Ok(match self {
            BlobCredential::SharedKey(key) => RequestAuth::SharedKey(key),
            BlobCredential::Sas(sas) => RequestAuth::Sas(sas),
            BlobCredential::Bearer(source) => RequestAuth::Bearer(source.fetch_token(client).await?),
        })
    }
}

impl RequestAuth<'_> {
    pub(crate) fn get(&self, client: &Client, mut url: Url) -> Result<RequestBuilder, BlobError> {
        let mut headers = HeaderMap::new();
        headers.insert(MS_DATE, header_value(&rfc1123_now())?);
        headers.insert(MS_VERSION, HeaderValue::from_static(STORAGE_API_VERSION));

        match self {
            RequestAuth::SharedKey(key) => {
                let authorization = key.authorization(&Method::GET, &url, &headers)?;
                headers.insert(AUTHORIZATION, header_value(&authorization)?);
            }
            RequestAuth::Sas(sas) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, sas),
                    _ => sas.to_string(),
                };
                url.set_query(Some(&query));
            }
            RequestAuth::Bearer(token) => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
            }
        }

        Ok(client.get(url).headers(headers))
    }
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> Result<HeaderValue, BlobError> {
    HeaderValue::from_str(value)
        .map_err(|_| BlobError::parse("credential contains characters not allowed in HTTP headers"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(MS_DATE, HeaderValue::from_static("Mon, 01 Jan 2024 00:00:00 GMT"));
        headers.insert(MS_VERSION, HeaderValue::from_static(STORAGE_API_VERSION));
        headers
    }

    fn list_url() -> Url {
        Url::parse(
            "https://myaccount.blob.core.windows.net/images?restype=container&comp=list&prefix=2024%2F&maxresults=5000",
        )
        .unwrap()
    }

    #[test]
    fn test_string_to_sign_for_listing() {
        let expected = "GET\n\n\n\n\n\n\n\n\n\n\n\n\
            x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
            x-ms-version:2021-08-06\n\
            /myaccount/images\n\
            comp:list\n\
            maxresults:5000\n\
            prefix:2024/\n\
            restype:container";

        assert_eq!(
            string_to_sign(&Method::GET, &list_url(), &signed_headers(), "myaccount"),
            expected
        );
    }

    #[test]
    fn test_shared_key_signature() {
        let credential = SharedKeyCredential::new("myaccount", "a2V5").unwrap();
        let to_sign = string_to_sign(&Method::GET, &list_url(), &signed_headers(), "myaccount");

        assert_eq!(
            credential.sign(&to_sign).unwrap(),
            "IOOG3W+tnbL0Hjdm5Rz7MleMrUPzGZl/Trp+FGbKJHc="
        );
    }

    #[test]
    fn test_invalid_key_is_key_decode_error() {
        let err = SharedKeyCredential::new("name", "key==").unwrap_err();
        assert!(matches!(err, BlobError::KeyDecode { .. }));
        assert!(err.to_string().contains("illegal base64"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let credential = SharedKeyCredential::new("myaccount", "a2V5").unwrap();
        let printed = format!("{:?}", credential);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("107"));
    }

    #[test]
    fn test_pod_identity_provider_from_str() {
        assert_eq!("".parse::<PodIdentityProvider>().unwrap(), PodIdentityProvider::None);
        assert_eq!(
            "azure-workload".parse::<PodIdentityProvider>().unwrap(),
            PodIdentityProvider::AzureWorkload
        );
        assert!("aws".parse::<PodIdentityProvider>().is_err());
    }

    #[test]
    fn test_resolve_empty_connection_without_identity() {
        let err = BlobService::resolve(&PodIdentity::default(), "", &ContainerLocation::new("c"))
            .unwrap_err();
        assert!(matches!(err, BlobError::ConnectionStringParse { .. }));
    }

    #[test]
    fn test_resolve_identity_requires_account_name() {
        let err = BlobService::resolve(
            &PodIdentity::new(PodIdentityProvider::Azure),
            "",
            &ContainerLocation::new("c"),
        )
        .unwrap_err();
        assert!(matches!(err, BlobError::ConnectionStringParse { .. }));
    }

    #[test]
    fn test_resolve_pod_identity_endpoint() {
        let location = ContainerLocation {
            account_name: Some("acct".to_string()),
            endpoint_suffix: Some("core.chinacloudapi.cn".to_string()),
            ..ContainerLocation::new("c")
        };

        let service =
            BlobService::resolve(&PodIdentity::new(PodIdentityProvider::Azure), "", &location)
                .unwrap();

        assert_eq!(service.endpoint, "https://acct.blob.core.chinacloudapi.cn");
        assert!(matches!(
            service.credential,
            BlobCredential::Bearer(TokenSource::InstanceMetadata { .. })
        ));
    }

    #[test]
    fn test_connection_string_wins_over_identity() {
        let service = BlobService::resolve(
            &PodIdentity::new(PodIdentityProvider::Azure),
            "AccountName=acct;AccountKey=a2V5",
            &ContainerLocation::new("c"),
        )
        .unwrap();

        assert!(matches!(service.credential, BlobCredential::SharedKey(_)));
    }

    #[test]
    fn test_sas_query_is_appended() {
        let client = Client::new();
        let auth = RequestAuth::Sas("sv=2021-08-06&sig=abc%3D");
        let request = auth.get(&client, list_url()).unwrap().build().unwrap();

        let query = request.url().query().unwrap();
        assert!(query.starts_with("restype=container&comp=list"));
        assert!(query.ends_with("&sv=2021-08-06&sig=abc%3D"));
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
