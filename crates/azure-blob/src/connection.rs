//! Storage account connection strings
//!
//! `DefaultEndpointsProtocol=https;AccountName=...;AccountKey=...;EndpointSuffix=core.windows.net`
//! is the common form. `BlobEndpoint` overrides the derived endpoint (Azurite, private
//! endpoints) and `SharedAccessSignature` replaces the account key.

use crate::error::BlobError;
use std::str::FromStr;

pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
pub const DEFAULT_PROTOCOL: &str = "https";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageConnectionString {
    pub protocol: Option<String>,
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub blob_endpoint: Option<String>,
    pub shared_access_signature: Option<String>,
}

impl StorageConnectionString {
    pub fn parse(raw: &str) -> Result<Self, BlobError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BlobError::parse("connection string is empty"));
        }

        let mut parsed = StorageConnectionString::default();

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                BlobError::parse(format!(
                    "segment '{}' is not a key=value pair",
                    segment_name(segment)
                ))
            })?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => parsed.protocol = Some(value),
                "accountname" => parsed.account_name = Some(value),
                "accountkey" => parsed.account_key = Some(value),
                "endpointsuffix" => parsed.endpoint_suffix = Some(value),
                "blobendpoint" => parsed.blob_endpoint = Some(value),
                "sharedaccesssignature" => parsed.shared_access_signature = Some(value),
                // Queue/table/file endpoints and friends are irrelevant for blob listing
                _ => {}
            }
        }

        if parsed.account_key.is_none() && parsed.shared_access_signature.is_none() {
            return Err(BlobError::parse(
                "connection string has neither AccountKey nor SharedAccessSignature",
            ));
        }

        if parsed.account_key.is_some() && parsed.account_name.is_none() {
            return Err(BlobError::parse("AccountKey given without AccountName"));
        }

        if parsed.account_name.is_none() && parsed.blob_endpoint.is_none() {
            return Err(BlobError::parse(
                "connection string has neither AccountName nor BlobEndpoint",
            ));
        }

        Ok(parsed)
    }

    /// Blob service endpoint, without a trailing slash
    pub fn blob_endpoint(&self) -> Result<String, BlobError> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        let account = self
            .account_name
            .as_deref()
            .ok_or_else(|| BlobError::parse("connection string has no AccountName"))?;

        Ok(blob_endpoint_for(
            self.protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
            account,
            self.endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX),
        ))
    }
}

impl FromStr for StorageConnectionString {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn blob_endpoint_for(protocol: &str, account_name: &str, endpoint_suffix: &str) -> String {
    format!("{}://{}.blob.{}", protocol, account_name, endpoint_suffix)
}

// Keep key material out of error messages
fn segment_name(segment: &str) -> &str {
    if segment.len() > 32 {
        "<redacted>"
    } else {
        segment
    }
}
