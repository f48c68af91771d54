//! Blob count probe
//!
//! Counts the blobs in a container (optionally under a prefix) by following the listing's
//! continuation markers. The count is all or nothing: a failure on any page discards what
//! was counted so far. There are no retries here; the next polling tick retries.

use crate::credential::{BlobService, PodIdentity};
use crate::error::BlobError;
use crate::list::{list_blobs_url, ListBlobsPage, ListOptions};
use reqwest::Client;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where to count: container, optional prefix/delimiter, and the account coordinates
/// used when authenticating through an Azure identity instead of a connection string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerLocation {
    pub container_name: String,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub account_name: Option<String>,
    pub endpoint_suffix: Option<String>,
}

impl ContainerLocation {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            ..Default::default()
        }
    }
}

/// Uniform probe result: `length` is `-1` exactly when `error` is set
#[derive(Debug)]
pub struct ProbeOutcome {
    pub length: i64,
    pub error: Option<BlobError>,
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Result<u64, BlobError>> for ProbeOutcome {
    fn from(result: Result<u64, BlobError>) -> Self {
        match result {
            Ok(count) => Self {
                length: i64::try_from(count).unwrap_or(i64::MAX),
                error: None,
            },
            Err(error) => Self {
                length: -1,
                error: Some(error),
            },
        }
    }
}

/// Probe for one scaler instance. Authentication is resolved when the probe is built
/// and reused for every call.
#[derive(Debug, Clone)]
pub struct BlobLengthProbe {
    client: Client,
    service: BlobService,
    location: ContainerLocation,
    options: ListOptions,
}

impl BlobLengthProbe {
    pub fn new(
        client: Client,
        pod_identity: &PodIdentity,
        connection_string: &str,
        location: ContainerLocation,
        options: ListOptions,
    ) -> Result<Self, BlobError> {
        let service = BlobService::resolve(pod_identity, connection_string, &location)?;
        Ok(Self::with_service(client, service, location, options))
    }

    pub fn with_service(
        client: Client,
        service: BlobService,
        location: ContainerLocation,
        options: ListOptions,
    ) -> Self {
        Self {
            client,
            service,
            location,
            options,
        }
    }

    pub fn location(&self) -> &ContainerLocation {
        &self.location
    }

    /// Count matching blobs, aborting promptly when `cancel` fires
    pub async fn list_length(&self, cancel: &CancellationToken) -> Result<u64, BlobError> {
        if cancel.is_cancelled() {
            return Err(BlobError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BlobError::Cancelled),
            result = self.count_blobs() => result,
        }
    }

    /// Count matching blobs and collapse the result into a [`ProbeOutcome`]
    pub async fn probe(&self, cancel: &CancellationToken) -> ProbeOutcome {
        let started = Instant::now();
        let outcome = ProbeOutcome::from(self.list_length(cancel).await);

        match &outcome.error {
            None => info!(
                container = %self.location.container_name,
                length = outcome.length,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Counted blobs"
            ),
            Some(e) => warn!(
                container = %self.location.container_name,
                error_kind = %e.kind(),
                error = %e,
                "Blob count probe failed"
            ),
        }

        outcome
    }

    async fn count_blobs(&self) -> Result<u64, BlobError> {
        let container = self.location.container_name.as_str();
        let auth = self.service.credential.request_auth(&self.client).await?;

        let mut counted: u64 = 0;
        let mut pages: u32 = 0;
        let mut marker: Option<String> = None;

        loop {
            let url = list_blobs_url(
                &self.service.endpoint,
                container,
                self.location.prefix.as_deref(),
                self.location.delimiter.as_deref(),
                self.options.next_page_size(counted),
                marker.as_deref(),
            )?;

            let response = auth
                .get(&self.client, url)?
                .send()
                .await
                .map_err(|e| {
                    BlobError::request(format!("listing container {} failed", container), e)
                })?;

            let status = response.status();
            if !status.is_success() {
                let error_code = response
                    .headers()
                    .get("x-ms-error-code")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown")
                    .to_string();
                return Err(BlobError::status(
                    format!(
                        "listing container {} returned {} ({})",
                        container, status, error_code
                    ),
                    status.as_u16(),
                ));
            }

            let body = response.text().await.map_err(|e| {
                BlobError::request(format!("reading listing of container {} failed", container), e)
            })?;
            let page = ListBlobsPage::parse(&body)?;

            pages += 1;
            counted += page.blob_names.len() as u64;

            debug!(
                container = %container,
                page = pages,
                page_blobs = page.blob_names.len(),
                page_prefixes = page.prefixes.len(),
                counted = counted,
                "Listed blob page"
            );

            if let Some(max) = self.options.max_count {
                if counted >= max {
                    debug!(container = %container, max_count = max, "Reached maximum blob count");
                    return Ok(max);
                }
            }

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => return Ok(counted),
            }
        }
    }
}

/// One-shot form: resolve authentication, count, and collapse into a [`ProbeOutcome`]
pub async fn get_blob_list_length(
    cancel: &CancellationToken,
    client: &Client,
    pod_identity: &PodIdentity,
    connection_string: &str,
    location: &ContainerLocation,
    options: ListOptions,
) -> ProbeOutcome {
    match BlobLengthProbe::new(
        client.clone(),
        pod_identity,
        connection_string,
        location.clone(),
        options,
    ) {
        Ok(probe) => probe.probe(cancel).await,
        Err(e) => {
            warn!(
                container = %location.container_name,
                error_kind = %e.kind(),
                error = %e,
                "Blob count probe could not authenticate"
            );
            ProbeOutcome::from(Err(e))
        }
    }
}
