//! List Blobs requests and responses

use crate::error::BlobError;
use reqwest::Url;
use serde::Deserialize;

/// Largest page the blob service returns
pub const DEFAULT_PAGE_SIZE: u32 = 5000;

/// Default ceiling on counted blobs, ten full pages
pub const DEFAULT_MAX_COUNT: u64 = 50_000;

/// Bounds on a single listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// `maxresults` sent with each page request
    pub page_size: u32,
    /// Stop paginating once this many blobs were counted, `None` lists everything
    pub max_count: Option<u64>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_count: Some(DEFAULT_MAX_COUNT),
        }
    }
}

impl ListOptions {
    /// Page size for the next request given how many blobs were already counted
    pub(crate) fn next_page_size(&self, counted: u64) -> u32 {
        let page_size = self.page_size.clamp(1, DEFAULT_PAGE_SIZE);
        match self.max_count {
            Some(max) => {
                let remaining = max.saturating_sub(counted).max(1);
                u32::try_from(remaining).map_or(page_size, |r| r.min(page_size))
            }
            None => page_size,
        }
    }
}

/// One page of a hierarchical blob listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBlobsPage {
    pub blob_names: Vec<String>,
    /// Virtual directories returned when a delimiter is set; not counted as blobs
    pub prefixes: Vec<String>,
    pub next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: BlobsSegment,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobsSegment {
    #[serde(rename = "Blob", default)]
    blobs: Vec<NamedEntry>,
    #[serde(rename = "BlobPrefix", default)]
    prefixes: Vec<NamedEntry>,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    #[serde(rename = "Name")]
    name: String,
}

impl ListBlobsPage {
    pub fn parse(xml: &str) -> Result<Self, BlobError> {
        let results: EnumerationResults =
            quick_xml::de::from_str(xml).map_err(|e| BlobError::Backend {
                message: format!("Malformed List Blobs response: {}", e),
                status: None,
                source: None,
            })?;

        Ok(Self {
            blob_names: results.blobs.blobs.into_iter().map(|b| b.name).collect(),
            prefixes: results.blobs.prefixes.into_iter().map(|p| p.name).collect(),
            next_marker: results
                .next_marker
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        })
    }
}

/// URL of one List Blobs page
pub(crate) fn list_blobs_url(
    endpoint: &str,
    container: &str,
    prefix: Option<&str>,
    delimiter: Option<&str>,
    page_size: u32,
    marker: Option<&str>,
) -> Result<Url, BlobError> {
    let mut url = Url::parse(&format!("{}/{}", endpoint.trim_end_matches('/'), container))
        .map_err(|e| BlobError::parse(format!("invalid blob endpoint '{}': {}", endpoint, e)))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("restype", "container");
        query.append_pair("comp", "list");
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            query.append_pair("prefix", prefix);
        }
        if let Some(delimiter) = delimiter.filter(|d| !d.is_empty()) {
            query.append_pair("delimiter", delimiter);
        }
        query.append_pair("maxresults", &page_size.to_string());
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acct.blob.core.windows.net/" ContainerName="images">
  <Prefix>2024/</Prefix>
  <MaxResults>5000</MaxResults>
  <Delimiter>/</Delimiter>
  <Blobs>
    <Blob><Name>2024/a.png</Name><Properties><Content-Length>10</Content-Length></Properties></Blob>
    <BlobPrefix><Name>2024/raw/</Name></BlobPrefix>
    <Blob><Name>2024/b.png</Name><Properties><Content-Length>12</Content-Length></Properties></Blob>
  </Blobs>
  <NextMarker>2!72!MDAwMDA</NextMarker>
</EnumerationResults>"#;

    #[test]
    fn test_parse_page() {
        let page = ListBlobsPage::parse(PAGE).unwrap();

        assert_eq!(page.blob_names, vec!["2024/a.png", "2024/b.png"]);
        assert_eq!(page.prefixes, vec!["2024/raw/"]);
        assert_eq!(page.next_marker.as_deref(), Some("2!72!MDAwMDA"));
    }

    #[test]
    fn test_parse_last_page() {
        let page = ListBlobsPage::parse(
            r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ContainerName="images"><Blobs /><NextMarker /></EnumerationResults>"#,
        )
        .unwrap();

        assert!(page.blob_names.is_empty());
        assert_eq!(page.next_marker, None);
    }

    #[test]
    fn test_parse_garbage_is_backend_error() {
        let err = ListBlobsPage::parse("<EnumerationResults><Blobs><Blob><Name>a").unwrap_err();
        assert!(matches!(err, BlobError::Backend { .. }));
    }

    #[test]
    fn test_list_url() {
        let url = list_blobs_url(
            "https://acct.blob.core.windows.net/",
            "images",
            Some("2024/"),
            Some("/"),
            100,
            Some("2!72!MDAwMDA"),
        )
        .unwrap();

        assert_eq!(url.path(), "/images");
        assert_eq!(
            url.query(),
            Some("restype=container&comp=list&prefix=2024%2F&delimiter=%2F&maxresults=100&marker=2%2172%21MDAwMDA")
        );
    }

    #[test]
    fn test_next_page_size_respects_max_count() {
        let options = ListOptions {
            page_size: 5000,
            max_count: Some(120),
        };
        assert_eq!(options.next_page_size(0), 120);
        assert_eq!(options.next_page_size(100), 20);

        let unbounded = ListOptions {
            page_size: 10_000,
            max_count: None,
        };
        assert_eq!(unbounded.next_page_size(1_000_000), DEFAULT_PAGE_SIZE);
    }
}
