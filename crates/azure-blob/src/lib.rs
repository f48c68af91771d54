//! Azure Blob Storage length probe
//!
//! Counts blobs in a storage container so a blob-backed workload can be scaled on its
//! backlog. Authentication is either a storage connection string (account key or SAS) or
//! an Azure identity (pod identity through the metadata service, or workload identity).

pub mod connection;
pub mod credential;
pub mod error;
pub mod identity;
pub mod list;
pub mod metadata;
pub mod probe;

pub use connection::StorageConnectionString;
pub use credential::{
    BlobCredential, BlobService, PodIdentity, PodIdentityProvider, SharedKeyCredential,
};
pub use error::{BlobError, ProbeErrorKind};
pub use identity::{TokenSource, WorkloadIdentitySettings};
pub use list::{ListBlobsPage, ListOptions};
pub use metadata::BlobMetadata;
pub use probe::{get_blob_list_length, BlobLengthProbe, ContainerLocation, ProbeOutcome};
