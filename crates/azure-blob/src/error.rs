use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Failed to parse storage connection string: {message}")]
    ConnectionStringParse { message: String },

    #[error("Invalid storage account key: {message}")]
    KeyDecode { message: String },

    #[error("Blob storage request failed: {message}")]
    Backend {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Azure identity token request failed: {message}")]
    Identity { message: String },

    #[error("Blob listing cancelled")]
    Cancelled,
}

/// Stable classification of a probe failure, used for logging and error counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeErrorKind {
    ConnectionStringParse,
    KeyDecode,
    Backend,
    Identity,
    Cancelled,
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::ConnectionStringParse => "connection_string_parse",
            ProbeErrorKind::KeyDecode => "key_decode",
            ProbeErrorKind::Backend => "backend",
            ProbeErrorKind::Identity => "identity",
            ProbeErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BlobError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            BlobError::ConnectionStringParse { .. } => ProbeErrorKind::ConnectionStringParse,
            BlobError::KeyDecode { .. } => ProbeErrorKind::KeyDecode,
            BlobError::Backend { .. } => ProbeErrorKind::Backend,
            BlobError::Identity { .. } => ProbeErrorKind::Identity,
            BlobError::Cancelled => ProbeErrorKind::Cancelled,
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        BlobError::ConnectionStringParse {
            message: message.into(),
        }
    }

    pub(crate) fn request(message: impl Into<String>, source: reqwest::Error) -> Self {
        BlobError::Backend {
            message: message.into(),
            status: source.status().map(|s| s.as_u16()),
            source: Some(source),
        }
    }

    pub(crate) fn status(message: impl Into<String>, status: u16) -> Self {
        BlobError::Backend {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }
}
