//! Error types for Box provider operations

use thiserror::Error;

/// Errors raised by path resolution and the file operations built on it.
///
/// Every variant that originates from a remote call carries the virtual
/// path the caller asked for, the HTTP status and the response body.
/// Nothing here is retried internally.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The virtual path is malformed or climbs above the base folder
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// No unique entry for the path, or the metadata call was rejected
    #[error("Could not retrieve file or directory {path} (HTTP {code})")]
    MetadataNotFound { path: String, code: u16, body: String },

    #[error("Download of {path} failed (HTTP {code}): {body}")]
    Download { path: String, code: u16, body: String },

    #[error("Upload to {path} failed (HTTP {code}): {body}")]
    Upload { path: String, code: u16, body: String },

    #[error("Delete of {path} failed (HTTP {code}): {body}")]
    Delete { path: String, code: u16, body: String },

    #[error("Listing revisions of {path} failed (HTTP {code}): {body}")]
    Revisions { path: String, code: u16, body: String },

    /// A file operation was addressed to a folder
    #[error("Not a file: {0}")]
    NotAFile(String),

    /// An upload parent resolved to something other than a folder
    #[error("Not a folder: {0}")]
    NotAFolder(String),

    /// A remote record lacks a field the provider depends on
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

impl ProviderError {
    /// True when the path does not resolve to exactly one remote entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::MetadataNotFound { code: 404, .. })
    }

    /// Remote HTTP status, if the error came from a remote response
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::MetadataNotFound { code, .. }
            | ProviderError::Download { code, .. }
            | ProviderError::Upload { code, .. }
            | ProviderError::Delete { code, .. }
            | ProviderError::Revisions { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn not_found(path: impl Into<String>, body: impl Into<String>) -> Self {
        ProviderError::MetadataNotFound {
            path: path.into(),
            code: 404,
            body: body.into(),
        }
    }
}

/// Which error a remote call raises when its status is not expected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Metadata,
    Download,
    Upload,
    Delete,
    Revisions,
}

impl ErrorKind {
    pub(crate) fn into_error(self, path: &str, code: u16, body: String) -> ProviderError {
        let path = path.to_string();
        match self {
            ErrorKind::Metadata => ProviderError::MetadataNotFound { path, code, body },
            ErrorKind::Download => ProviderError::Download { path, code, body },
            ErrorKind::Upload => ProviderError::Upload { path, code, body },
            ErrorKind::Delete => ProviderError::Delete { path, code, body },
            ErrorKind::Revisions => ProviderError::Revisions { path, code, body },
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
