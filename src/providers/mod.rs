mod boxcom;

pub use boxcom::BoxProvider;

use async_trait::async_trait;

use crate::api::{ByteStream, DownloadStream};
use crate::error::Result;
use crate::vfs::{FileMetadata, Metadata, Resolved, RevisionMetadata};

/// Result of an upload: the stored file, and whether the call created it
/// (`true`) or replaced an existing file (`false`)
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub metadata: FileMetadata,
    pub created: bool,
}

/// Path-addressed storage operations exposed to the hosting service.
///
/// Every operation takes an absolute virtual path and resolves it fresh.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get provider description
    fn description(&self) -> &str;

    /// Metadata of a file, or the children of a directory path
    async fn metadata(&self, path: &str) -> Result<Resolved<Metadata>>;

    /// Stream a file's content, at `revision` if given
    async fn download(&self, path: &str, revision: Option<&str>) -> Result<DownloadStream>;

    /// Create or replace the file at `path`
    async fn upload(&self, path: &str, content: ByteStream) -> Result<UploadOutcome>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Current version first, then the remote history
    async fn revisions(&self, path: &str) -> Result<Vec<RevisionMetadata>>;

    /// Check if a path resolves
    async fn exists(&self, path: &str) -> Result<bool> {
        match self.metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
