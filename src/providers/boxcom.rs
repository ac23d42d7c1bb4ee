use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{StorageProvider, UploadOutcome};
use crate::api::{BoxClient, ByteStream, DownloadStream, ReqwestTransport, Transport};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::vfs::node::{EntryKind, entry_id, parent_id};
use crate::vfs::{FileMetadata, Metadata, PathResolver, Resolved, RevisionMetadata, VirtualPath};

/// Box storage provider
pub struct BoxProvider {
    config: Arc<ProviderConfig>,
    client: Arc<BoxClient>,
    resolver: PathResolver,
}

impl BoxProvider {
    /// Create a provider talking to Box over `reqwest`
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a provider over a specific transport
    pub fn with_transport(config: ProviderConfig, transport: Arc<dyn Transport>) -> Self {
        let config = Arc::new(config);
        let client = Arc::new(BoxClient::new(transport, Arc::clone(&config)));
        BoxProvider {
            resolver: PathResolver::new(Arc::clone(&client)),
            config,
            client,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Parse a caller path against the configured base path
    pub fn virtual_path(&self, path: &str) -> Result<VirtualPath> {
        VirtualPath::new(self.config.base_path(), path)
    }

    /// Like [`StorageProvider::metadata`], but returns the remote records
    /// untouched
    pub async fn metadata_raw(&self, path: &str) -> Result<Resolved<Value>> {
        let path = self.virtual_path(path)?;
        self.resolver.resolve_from_root(&path).await
    }

    /// Resolve to the raw record of a file; folders and listings are refused
    async fn resolve_file(&self, path: &VirtualPath) -> Result<(Value, String)> {
        match self.resolver.resolve_from_root(path).await? {
            Resolved::Entry(raw) if EntryKind::of(&raw) == EntryKind::File => {
                let id = entry_id(&raw).ok_or_else(|| {
                    ProviderError::MalformedRecord(format!("{path}: file without id"))
                })?;
                Ok((raw, id))
            }
            _ => Err(ProviderError::NotAFile(path.to_string())),
        }
    }

    /// Id of the folder an upload under `parent` goes into
    async fn parent_folder_id(&self, parent: &VirtualPath) -> Result<String> {
        if parent.is_root() {
            return Ok(self.config.folder().to_string());
        }

        // Addressed as a file so the folder's own listing entry comes back
        match self.resolver.resolve_from_root(&parent.to_file()).await? {
            Resolved::Entry(raw) if EntryKind::of(&raw) == EntryKind::Folder => entry_id(&raw)
                .ok_or_else(|| ProviderError::MalformedRecord(format!("{parent}: folder without id"))),
            _ => Err(ProviderError::NotAFolder(parent.to_string())),
        }
    }
}

#[async_trait]
impl StorageProvider for BoxProvider {
    fn name(&self) -> &str {
        "box"
    }

    fn description(&self) -> &str {
        "Box cloud content management"
    }

    async fn metadata(&self, path: &str) -> Result<Resolved<Metadata>> {
        let path = self.virtual_path(path)?;
        self.resolver.metadata(&path).await
    }

    async fn download(&self, path: &str, revision: Option<&str>) -> Result<DownloadStream> {
        let path = self.virtual_path(path)?;
        let (_, file_id) = self.resolve_file(&path).await?;

        let version = revision.filter(|r| *r != file_id);
        self.client
            .download(&file_id, version, &path.to_string())
            .await
    }

    async fn upload(&self, path: &str, content: ByteStream) -> Result<UploadOutcome> {
        let path = self.virtual_path(path)?;
        if path.is_dir() {
            return Err(ProviderError::InvalidPath(format!(
                "{path}: cannot upload to a directory path"
            )));
        }
        let original = path.to_string();

        let (data, created) = match self.resolver.resolve_from_root(&path).await {
            Ok(Resolved::Entry(existing)) => {
                if EntryKind::of(&existing) == EntryKind::Folder {
                    return Err(ProviderError::NotAFile(original));
                }
                let file_id = entry_id(&existing).ok_or_else(|| {
                    ProviderError::MalformedRecord(format!("{original}: file without id"))
                })?;
                let folder_id = parent_id(&existing).ok_or_else(|| {
                    ProviderError::MalformedRecord(format!("{original}: file without parent"))
                })?;

                info!(
                    path = %original,
                    remote = %path.full_path(),
                    file_id = %file_id,
                    "uploading new version"
                );
                let data = self
                    .client
                    .upload(path.name(), &folder_id, Some(&file_id), content, &original)
                    .await?;
                (data, false)
            }
            Ok(Resolved::Listing(_)) => return Err(ProviderError::NotAFile(original)),
            Err(e) if e.is_not_found() => {
                let folder_id = match self.parent_folder_id(&path.parent()).await {
                    Err(ProviderError::MetadataNotFound { code: 404, body, .. }) => {
                        return Err(ProviderError::not_found(original, body));
                    }
                    other => other?,
                };

                info!(
                    path = %original,
                    remote = %path.full_path(),
                    folder_id = %folder_id,
                    "creating file"
                );
                let data = self
                    .client
                    .upload(path.name(), &folder_id, None, content, &original)
                    .await?;
                (data, true)
            }
            Err(e) => return Err(e),
        };

        Ok(UploadOutcome {
            metadata: FileMetadata::from_raw(&data, &path.parent())?,
            created,
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = self.virtual_path(path)?;
        let (_, file_id) = self.resolve_file(&path).await?;

        // TODO: send the record's etag as If-Match so a concurrent update
        // is not deleted unseen
        info!(path = %path, remote = %path.full_path(), file_id = %file_id, "deleting file");
        self.client.delete_file(&file_id, &path.to_string()).await
    }

    async fn revisions(&self, path: &str) -> Result<Vec<RevisionMetadata>> {
        let path = self.virtual_path(path)?;
        let (current, file_id) = self.resolve_file(&path).await?;

        // Versions are only tracked on paid plans; otherwise history is empty
        let history = self
            .client
            .list_versions(&file_id, &path.to_string())
            .await?;

        std::iter::once(&current)
            .chain(history.iter())
            .map(RevisionMetadata::from_raw)
            .collect()
    }
}
