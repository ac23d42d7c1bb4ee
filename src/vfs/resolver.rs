use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::node::{EntryKind, Metadata, Resolved, entry_id, entry_name};
use super::VirtualPath;
use crate::api::BoxClient;
use crate::error::{ProviderError, Result};

/// Resolves virtual paths to remote entries by walking the folder tree.
///
/// The remote API has no lookup by path, so each segment costs one folder
/// listing. Hops are strictly sequential and nothing is cached: every call
/// walks from the base folder again.
pub struct PathResolver {
    client: Arc<BoxClient>,
}

impl PathResolver {
    pub fn new(client: Arc<BoxClient>) -> Self {
        PathResolver { client }
    }

    /// Resolve a path starting at the configured base folder
    pub async fn resolve_from_root(&self, path: &VirtualPath) -> Result<Resolved<Value>> {
        let folder_id = self.client.config().folder().to_string();
        self.resolve(&folder_id, path).await
    }

    /// Resolve a path starting at `folder_id`, returning raw records.
    ///
    /// A file path yields the full file record. If its last segment names a
    /// folder instead, that folder's listing entry is returned as-is. A
    /// directory path yields the raw entries of the folder.
    ///
    /// Failures are reported against `path` as given, never against the
    /// remaining suffix being probed.
    pub async fn resolve(&self, folder_id: &str, path: &VirtualPath) -> Result<Resolved<Value>> {
        let original = path.to_string();
        let mut folder_id = folder_id.to_string();
        let mut remaining = path.clone();

        while !remaining.is_leaf() {
            let name = remaining.next_segment().unwrap_or_default();
            let entry = self.find_child(&folder_id, name, &original).await?;
            if EntryKind::of(&entry) != EntryKind::Folder {
                return Err(ProviderError::not_found(
                    original,
                    format!("'{name}' is not a folder"),
                ));
            }

            folder_id = entry_id(&entry).ok_or_else(|| {
                ProviderError::MalformedRecord(format!("folder '{name}' without id"))
            })?;
            debug!(path = %original, segment = name, folder_id = %folder_id, "descended");
            remaining = remaining.child();
        }

        if remaining.is_file() {
            let entry = self
                .find_child(&folder_id, remaining.name(), &original)
                .await?;
            if EntryKind::of(&entry) == EntryKind::Folder {
                return Ok(Resolved::Entry(entry));
            }

            let file_id = entry_id(&entry).ok_or_else(|| {
                ProviderError::MalformedRecord(format!("file '{}' without id", remaining.name()))
            })?;
            let file = self.client.get_file(&file_id, &original).await?;
            return Ok(Resolved::Entry(file));
        }

        let entries = self.client.list_folder(&folder_id, &original).await?;
        Ok(Resolved::Listing(entries))
    }

    /// Resolve and normalize. File and folder entries are annotated with
    /// the parent of `path`; listing entries with `path` itself.
    pub async fn metadata(&self, path: &VirtualPath) -> Result<Resolved<Metadata>> {
        match self.resolve_from_root(path).await? {
            Resolved::Entry(raw) => Ok(Resolved::Entry(Metadata::from_entry(&raw, &path.parent())?)),
            Resolved::Listing(entries) => entries
                .iter()
                .map(|raw| Metadata::from_entry(raw, path))
                .collect::<Result<Vec<_>>>()
                .map(Resolved::Listing),
        }
    }

    /// The single entry of `folder_id` named exactly `name`
    async fn find_child(&self, folder_id: &str, name: &str, original: &str) -> Result<Value> {
        let entries = self.client.list_folder(folder_id, original).await?;
        select_entry(entries, name).ok_or_else(|| {
            ProviderError::not_found(original, format!("no unique entry named '{name}'"))
        })
    }
}

/// Pick the entry whose name equals `name` (exact, case-sensitive).
/// Zero or several matches yield `None`: duplicates are never guessed at.
pub fn select_entry(entries: Vec<Value>, name: &str) -> Option<Value> {
    let mut matches = entries
        .into_iter()
        .filter(|entry| entry_name(entry) == Some(name));
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first),
    }
}
