//! Decorator that scopes an adapter to a sub-directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapter::{Adapter, AdapterKind, ByteStream, StorageAttributes, WriteOptions};
use stowage_common::{Error, Result, StoragePath, Visibility};

/// Prefixes every path on the way in and strips the prefix from listing
/// results on the way out.
pub struct PrefixedAdapter {
    inner: Arc<dyn Adapter>,
    prefix: StoragePath,
}

impl PrefixedAdapter {
    /// # Errors
    /// - `InvalidInput` if the prefix normalizes to the root
    pub fn new(inner: Arc<dyn Adapter>, prefix: &str) -> Result<Self> {
        let prefix = StoragePath::parse(prefix)?;
        if prefix.is_root() {
            return Err(Error::InvalidInput(
                "The prefix must not be empty".to_string(),
            ));
        }
        Ok(Self { inner, prefix })
    }

    pub fn prefix(&self) -> &StoragePath {
        &self.prefix
    }

    fn prefixed(&self, path: &StoragePath) -> StoragePath {
        self.prefix.concat(path)
    }
}

#[async_trait]
impl Adapter for PrefixedAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> AdapterKind {
        self.inner.kind()
    }

    async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
        self.inner.file_exists(&self.prefixed(path)).await
    }

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
        self.inner.directory_exists(&self.prefixed(path)).await
    }

    async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions) -> Result<()> {
        self.inner.write(&self.prefixed(path), contents, options).await
    }

    async fn write_stream(
        &self,
        path: &StoragePath,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        self.inner
            .write_stream(&self.prefixed(path), stream, options)
            .await
    }

    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        self.inner.read(&self.prefixed(path)).await
    }

    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
        self.inner.read_stream(&self.prefixed(path)).await
    }

    async fn delete(&self, path: &StoragePath) -> Result<()> {
        self.inner.delete(&self.prefixed(path)).await
    }

    async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
        self.inner.delete_directory(&self.prefixed(path)).await
    }

    async fn create_directory(&self, path: &StoragePath, options: &WriteOptions) -> Result<()> {
        self.inner
            .create_directory(&self.prefixed(path), options)
            .await
    }

    async fn set_visibility(&self, path: &StoragePath, visibility: Visibility) -> Result<()> {
        self.inner
            .set_visibility(&self.prefixed(path), visibility)
            .await
    }

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
        self.inner.visibility(&self.prefixed(path)).await
    }

    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
        let mut attributes = self.inner.metadata(&self.prefixed(path)).await?;
        attributes.path = path.clone();
        Ok(attributes)
    }

    async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
        let entries = self.inner.list_contents(&self.prefixed(path), deep).await?;
        Ok(entries
            .into_iter()
            .filter_map(|mut entry| {
                entry.path = entry.path.strip_ancestor(&self.prefix)?;
                Some(entry)
            })
            .collect())
    }

    async fn move_file(
        &self,
        from: &StoragePath,
        to: &StoragePath,
        options: &WriteOptions,
    ) -> Result<()> {
        self.inner
            .move_file(&self.prefixed(from), &self.prefixed(to), options)
            .await
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
        self.inner
            .copy(&self.prefixed(from), &self.prefixed(to), options)
            .await
    }

    fn public_url(&self, path: &StoragePath) -> Option<String> {
        self.inner.public_url(&self.prefixed(path))
    }

    async fn temporary_url(&self, path: &StoragePath, expires_in: Duration) -> Result<String> {
        self.inner
            .temporary_url(&self.prefixed(path), expires_in)
            .await
    }
}
