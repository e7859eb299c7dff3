//! Decorator that rejects every mutating call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::adapter::{Adapter, AdapterKind, ByteStream, StorageAttributes, WriteOptions};
use stowage_common::{Error, Result, StoragePath, Visibility};

/// Wraps an adapter so that reads pass through and writes fail with
/// [`Error::ReadOnly`].
pub struct ReadOnlyAdapter {
    inner: Arc<dyn Adapter>,
}

impl ReadOnlyAdapter {
    pub fn new(inner: Arc<dyn Adapter>) -> Self {
        Self { inner }
    }

    fn denied(&self, what: &str, path: &StoragePath) -> Error {
        Error::ReadOnly(format!("cannot {what} {path} on a read-only {} disk", self.inner.name()))
    }
}

#[async_trait]
impl Adapter for ReadOnlyAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> AdapterKind {
        self.inner.kind()
    }

    async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
        self.inner.file_exists(path).await
    }

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
        self.inner.directory_exists(path).await
    }

    async fn write(&self, path: &StoragePath, _contents: Bytes, _options: &WriteOptions) -> Result<()> {
        Err(self.denied("write", path))
    }

    async fn write_stream(
        &self,
        path: &StoragePath,
        _stream: ByteStream,
        _options: &WriteOptions,
    ) -> Result<()> {
        Err(self.denied("write", path))
    }

    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        self.inner.read(path).await
    }

    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
        self.inner.read_stream(path).await
    }

    async fn delete(&self, path: &StoragePath) -> Result<()> {
        Err(self.denied("delete", path))
    }

    async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
        Err(self.denied("delete directory", path))
    }

    async fn create_directory(&self, path: &StoragePath, _options: &WriteOptions) -> Result<()> {
        Err(self.denied("create directory", path))
    }

    async fn set_visibility(&self, path: &StoragePath, _visibility: Visibility) -> Result<()> {
        Err(self.denied("set visibility of", path))
    }

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
        self.inner.visibility(path).await
    }

    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
        self.inner.metadata(path).await
    }

    async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
        self.inner.list_contents(path, deep).await
    }

    async fn move_file(
        &self,
        from: &StoragePath,
        _to: &StoragePath,
        _options: &WriteOptions,
    ) -> Result<()> {
        Err(self.denied("move", from))
    }

    async fn copy(&self, from: &StoragePath, _to: &StoragePath, _options: &WriteOptions) -> Result<()> {
        Err(self.denied("copy", from))
    }

    fn public_url(&self, path: &StoragePath) -> Option<String> {
        self.inner.public_url(path)
    }

    async fn temporary_url(&self, path: &StoragePath, expires_in: Duration) -> Result<String> {
        self.inner.temporary_url(path, expires_in).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;

    #[tokio::test]
    async fn test_reads_pass_writes_fail() {
        let memory = MemoryAdapter::new();
        let p = StoragePath::parse("seed.txt").unwrap();
        memory.write(&p, Bytes::from("seed"), &WriteOptions::default()).await.unwrap();

        let adapter = ReadOnlyAdapter::new(Arc::new(memory.clone()));
        assert_eq!(adapter.read(&p).await.unwrap(), Bytes::from("seed"));
        assert_eq!(adapter.name(), "memory");

        let err = adapter
            .write(&p, Bytes::from("x"), &WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReadOnly(_)));
        assert!(matches!(adapter.delete(&p).await.unwrap_err(), Error::ReadOnly(_)));

        // Underlying storage is untouched.
        assert_eq!(memory.read(&p).await.unwrap(), Bytes::from("seed"));
    }
}
