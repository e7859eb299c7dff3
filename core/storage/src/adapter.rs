//! Storage adapter trait definition.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;

use stowage_common::{Error, Result, StoragePath, Visibility};

/// Byte stream type for streamed reads and writes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Whether a listing entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Attributes of a stored file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageAttributes {
    /// Path relative to the adapter root.
    pub path: StoragePath,
    pub kind: EntryKind,
    /// Size in bytes (None for directories).
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub visibility: Option<Visibility>,
    pub mime_type: Option<String>,
}

impl StorageAttributes {
    pub fn file(path: StoragePath) -> Self {
        Self {
            path,
            kind: EntryKind::File,
            size: None,
            last_modified: None,
            visibility: None,
            mime_type: None,
        }
    }

    pub fn directory(path: StoragePath) -> Self {
        Self {
            kind: EntryKind::Directory,
            ..Self::file(path)
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Per-call write settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Visibility for the written file.
    pub visibility: Option<Visibility>,
    /// Visibility for directories created on the way.
    pub directory_visibility: Option<Visibility>,
    /// Content type to store with the object, where the backend keeps one.
    pub mime_type: Option<String>,
}

impl WriteOptions {
    pub fn with_visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }
}

/// Backend family, used to pick a URL strategy when the adapter has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Local,
    Memory,
    Ftp,
    ObjectStore,
    Other,
}

/// Storage adapter trait for different backends.
///
/// Paths handed to an adapter are already normalized and relative to the
/// adapter root. Writes create missing parent directories. Deleting a
/// missing file is reported as `NotFound`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Short backend name (e.g., "local", "s3", "memory").
    fn name(&self) -> &str;

    fn kind(&self) -> AdapterKind;

    async fn file_exists(&self, path: &StoragePath) -> Result<bool>;

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool>;

    /// Write complete contents, replacing any existing file.
    async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions)
        -> Result<()>;

    /// Write contents from a stream without holding the whole file in memory.
    async fn write_stream(
        &self,
        path: &StoragePath,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()>;

    async fn read(&self, path: &StoragePath) -> Result<Bytes>;

    /// Open a stream over the file contents.
    ///
    /// The underlying handle is released when the stream is dropped.
    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream>;

    async fn delete(&self, path: &StoragePath) -> Result<()>;

    /// Delete a directory and everything below it.
    async fn delete_directory(&self, path: &StoragePath) -> Result<()>;

    /// Create a directory, including parents.
    async fn create_directory(&self, path: &StoragePath, options: &WriteOptions) -> Result<()>;

    async fn set_visibility(&self, path: &StoragePath, visibility: Visibility) -> Result<()>;

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility>;

    /// Size, MIME type and modification time of a file.
    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes>;

    /// List entries below `path`, recursing when `deep` is set.
    ///
    /// Returned entries are in arbitrary order.
    async fn list_contents(&self, path: &StoragePath, deep: bool)
        -> Result<Vec<StorageAttributes>>;

    async fn move_file(
        &self,
        from: &StoragePath,
        to: &StoragePath,
        options: &WriteOptions,
    ) -> Result<()>;

    async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions)
        -> Result<()>;

    /// Public URL the backend itself knows how to build, if any.
    fn public_url(&self, _path: &StoragePath) -> Option<String> {
        None
    }

    /// Time-limited URL, for backends that can sign one.
    async fn temporary_url(&self, path: &StoragePath, _expires_in: Duration) -> Result<String> {
        Err(Error::Unsupported(format!(
            "{} adapter cannot create temporary URLs for {}",
            self.name(),
            path
        )))
    }
}

/// Drain a stream into one contiguous buffer.
pub async fn collect_stream(mut stream: ByteStream) -> Result<Bytes> {
    let mut data = Vec::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk?);
    }
    Ok(Bytes::from(data))
}

/// Guess a MIME type from the file extension, falling back to sniffing the
/// first bytes of content.
pub fn detect_mime_type(path: &StoragePath, head: &[u8]) -> String {
    if let Some(mime) = mime_guess::from_path(path.to_string_path()).first() {
        return mime.essence_str().to_string();
    }
    if head.is_empty() {
        return "application/x-empty".to_string();
    }
    let sample = &head[..head.len().min(512)];
    match std::str::from_utf8(sample) {
        Ok(_) => "text/plain".to_string(),
        // A multi-byte character may be cut at the sample boundary.
        Err(e) if e.error_len().is_none() && e.valid_up_to() > 0 => "text/plain".to_string(),
        Err(_) => "application/octet-stream".to_string(),
    }
}
