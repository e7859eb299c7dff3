//! Path-level file operations over one adapter.
//!
//! The [`Operator`] is what a disk talks to. It parses caller paths, fills
//! in the configured default visibility, reports adapter failures as
//! [`Error::Operation`] and knows how to build public and temporary URLs.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::debug;

use crate::adapter::{
    detect_mime_type, Adapter, AdapterKind, ByteStream, StorageAttributes, WriteOptions,
};
use stowage_common::{DiskConfig, Error, Operation, Result, StoragePath, Visibility};

/// Settings the operator reads from the disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorConfig {
    pub visibility: Option<Visibility>,
    pub directory_visibility: Option<Visibility>,
    /// Base for public URLs.
    pub url: Option<String>,
    /// Base for temporary URLs on backends that cannot sign.
    pub temporary_url: Option<String>,
}

impl OperatorConfig {
    /// # Errors
    /// - `Configuration` if a visibility option is not `public`/`private`
    pub fn from_disk_config(config: &DiskConfig) -> Result<Self> {
        Ok(Self {
            visibility: config.visibility()?,
            directory_visibility: config.directory_visibility()?,
            url: config.url().map(str::to_string),
            temporary_url: config.temporary_url().map(str::to_string),
        })
    }
}

/// Join a base URL and a path with exactly one slash between them.
pub fn concat_path_to_url(url: &str, path: &str) -> String {
    format!("{}/{}", url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// File operations addressed by string paths.
#[derive(Clone)]
pub struct Operator {
    adapter: Arc<dyn Adapter>,
    config: OperatorConfig,
}

impl Operator {
    pub fn new(adapter: Arc<dyn Adapter>, config: OperatorConfig) -> Self {
        Self { adapter, config }
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    fn parse(path: &str) -> Result<StoragePath> {
        StoragePath::parse(path)
    }

    /// Fill unset options from the configured defaults.
    fn write_options(&self, mut options: WriteOptions) -> WriteOptions {
        options.visibility = options.visibility.or(self.config.visibility);
        options.directory_visibility = options
            .directory_visibility
            .or(self.config.directory_visibility);
        options
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.adapter.file_exists(&Self::parse(path)?).await
    }

    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        self.adapter.directory_exists(&Self::parse(path)?).await
    }

    /// True if either a file or a directory exists at `path`.
    pub async fn has(&self, path: &str) -> Result<bool> {
        let location = Self::parse(path)?;
        if self.adapter.file_exists(&location).await? {
            return Ok(true);
        }
        self.adapter.directory_exists(&location).await
    }

    pub async fn write(&self, path: &str, contents: Bytes) -> Result<()> {
        self.write_with(path, contents, WriteOptions::default()).await
    }

    pub async fn write_with(&self, path: &str, contents: Bytes, options: WriteOptions) -> Result<()> {
        let location = Self::parse(path)?;
        let mut options = self.write_options(options);
        if options.mime_type.is_none() {
            options.mime_type = Some(detect_mime_type(&location, &contents));
        }
        self.adapter
            .write(&location, contents, &options)
            .await
            .map_err(|e| Error::operation(Operation::Write, path, e))
    }

    pub async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: WriteOptions,
    ) -> Result<()> {
        let location = Self::parse(path)?;
        let mut options = self.write_options(options);
        if options.mime_type.is_none() {
            options.mime_type = mime_guess::from_path(location.to_string_path())
                .first()
                .map(|m| m.essence_str().to_string());
        }
        self.adapter
            .write_stream(&location, stream, &options)
            .await
            .map_err(|e| Error::operation(Operation::Write, path, e))
    }

    pub async fn read(&self, path: &str) -> Result<Bytes> {
        let location = Self::parse(path)?;
        self.adapter
            .read(&location)
            .await
            .map_err(|e| Error::operation(Operation::Read, path, e))
    }

    pub async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let location = Self::parse(path)?;
        self.adapter
            .read_stream(&location)
            .await
            .map_err(|e| Error::operation(Operation::Read, path, e))
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let location = Self::parse(path)?;
        self.adapter
            .delete(&location)
            .await
            .map_err(|e| Error::operation(Operation::Delete, path, e))
    }

    /// Delete a directory and its contents. The disk root is never deleted.
    pub async fn delete_directory(&self, path: &str) -> Result<()> {
        let location = Self::parse(path)?;
        if location.is_root() {
            return Err(Error::operation(
                Operation::DeleteDirectory,
                path,
                Error::InvalidInput("Refusing to delete the disk root".to_string()),
            ));
        }
        self.adapter
            .delete_directory(&location)
            .await
            .map_err(|e| Error::operation(Operation::DeleteDirectory, path, e))
    }

    pub async fn create_directory(&self, path: &str) -> Result<()> {
        let location = Self::parse(path)?;
        let options = WriteOptions {
            visibility: self.config.directory_visibility,
            directory_visibility: self.config.directory_visibility,
            mime_type: None,
        };
        self.adapter
            .create_directory(&location, &options)
            .await
            .map_err(|e| Error::operation(Operation::CreateDirectory, path, e))
    }

    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let location = Self::parse(path)?;
        self.adapter
            .set_visibility(&location, visibility)
            .await
            .map_err(|e| Error::operation(Operation::SetVisibility, path, e))
    }

    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        let location = Self::parse(path)?;
        self.adapter
            .visibility(&location)
            .await
            .map_err(|e| Error::operation(Operation::RetrieveMetadata, path, e))
    }

    pub async fn metadata(&self, path: &str) -> Result<StorageAttributes> {
        let location = Self::parse(path)?;
        self.adapter
            .metadata(&location)
            .await
            .map_err(|e| Error::operation(Operation::RetrieveMetadata, path, e))
    }

    pub async fn file_size(&self, path: &str) -> Result<u64> {
        let attributes = self.metadata(path).await?;
        attributes.size.ok_or_else(|| {
            Error::operation(
                Operation::RetrieveMetadata,
                path,
                Error::Storage("backend reported no file size".to_string()),
            )
        })
    }

    pub async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let attributes = self.metadata(path).await?;
        attributes.last_modified.ok_or_else(|| {
            Error::operation(
                Operation::RetrieveMetadata,
                path,
                Error::Storage("backend reported no modification time".to_string()),
            )
        })
    }

    /// MIME type from the backend, or detected from the name and first chunk.
    pub async fn mime_type(&self, path: &str) -> Result<String> {
        let attributes = self.metadata(path).await?;
        if let Some(mime) = attributes.mime_type {
            return Ok(mime);
        }
        if let Some(mime) = mime_guess::from_path(attributes.path.to_string_path()).first() {
            return Ok(mime.essence_str().to_string());
        }

        let mut stream = self.read_stream(path).await?;
        let head = match stream.next().await {
            Some(chunk) => chunk.map_err(|e| Error::operation(Operation::RetrieveMetadata, path, e))?,
            None => Bytes::new(),
        };
        Ok(detect_mime_type(&attributes.path, &head))
    }

    /// Entries below `path`, sorted by path.
    pub async fn list_contents(&self, path: &str, deep: bool) -> Result<Vec<StorageAttributes>> {
        let location = Self::parse(path)?;
        let mut entries = self
            .adapter
            .list_contents(&location, deep)
            .await
            .map_err(|e| Error::operation(Operation::List, path, e))?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let source = Self::parse(from)?;
        let destination = Self::parse(to)?;
        let options = self.write_options(WriteOptions::default());
        debug!(from = %source, to = %destination, "Copying file");
        self.adapter
            .copy(&source, &destination, &options)
            .await
            .map_err(|e| Error::operation(Operation::Copy, format!("{from} -> {to}"), e))
    }

    pub async fn move_file(&self, from: &str, to: &str) -> Result<()> {
        let source = Self::parse(from)?;
        let destination = Self::parse(to)?;
        if source == destination {
            return Ok(());
        }
        let options = self.write_options(WriteOptions::default());
        debug!(from = %source, to = %destination, "Moving file");
        self.adapter
            .move_file(&source, &destination, &options)
            .await
            .map_err(|e| Error::operation(Operation::Move, format!("{from} -> {to}"), e))
    }

    /// Public URL for `path`.
    ///
    /// The adapter's own URL wins. FTP, local and memory disks join the
    /// configured `url` with the path, or return the path unchanged.
    ///
    /// # Errors
    /// - `Unsupported` if the backend has no URL strategy
    pub fn public_url(&self, path: &str) -> Result<String> {
        let location = Self::parse(path)?;
        if let Some(url) = self.adapter.public_url(&location) {
            return Ok(url);
        }
        match self.adapter.kind() {
            AdapterKind::Ftp | AdapterKind::Local | AdapterKind::Memory => {
                Ok(match &self.config.url {
                    Some(base) => concat_path_to_url(base, path),
                    None => path.to_string(),
                })
            }
            AdapterKind::ObjectStore | AdapterKind::Other => Err(Error::Unsupported(format!(
                "This driver does not support retrieving URLs ({})",
                self.adapter.name()
            ))),
        }
    }

    /// Time-limited URL for `path`.
    ///
    /// Signed by the adapter where it can; otherwise a configured
    /// `temporary_url` base is joined with the path and carries the expiry
    /// as a unix timestamp.
    pub async fn temporary_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        let location = Self::parse(path)?;
        match self.adapter.temporary_url(&location, expires_in).await {
            Ok(url) => Ok(url),
            Err(e) if e.is_unsupported() => {
                let Some(base) = &self.config.temporary_url else {
                    return Err(e);
                };
                let expires = chrono::Duration::from_std(expires_in)
                    .map_err(|e| Error::InvalidInput(format!("Invalid expiry: {e}")))?;
                let expires_at = (Utc::now() + expires).timestamp();
                Ok(format!(
                    "{}?expires={expires_at}",
                    concat_path_to_url(base, &location.to_string_path())
                ))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;
    use crate::read_only::ReadOnlyAdapter;

    fn operator(config: OperatorConfig) -> Operator {
        Operator::new(Arc::new(MemoryAdapter::new()), config)
    }

    #[tokio::test]
    async fn test_write_applies_default_visibility() {
        let op = operator(OperatorConfig {
            visibility: Some(Visibility::Private),
            ..OperatorConfig::default()
        });
        op.write("a/b.txt", Bytes::from("hi")).await.unwrap();
        assert_eq!(op.visibility("a/b.txt").await.unwrap(), Visibility::Private);
        assert!(op.has("a").await.unwrap());
        assert!(op.has("a/b.txt").await.unwrap());
        assert!(!op.has("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_failures_are_wrapped_with_operation() {
        let op = operator(OperatorConfig::default());
        let err = op.read("missing.txt").await.unwrap_err();
        match &err {
            Error::Operation {
                operation, path, ..
            } => {
                assert_eq!(*operation, Operation::Read);
                assert_eq!(path, "missing.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_only_write_is_wrapped() {
        let op = Operator::new(
            Arc::new(ReadOnlyAdapter::new(Arc::new(MemoryAdapter::new()))),
            OperatorConfig::default(),
        );
        let err = op.write("x", Bytes::from("x")).await.unwrap_err();
        assert!(matches!(err.root_cause(), Error::ReadOnly(_)));
    }

    #[tokio::test]
    async fn test_delete_directory_refuses_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let adapter = crate::local::LocalAdapter::new(temp.path()).unwrap();
        let op = Operator::new(Arc::new(adapter), OperatorConfig::default());
        op.write("dir/a.txt", Bytes::from("a")).await.unwrap();

        for root in ["", "/", "."] {
            let err = op.delete_directory(root).await.unwrap_err();
            assert!(matches!(err.root_cause(), Error::InvalidInput(_)));
        }
        assert!(temp.path().join("dir/a.txt").is_file());

        op.delete_directory("dir").await.unwrap();
        assert!(!temp.path().join("dir").exists());
        assert!(temp.path().is_dir());
    }

    #[tokio::test]
    async fn test_listing_is_sorted() {
        let op = operator(OperatorConfig::default());
        for name in ["c.txt", "a.txt", "b/d.txt"] {
            op.write(name, Bytes::from("x")).await.unwrap();
        }
        let paths: Vec<String> = op
            .list_contents("", true)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(paths, vec!["a.txt", "b", "b/d.txt", "c.txt"]);
    }

    #[tokio::test]
    async fn test_mime_and_size() {
        let op = operator(OperatorConfig::default());
        op.write("page.html", Bytes::from("<p>hi</p>")).await.unwrap();
        op.write("notes", Bytes::from("plain words")).await.unwrap();
        assert_eq!(op.mime_type("page.html").await.unwrap(), "text/html");
        assert_eq!(op.mime_type("notes").await.unwrap(), "text/plain");
        assert_eq!(op.file_size("page.html").await.unwrap(), 9);
    }

    #[test]
    fn test_public_url_strategy() {
        let op = operator(OperatorConfig {
            url: Some("https://cdn.example.com/".to_string()),
            ..OperatorConfig::default()
        });
        assert_eq!(
            op.public_url("/img/a.png").unwrap(),
            "https://cdn.example.com/img/a.png"
        );

        let bare = operator(OperatorConfig::default());
        assert_eq!(bare.public_url("img/a.png").unwrap(), "img/a.png");
    }

    #[tokio::test]
    async fn test_temporary_url_needs_base() {
        let op = operator(OperatorConfig::default());
        let err = op
            .temporary_url("a.txt", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.is_unsupported());

        let op = operator(OperatorConfig {
            temporary_url: Some("https://tmp.example.com".to_string()),
            ..OperatorConfig::default()
        });
        let url = op
            .temporary_url("a.txt", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("https://tmp.example.com/a.txt?expires="));
    }

    #[test]
    fn test_concat_path_to_url() {
        assert_eq!(concat_path_to_url("http://x/", "/a"), "http://x/a");
        assert_eq!(concat_path_to_url("http://x", "a"), "http://x/a");
    }
}
