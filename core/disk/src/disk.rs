//! The driver for one configured disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::naming::NameRule;
use stowage_common::{DiskConfig, Error, PathPrefixer, Result, Visibility};
use stowage_storage::{
    Adapter, ByteStream, Operator, OperatorConfig, PrefixedAdapter,
    ReadOnlyAdapter, StorageAttributes, WriteOptions,
};

/// Separator used by [`Disk::prepend`] and [`Disk::append`].
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Options every disk of a backend type starts from.
pub fn defaults_for(kind: &str) -> DiskConfig {
    match kind {
        "local" => DiskConfig::new().with("root", ""),
        _ => DiskConfig::new(),
    }
}

/// Uniform file API over one adapter.
///
/// Operations that can fail for ordinary storage reasons return a sentinel
/// (`false`, `None`) in lenient mode and log the failure. A strict disk
/// (`throw: true`) returns the error instead. Configuration errors are
/// always returned.
pub struct Disk {
    name: String,
    config: DiskConfig,
    prefixer: PathPrefixer,
    adapter: Arc<dyn Adapter>,
    operator: Operator,
    strict: bool,
}

impl Disk {
    /// Build a disk from its options and the adapter factory for its type.
    ///
    /// The options are merged over [`defaults_for`] the disk type before
    /// the factory sees them. `throw_by_default` applies when the disk does
    /// not set `throw` itself.
    pub fn from_config<F>(
        name: impl Into<String>,
        config: &DiskConfig,
        factory: F,
        throw_by_default: bool,
    ) -> Result<Self>
    where
        F: FnOnce(&DiskConfig) -> Result<Arc<dyn Adapter>>,
    {
        let config = config.merged_over(&defaults_for(config.kind()));
        let adapter = factory(&config)?;
        let strict = config.throws().unwrap_or(throw_by_default);
        Self::new(name, config, adapter, strict)
    }

    /// Wrap an already-built adapter.
    ///
    /// Applies the read-only and prefix decorators the options ask for.
    pub fn new(
        name: impl Into<String>,
        config: DiskConfig,
        adapter: Arc<dyn Adapter>,
        strict: bool,
    ) -> Result<Self> {
        let name = name.into();
        let separator = config.directory_separator();
        let mut prefixer = PathPrefixer::new(config.root(), separator);
        if let Some(prefix) = config.prefix() {
            prefixer = PathPrefixer::new(&prefixer.prefix_path(prefix), separator);
        }

        let mut decorated = adapter.clone();
        if config.is_read_only() {
            decorated = Arc::new(ReadOnlyAdapter::new(decorated));
        }
        if let Some(prefix) = config.prefix() {
            let prefixed = PrefixedAdapter::new(decorated, prefix).map_err(|e| {
                Error::Configuration(format!("Disk [{name}] has an invalid prefix: {e}"))
            })?;
            decorated = Arc::new(prefixed);
        }
        let operator = Operator::new(decorated, OperatorConfig::from_disk_config(&config)?);

        info!(
            disk = %name,
            adapter = adapter.name(),
            read_only = config.is_read_only(),
            strict,
            "Disk created"
        );

        Ok(Self {
            name,
            config,
            prefixer,
            adapter,
            operator,
            strict,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Merged options this disk was built from.
    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// Whether failures propagate instead of turning into sentinels.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The operator, with decorators applied.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// The undecorated backend adapter.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// Full backend location of `path` (root and prefix applied).
    pub fn path(&self, path: &str) -> String {
        self.prefixer.prefix_path(path)
    }

    /// Turn a failure into `sentinel` unless this disk is strict.
    fn settle<T>(&self, operation: &str, path: &str, result: Result<T>, sentinel: T) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if self.strict || e.is_configuration() => Err(e),
            Err(e) => {
                warn!(disk = %self.name, operation, path, error = %e, "Storage operation failed");
                Ok(sentinel)
            }
        }
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        self.operator.has(path).await
    }

    pub async fn missing(&self, path: &str) -> Result<bool> {
        Ok(!self.exists(path).await?)
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.operator.file_exists(path).await
    }

    pub async fn file_missing(&self, path: &str) -> Result<bool> {
        Ok(!self.file_exists(path).await?)
    }

    pub async fn directory_exists(&self, path: &str) -> Result<bool> {
        self.operator.directory_exists(path).await
    }

    pub async fn directory_missing(&self, path: &str) -> Result<bool> {
        Ok(!self.directory_exists(path).await?)
    }

    /// File contents, or `None` when the read fails.
    pub async fn get(&self, path: &str) -> Result<Option<Bytes>> {
        let result = self.operator.read(path).await.map(Some);
        self.settle("read", path, result, None)
    }

    pub async fn read_stream(&self, path: &str) -> Result<Option<ByteStream>> {
        let result = self.operator.read_stream(path).await.map(Some);
        self.settle("read", path, result, None)
    }

    pub async fn put(&self, path: &str, contents: impl Into<Bytes>) -> Result<bool> {
        self.put_with(path, contents, WriteOptions::default()).await
    }

    /// Write with explicit options (visibility, MIME type).
    pub async fn put_with(
        &self,
        path: &str,
        contents: impl Into<Bytes>,
        options: WriteOptions,
    ) -> Result<bool> {
        let contents = contents.into();
        debug!(disk = %self.name, path, size = contents.len(), "Writing file");
        let result = self.operator.write_with(path, contents, options).await;
        self.settle("write", path, result.map(|_| true), false)
    }

    pub async fn put_stream(&self, path: &str, stream: ByteStream) -> Result<bool> {
        self.write_stream(path, stream, WriteOptions::default()).await
    }

    pub async fn write_stream(
        &self,
        path: &str,
        stream: ByteStream,
        options: WriteOptions,
    ) -> Result<bool> {
        debug!(disk = %self.name, path, "Writing stream");
        let result = self.operator.write_stream(path, stream, options).await;
        self.settle("write", path, result.map(|_| true), false)
    }

    /// Store a local file under `directory` with a generated name.
    ///
    /// Returns the stored path.
    pub async fn put_file(
        &self,
        directory: &str,
        source: impl AsRef<Path>,
        rule: &NameRule,
    ) -> Result<Option<String>> {
        let source = source.as_ref();
        let name = match rule.hash_name(source).await {
            Ok(name) => name,
            Err(e) => return self.settle("write", directory, Err(e), None),
        };
        self.put_file_as(directory, source, &name).await
    }

    /// Store a local file as `directory/name`, streaming its contents.
    pub async fn put_file_as(
        &self,
        directory: &str,
        source: impl AsRef<Path>,
        name: &str,
    ) -> Result<Option<String>> {
        let path = format!("{directory}/{name}").trim_matches('/').to_string();
        let result = async {
            let file = tokio::fs::File::open(source.as_ref()).await?;
            let stream: ByteStream = Box::pin(ReaderStream::new(file).map_err(Error::from));
            self.operator
                .write_stream(&path, stream, WriteOptions::default())
                .await
        }
        .await;
        let stored = result.map(|_| Some(path.clone()));
        self.settle("write", &path, stored, None)
    }

    /// Delete one file.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        self.delete_many(&[path]).await
    }

    /// Delete every path, continuing past failures.
    ///
    /// Returns `true` only if every delete succeeded.
    pub async fn delete_many<S: AsRef<str>>(&self, paths: &[S]) -> Result<bool> {
        let mut success = true;
        for path in paths {
            let path = path.as_ref();
            debug!(disk = %self.name, path, "Deleting file");
            let result = self.operator.delete(path).await.map(|_| true);
            success &= self.settle("delete", path, result, false)?;
        }
        Ok(success)
    }

    pub async fn copy(&self, from: &str, to: &str) -> Result<bool> {
        let result = self.operator.copy(from, to).await.map(|_| true);
        self.settle("copy", from, result, false)
    }

    pub async fn move_file(&self, from: &str, to: &str) -> Result<bool> {
        let result = self.operator.move_file(from, to).await.map(|_| true);
        self.settle("move", from, result, false)
    }

    pub async fn size(&self, path: &str) -> Result<u64> {
        self.operator.file_size(path).await
    }

    pub async fn mime_type(&self, path: &str) -> Result<Option<String>> {
        let result = self.operator.mime_type(path).await.map(Some);
        self.settle("retrieve metadata", path, result, None)
    }

    pub async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        self.operator.last_modified(path).await
    }

    pub async fn metadata(&self, path: &str) -> Result<StorageAttributes> {
        self.operator.metadata(path).await
    }

    pub async fn visibility(&self, path: &str) -> Result<Visibility> {
        self.operator.visibility(path).await
    }

    pub async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<bool> {
        let result = self
            .operator
            .set_visibility(path, visibility)
            .await
            .map(|_| true);
        self.settle("set visibility", path, result, false)
    }

    pub async fn prepend(&self, path: &str, data: impl AsRef<[u8]>) -> Result<bool> {
        self.prepend_with(path, data, DEFAULT_SEPARATOR).await
    }

    /// Put `data` and `separator` in front of the current contents.
    ///
    /// A missing or empty file just receives `data`.
    pub async fn prepend_with(
        &self,
        path: &str,
        data: impl AsRef<[u8]>,
        separator: &str,
    ) -> Result<bool> {
        let data = data.as_ref();
        let existing = match self.existing_contents(path).await {
            Ok(existing) => existing,
            Err(e) => return self.settle("read", path, Err(e), false),
        };
        let contents = match existing {
            Some(existing) => [data, separator.as_bytes(), &existing].concat(),
            None => data.to_vec(),
        };
        self.put(path, contents).await
    }

    pub async fn append(&self, path: &str, data: impl AsRef<[u8]>) -> Result<bool> {
        self.append_with(path, data, DEFAULT_SEPARATOR).await
    }

    /// Put `separator` and `data` after the current contents.
    ///
    /// A missing or empty file just receives `data`.
    pub async fn append_with(
        &self,
        path: &str,
        data: impl AsRef<[u8]>,
        separator: &str,
    ) -> Result<bool> {
        let data = data.as_ref();
        let existing = match self.existing_contents(path).await {
            Ok(existing) => existing,
            Err(e) => return self.settle("read", path, Err(e), false),
        };
        let contents = match existing {
            Some(existing) => [&existing, separator.as_bytes(), data].concat(),
            None => data.to_vec(),
        };
        self.put(path, contents).await
    }

    /// Current non-empty contents of `path`, if it is a file.
    ///
    /// A failed read is an error here, never an empty file, so callers do
    /// not overwrite contents they could not see.
    async fn existing_contents(&self, path: &str) -> Result<Option<Bytes>> {
        if !self.operator.file_exists(path).await? {
            return Ok(None);
        }
        let existing = self.operator.read(path).await?;
        Ok(Some(existing).filter(|existing| !existing.is_empty()))
    }

    pub async fn make_directory(&self, path: &str) -> Result<bool> {
        debug!(disk = %self.name, path, "Creating directory");
        let result = self.operator.create_directory(path).await.map(|_| true);
        self.settle("create directory", path, result, false)
    }

    pub async fn delete_directory(&self, path: &str) -> Result<bool> {
        debug!(disk = %self.name, path, "Deleting directory");
        let result = self.operator.delete_directory(path).await.map(|_| true);
        self.settle("delete directory", path, result, false)
    }

    /// Files directly in `directory`, sorted by path.
    pub async fn files(&self, directory: &str) -> Result<Vec<String>> {
        self.list(directory, false, true).await
    }

    /// Files anywhere below `directory`, sorted by path.
    pub async fn all_files(&self, directory: &str) -> Result<Vec<String>> {
        self.list(directory, true, true).await
    }

    pub async fn directories(&self, directory: &str) -> Result<Vec<String>> {
        self.list(directory, false, false).await
    }

    pub async fn all_directories(&self, directory: &str) -> Result<Vec<String>> {
        self.list(directory, true, false).await
    }

    async fn list(&self, directory: &str, deep: bool, files: bool) -> Result<Vec<String>> {
        Ok(self
            .operator
            .list_contents(directory, deep)
            .await?
            .into_iter()
            .filter(|entry| entry.is_file() == files)
            .map(|entry| entry.path.to_string())
            .collect())
    }

    /// Public URL of `path`.
    ///
    /// # Errors
    /// - `Unsupported` if the backend has no URL strategy
    pub fn url(&self, path: &str) -> Result<String> {
        self.operator.public_url(path)
    }

    pub async fn temporary_url(&self, path: &str, expires_in: Duration) -> Result<String> {
        self.operator.temporary_url(path, expires_in).await
    }
}

impl std::fmt::Debug for Disk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disk")
            .field("name", &self.name)
            .field("adapter", &self.adapter.name())
            .field("strict", &self.strict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use proptest::prelude::*;
    use stowage_common::StoragePath;
    use stowage_storage::{collect_stream, create_default_registry, AdapterKind, MemoryAdapter};
    use tempfile::TempDir;

    fn memory_disk(config: DiskConfig, strict: bool) -> Disk {
        Disk::new("mem", config, Arc::new(MemoryAdapter::new()), strict).unwrap()
    }

    fn local_disk(root: &Path, extra: DiskConfig) -> Disk {
        let registry = create_default_registry();
        let config = extra
            .with("type", "local")
            .with("root", root.to_str().unwrap());
        Disk::from_config("local", &config, |c| registry.resolve("local", c), false).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let disk = memory_disk(DiskConfig::new(), false);
        assert!(disk.put("text.txt", "hello").await.unwrap());
        assert_eq!(disk.get("text.txt").await.unwrap().unwrap(), Bytes::from("hello"));

        let binary: Vec<u8> = (0..=255).collect();
        assert!(disk.put("bin.dat", binary.clone()).await.unwrap());
        assert_eq!(disk.get("bin.dat").await.unwrap().unwrap().to_vec(), binary);
    }

    #[tokio::test]
    async fn test_lenient_sentinels() {
        let disk = memory_disk(DiskConfig::new(), false);
        assert!(disk.get("missing").await.unwrap().is_none());
        assert!(disk.read_stream("missing").await.unwrap().is_none());
        assert!(!disk.delete("missing").await.unwrap());
        assert!(!disk.copy("missing", "b").await.unwrap());
        assert!(!disk.move_file("missing", "b").await.unwrap());
        assert!(disk.mime_type("missing").await.unwrap().is_none());
        assert!(!disk.set_visibility("missing", Visibility::Public).await.unwrap());
    }

    #[tokio::test]
    async fn test_strict_mode_propagates() {
        let disk = memory_disk(DiskConfig::new(), true);
        assert!(disk.is_strict());
        let err = disk.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, Error::Operation { .. }));
        assert!(disk.delete("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_metadata_always_propagates() {
        let disk = memory_disk(DiskConfig::new(), false);
        assert!(disk.size("missing").await.is_err());
        assert!(disk.last_modified("missing").await.is_err());
        assert!(disk.visibility("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_many_continues_past_failures() {
        let disk = memory_disk(DiskConfig::new(), false);
        disk.put("existing.txt", "x").await.unwrap();

        assert!(!disk.delete_many(&["existing.txt", "missing.txt"]).await.unwrap());
        assert!(disk.file_missing("existing.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_prepend_and_append() {
        let disk = memory_disk(DiskConfig::new(), false);
        disk.prepend("log", "A").await.unwrap();
        disk.prepend("log", "B").await.unwrap();
        assert_eq!(disk.get("log").await.unwrap().unwrap(), Bytes::from("B\nA"));

        disk.put("empty", "").await.unwrap();
        disk.prepend("empty", "A").await.unwrap();
        disk.prepend("empty", "B").await.unwrap();
        assert_eq!(disk.get("empty").await.unwrap().unwrap(), Bytes::from("B\nA"));

        disk.append_with("csv", "a", ",").await.unwrap();
        disk.append_with("csv", "b", ",").await.unwrap();
        assert_eq!(disk.get("csv").await.unwrap().unwrap(), Bytes::from("a,b"));
    }

    /// Memory storage whose reads always fail.
    struct UnreadableAdapter(MemoryAdapter);

    #[async_trait::async_trait]
    impl Adapter for UnreadableAdapter {
        fn name(&self) -> &str {
            "unreadable"
        }

        fn kind(&self) -> AdapterKind {
            AdapterKind::Other
        }

        async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
            self.0.file_exists(path).await
        }

        async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
            self.0.directory_exists(path).await
        }

        async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions) -> Result<()> {
            self.0.write(path, contents, options).await
        }

        async fn write_stream(
            &self,
            path: &StoragePath,
            stream: ByteStream,
            options: &WriteOptions,
        ) -> Result<()> {
            self.0.write_stream(path, stream, options).await
        }

        async fn read(&self, path: &StoragePath) -> Result<Bytes> {
            Err(Error::Storage(format!("connection reset while reading {path}")))
        }

        async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
            Err(Error::Storage(format!("connection reset while reading {path}")))
        }

        async fn delete(&self, path: &StoragePath) -> Result<()> {
            self.0.delete(path).await
        }

        async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
            self.0.delete_directory(path).await
        }

        async fn create_directory(&self, path: &StoragePath, options: &WriteOptions) -> Result<()> {
            self.0.create_directory(path, options).await
        }

        async fn set_visibility(&self, path: &StoragePath, visibility: Visibility) -> Result<()> {
            self.0.set_visibility(path, visibility).await
        }

        async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
            self.0.visibility(path).await
        }

        async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
            self.0.metadata(path).await
        }

        async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
            self.0.list_contents(path, deep).await
        }

        async fn move_file(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
            self.0.move_file(from, to, options).await
        }

        async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
            self.0.copy(from, to, options).await
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_is_not_overwritten() {
        let backing = MemoryAdapter::new();
        let log = StoragePath::parse("log").unwrap();
        backing
            .write(&log, Bytes::from("kept"), &WriteOptions::default())
            .await
            .unwrap();

        let adapter = Arc::new(UnreadableAdapter(backing.clone()));
        let disk = Disk::new("flaky", DiskConfig::new(), adapter.clone(), false).unwrap();
        assert!(!disk.prepend("log", "A").await.unwrap());
        assert!(!disk.append("log", "B").await.unwrap());
        assert_eq!(backing.read(&log).await.unwrap(), Bytes::from("kept"));

        let strict = Disk::new("flaky", DiskConfig::new(), adapter, true).unwrap();
        assert!(strict.prepend("log", "A").await.is_err());
        assert_eq!(backing.read(&log).await.unwrap(), Bytes::from("kept"));
    }

    #[tokio::test]
    async fn test_read_only_disk() {
        let disk = memory_disk(DiskConfig::new().with("read-only", true), false);
        assert!(!disk.put("a.txt", "x").await.unwrap());
        assert!(disk.file_missing("a.txt").await.unwrap());

        let strict = memory_disk(DiskConfig::new().with("read-only", true), true);
        let err = strict.put("a.txt", "x").await.unwrap_err();
        assert!(matches!(err.root_cause(), Error::ReadOnly(_)));
    }

    #[tokio::test]
    async fn test_prefixed_disk() {
        let adapter = MemoryAdapter::new();
        let disk = Disk::new(
            "scoped",
            DiskConfig::new().with("prefix", "tenant-1"),
            Arc::new(adapter.clone()),
            false,
        )
        .unwrap();
        disk.put("a.txt", "x").await.unwrap();

        assert!(adapter
            .file_exists(&"tenant-1/a.txt".parse().unwrap())
            .await
            .unwrap());
        assert_eq!(disk.files("").await.unwrap(), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn test_listing() {
        let disk = memory_disk(DiskConfig::new(), false);
        for path in ["b.txt", "a.txt", "sub/c.txt", "sub/deeper/d.txt"] {
            disk.put(path, "x").await.unwrap();
        }
        assert_eq!(disk.files("").await.unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(
            disk.all_files("").await.unwrap(),
            vec!["a.txt", "b.txt", "sub/c.txt", "sub/deeper/d.txt"]
        );
        assert_eq!(disk.directories("").await.unwrap(), vec!["sub"]);
        assert_eq!(
            disk.all_directories("").await.unwrap(),
            vec!["sub", "sub/deeper"]
        );
        assert_eq!(disk.files("sub").await.unwrap(), vec!["sub/c.txt"]);
    }

    #[tokio::test]
    async fn test_directories() {
        let disk = memory_disk(DiskConfig::new(), false);
        assert!(disk.make_directory("x/y").await.unwrap());
        assert!(disk.directory_exists("x/y").await.unwrap());
        assert!(disk.exists("x").await.unwrap());
        assert!(disk.delete_directory("x").await.unwrap());
        assert!(disk.directory_missing("x").await.unwrap());
        assert!(disk.missing("x/y").await.unwrap());
    }

    #[tokio::test]
    async fn test_streams() {
        let disk = memory_disk(DiskConfig::new(), false);
        let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from("ab")), Ok(Bytes::from("cd"))];
        assert!(disk.put_stream("s.bin", Box::pin(stream::iter(chunks))).await.unwrap());

        let stream = disk.read_stream("s.bin").await.unwrap().unwrap();
        assert_eq!(collect_stream(stream).await.unwrap(), Bytes::from("abcd"));
    }

    #[tokio::test]
    async fn test_local_scenario() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("fsroot");
        let disk = local_disk(&root, DiskConfig::new().with("url", "http://example.com"));

        assert!(disk.put("a/b.txt", "hello").await.unwrap());
        assert_eq!(std::fs::read_to_string(root.join("a/b.txt")).unwrap(), "hello");
        assert_eq!(disk.files("a").await.unwrap(), vec!["a/b.txt"]);
        assert_eq!(disk.url("a/b.txt").unwrap(), "http://example.com/a/b.txt");
        assert_eq!(disk.size("a/b.txt").await.unwrap(), 5);
        assert_eq!(
            disk.path(""),
            format!("{}{}", root.to_str().unwrap(), std::path::MAIN_SEPARATOR)
        );
    }

    #[tokio::test]
    async fn test_path_with_prefix() {
        let disk = memory_disk(
            DiskConfig::new()
                .with("root", "/srv/files")
                .with("prefix", "avatars")
                .with("directory_separator", "/"),
            false,
        );
        assert_eq!(disk.path(""), "/srv/files/avatars/");
        assert_eq!(disk.path("me.png"), "/srv/files/avatars/me.png");
    }

    #[tokio::test]
    async fn test_put_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("report.pdf");
        std::fs::write(&source, b"%PDF-1.4").unwrap();

        let disk = memory_disk(DiskConfig::new(), false);
        let stored = disk
            .put_file("uploads", &source, &NameRule::Hash)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.starts_with("uploads/"));
        assert!(stored.ends_with(".pdf"));
        assert_eq!(disk.get(&stored).await.unwrap().unwrap(), Bytes::from("%PDF-1.4"));

        let named = disk.put_file_as("/docs/", &source, "r.pdf").await.unwrap();
        assert_eq!(named.as_deref(), Some("docs/r.pdf"));

        let missing = disk
            .put_file_as("docs", temp.path().join("nope"), "x")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_invalid_visibility_config_fails() {
        let result = Disk::new(
            "bad",
            DiskConfig::new().with("visibility", "everyone"),
            Arc::new(MemoryAdapter::new()),
            false,
        );
        assert!(result.unwrap_err().is_configuration());
    }

    proptest! {
        #[test]
        fn prop_path_starts_with_root(
            root in "/[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            file in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        ) {
            let disk = memory_disk(
                DiskConfig::new().with("root", root.as_str()).with("directory_separator", "/"),
                false,
            );
            let prefix = format!("{root}/");
            prop_assert_eq!(disk.path(""), prefix.clone());
            prop_assert_eq!(disk.path(&file), format!("{prefix}{file}"));
        }
    }
}
