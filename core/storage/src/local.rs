//! Local filesystem storage adapter.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::adapter::{
    detect_mime_type, Adapter, AdapterKind, ByteStream, StorageAttributes, WriteOptions,
};
use stowage_common::{DiskConfig, Error, Result, StoragePath, Visibility};

/// Unix permission bits used for each visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionMap {
    pub file_public: u32,
    pub file_private: u32,
    pub dir_public: u32,
    pub dir_private: u32,
}

impl Default for PermissionMap {
    fn default() -> Self {
        Self {
            file_public: 0o644,
            file_private: 0o600,
            dir_public: 0o755,
            dir_private: 0o700,
        }
    }
}

impl PermissionMap {
    /// Read overrides from a `permissions` object shaped like
    /// `{"file": {"public": "0644", "private": "0600"}, "dir": {...}}`.
    ///
    /// Modes may be given as octal strings or as plain integers.
    pub fn from_config(config: &DiskConfig) -> Result<Self> {
        let mut map = Self::default();
        let Some(perms) = config.get("permissions") else {
            return Ok(map);
        };
        let slots = [
            ("file", "public", &mut map.file_public),
            ("file", "private", &mut map.file_private),
            ("dir", "public", &mut map.dir_public),
            ("dir", "private", &mut map.dir_private),
        ];
        for (kind, visibility, slot) in slots {
            if let Some(value) = perms.get(kind).and_then(|k| k.get(visibility)) {
                *slot = parse_mode(value).ok_or_else(|| {
                    Error::Configuration(format!(
                        "Invalid permission for {kind}.{visibility}: {value}"
                    ))
                })?;
            }
        }
        Ok(map)
    }

    pub fn for_file(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.file_public,
            Visibility::Private => self.file_private,
        }
    }

    pub fn for_dir(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.dir_public,
            Visibility::Private => self.dir_private,
        }
    }

    /// Map a mode back to a visibility. Unknown modes count as public.
    pub fn inverse_for_file(&self, mode: u32) -> Visibility {
        if mode == self.file_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    pub fn inverse_for_dir(&self, mode: u32) -> Visibility {
        if mode == self.dir_private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

fn parse_mode(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => {
            let digits = s.trim_start_matches("0o");
            u32::from_str_radix(digits, 8).ok()
        }
        _ => None,
    }
}

/// What to do with symbolic links found while listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHandling {
    /// Fail the listing.
    Disallow,
    /// Leave links out of the listing.
    Skip,
}

/// Local filesystem storage adapter.
///
/// Stores files in a directory tree below `root`.
pub struct LocalAdapter {
    root: PathBuf,
    permissions: PermissionMap,
    default_visibility: Visibility,
    default_directory_visibility: Visibility,
    links: LinkHandling,
}

impl LocalAdapter {
    /// Create a new local adapter with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        if !root.exists() {
            std::fs::create_dir_all(&root)?;
        }

        Ok(Self {
            root,
            permissions: PermissionMap::default(),
            default_visibility: Visibility::Private,
            default_directory_visibility: Visibility::Private,
            links: LinkHandling::Disallow,
        })
    }

    /// Build from disk options: `root`, `permissions`, `visibility`,
    /// `directory_visibility` and `links`.
    pub fn from_config(config: &DiskConfig) -> Result<Self> {
        let root = match config.root() {
            "" => ".",
            root => root,
        };
        let visibility = config.visibility()?.unwrap_or(Visibility::Private);
        let mut adapter = Self::new(root)?
            .with_permissions(PermissionMap::from_config(config)?)
            .with_default_visibility(visibility);
        adapter.default_directory_visibility =
            config.directory_visibility()?.unwrap_or(visibility);
        if config.get_str("links") == Some("skip") {
            adapter.links = LinkHandling::Skip;
        }
        Ok(adapter)
    }

    pub fn with_permissions(mut self, permissions: PermissionMap) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_default_visibility(mut self, visibility: Visibility) -> Self {
        self.default_visibility = visibility;
        self
    }

    pub fn with_links(mut self, links: LinkHandling) -> Self {
        self.links = links;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Convert a StoragePath to a filesystem path.
    fn to_fs_path(&self, path: &StoragePath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }

    fn file_visibility(&self, options: &WriteOptions) -> Visibility {
        options.visibility.unwrap_or(self.default_visibility)
    }

    fn dir_visibility(&self, options: &WriteOptions) -> Visibility {
        options
            .directory_visibility
            .unwrap_or(self.default_directory_visibility)
    }

    /// Make sure the directory holding `fs_path` exists.
    async fn ensure_parent(&self, fs_path: &Path, visibility: Visibility) -> Result<()> {
        if let Some(parent) = fs_path.parent() {
            self.ensure_directory(parent, visibility).await?;
        }
        Ok(())
    }

    async fn ensure_directory(&self, dir: &Path, visibility: Visibility) -> Result<()> {
        match fs::metadata(dir).await {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(Error::AlreadyExists(format!(
                    "{} exists and is not a directory",
                    dir.display()
                )))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(dir).await?;
        set_mode(dir, self.permissions.for_dir(visibility)).await
    }

    fn create_attributes(&self, path: StoragePath, fs_meta: &std::fs::Metadata) -> StorageAttributes {
        let last_modified: Option<DateTime<Utc>> = fs_meta.modified().ok().map(Into::into);
        let mode = file_mode(fs_meta);
        if fs_meta.is_dir() {
            StorageAttributes {
                last_modified,
                visibility: mode.map(|m| self.permissions.inverse_for_dir(m)),
                ..StorageAttributes::directory(path)
            }
        } else {
            StorageAttributes {
                size: Some(fs_meta.len()),
                last_modified,
                visibility: mode.map(|m| self.permissions.inverse_for_file(m)),
                ..StorageAttributes::file(path)
            }
        }
    }

    async fn file_metadata(&self, path: &StoragePath) -> Result<std::fs::Metadata> {
        let fs_meta = fs::metadata(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(path, e))?;
        if fs_meta.is_dir() {
            return Err(Error::InvalidInput(format!("{path} is a directory")));
        }
        Ok(fs_meta)
    }
}

/// Map an I/O failure on `path` into the common error taxonomy.
fn io_error(path: &StoragePath, source: io::Error) -> Error {
    match source.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_string()),
        io::ErrorKind::PermissionDenied => Error::NotPermitted(path.to_string()),
        _ => Error::Io(source),
    }
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(meta.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[async_trait]
impl Adapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
        match fs::metadata(self.to_fs_path(path)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
        match fs::metadata(self.to_fs_path(path)).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        self.ensure_parent(&fs_path, self.dir_visibility(options))
            .await?;

        fs::write(&fs_path, &contents)
            .await
            .map_err(|e| io_error(path, e))?;
        set_mode(&fs_path, self.permissions.for_file(self.file_visibility(options))).await?;

        debug!(path = %path, bytes = contents.len(), "Wrote local file");
        Ok(())
    }

    async fn write_stream(
        &self,
        path: &StoragePath,
        mut stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        self.ensure_parent(&fs_path, self.dir_visibility(options))
            .await?;

        let mut file = fs::File::create(&fs_path)
            .await
            .map_err(|e| io_error(path, e))?;
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        drop(file);
        set_mode(&fs_path, self.permissions.for_file(self.file_visibility(options))).await?;

        debug!(path = %path, bytes = written, "Streamed local file");
        Ok(())
    }

    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        self.file_metadata(path).await?;
        let data = fs::read(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(Bytes::from(data))
    }

    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
        self.file_metadata(path).await?;
        let file = fs::File::open(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(Box::pin(ReaderStream::new(file).map_err(Error::from)))
    }

    async fn delete(&self, path: &StoragePath) -> Result<()> {
        self.file_metadata(path).await.map_err(|e| match e {
            Error::InvalidInput(_) => {
                Error::InvalidInput("Use delete_directory for directories".to_string())
            }
            other => other,
        })?;
        fs::remove_file(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        match fs::metadata(&fs_path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(Error::InvalidInput(format!("{path} is not a directory"))),
            // Nothing to delete.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        fs::remove_dir_all(&fs_path)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn create_directory(&self, path: &StoragePath, options: &WriteOptions) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        let visibility = options
            .directory_visibility
            .or(options.visibility)
            .unwrap_or(self.default_directory_visibility);
        self.ensure_directory(&fs_path, visibility).await
    }

    async fn set_visibility(&self, path: &StoragePath, visibility: Visibility) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        let meta = fs::metadata(&fs_path)
            .await
            .map_err(|e| io_error(path, e))?;
        let mode = if meta.is_dir() {
            self.permissions.for_dir(visibility)
        } else {
            self.permissions.for_file(visibility)
        };
        set_mode(&fs_path, mode).await
    }

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
        let meta = fs::metadata(self.to_fs_path(path))
            .await
            .map_err(|e| io_error(path, e))?;
        let Some(mode) = file_mode(&meta) else {
            return Ok(self.default_visibility);
        };
        Ok(if meta.is_dir() {
            self.permissions.inverse_for_dir(mode)
        } else {
            self.permissions.inverse_for_file(mode)
        })
    }

    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
        let fs_meta = self.file_metadata(path).await?;
        let mut attributes = self.create_attributes(path.clone(), &fs_meta);

        let mut head = Vec::new();
        if mime_guess::from_path(path.to_string_path()).first().is_none() {
            let file = fs::File::open(self.to_fs_path(path)).await?;
            file.take(512).read_to_end(&mut head).await?;
        }
        attributes.mime_type = Some(detect_mime_type(path, &head));
        Ok(attributes)
    }

    async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
        let mut results = Vec::new();
        let mut pending = vec![path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(self.to_fs_path(&dir)).await {
                Ok(entries) => entries,
                // Listing a missing directory yields nothing.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let mut components = dir.components().to_vec();
                components.push(name);
                let child = match StoragePath::from_components(components) {
                    Ok(child) => child,
                    Err(e) => {
                        warn!(dir = %dir, error = %e, "Skipping entry with unusable name");
                        continue;
                    }
                };

                if entry.file_type().await?.is_symlink() {
                    match self.links {
                        LinkHandling::Skip => continue,
                        LinkHandling::Disallow => {
                            return Err(Error::NotPermitted(format!(
                                "Symbolic link encountered at {child}"
                            )))
                        }
                    }
                }

                let fs_meta = entry.metadata().await?;
                if deep && fs_meta.is_dir() {
                    pending.push(child.clone());
                }
                results.push(self.create_attributes(child, &fs_meta));
            }
        }

        Ok(results)
    }

    async fn move_file(
        &self,
        from: &StoragePath,
        to: &StoragePath,
        options: &WriteOptions,
    ) -> Result<()> {
        let from_path = self.to_fs_path(from);
        let to_path = self.to_fs_path(to);

        if !self.file_exists(from).await? {
            return Err(Error::NotFound(format!("Source not found: {from}")));
        }
        self.ensure_parent(&to_path, self.dir_visibility(options))
            .await?;

        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| io_error(from, e))
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
        let from_path = self.to_fs_path(from);
        let to_path = self.to_fs_path(to);

        if !self.file_exists(from).await? {
            return Err(Error::NotFound(format!("Source not found: {from}")));
        }
        self.ensure_parent(&to_path, self.dir_visibility(options))
            .await?;

        fs::copy(&from_path, &to_path)
            .await
            .map_err(|e| io_error(from, e))?;
        if let Some(visibility) = options.visibility {
            set_mode(&to_path, self.permissions.for_file(visibility)).await?;
        }
        Ok(())
    }
}
