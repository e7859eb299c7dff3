//! In-memory storage adapter for testing and ephemeral disks.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::adapter::{
    collect_stream, detect_mime_type, Adapter, AdapterKind, ByteStream, StorageAttributes,
    WriteOptions,
};
use stowage_common::{DiskConfig, Error, Result, StoragePath, Visibility};

/// In-memory storage entry.
#[derive(Debug, Clone)]
enum Entry {
    File {
        data: Bytes,
        visibility: Visibility,
        modified: DateTime<Utc>,
        mime_type: Option<String>,
    },
    Directory {
        visibility: Visibility,
        modified: DateTime<Utc>,
    },
}

impl Entry {
    fn attributes(&self, path: &StoragePath) -> StorageAttributes {
        match self {
            Entry::File {
                data,
                visibility,
                modified,
                mime_type,
            } => StorageAttributes {
                size: Some(data.len() as u64),
                last_modified: Some(*modified),
                visibility: Some(*visibility),
                mime_type: Some(
                    mime_type
                        .clone()
                        .unwrap_or_else(|| detect_mime_type(path, data)),
                ),
                ..StorageAttributes::file(path.clone())
            },
            Entry::Directory {
                visibility,
                modified,
            } => StorageAttributes {
                last_modified: Some(*modified),
                visibility: Some(*visibility),
                ..StorageAttributes::directory(path.clone())
            },
        }
    }
}

/// In-memory storage adapter.
///
/// All data is stored in memory and lost on drop. Clones share storage.
#[derive(Clone)]
pub struct MemoryAdapter {
    storage: Arc<RwLock<BTreeMap<StoragePath, Entry>>>,
    default_visibility: Visibility,
}

impl MemoryAdapter {
    /// Create a new empty memory adapter.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(BTreeMap::new())),
            default_visibility: Visibility::Public,
        }
    }

    pub fn from_config(config: &DiskConfig) -> Result<Self> {
        let mut adapter = Self::new();
        if let Some(visibility) = config.visibility()? {
            adapter.default_visibility = visibility;
        }
        Ok(adapter)
    }

    fn read_storage(&self) -> Result<RwLockReadGuard<'_, BTreeMap<StoragePath, Entry>>> {
        self.storage
            .read()
            .map_err(|_| Error::Storage("memory adapter lock poisoned".to_string()))
    }

    fn write_storage(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<StoragePath, Entry>>> {
        self.storage
            .write()
            .map_err(|_| Error::Storage("memory adapter lock poisoned".to_string()))
    }

    /// Create every missing ancestor of `path` as a directory.
    fn ensure_parents(
        storage: &mut BTreeMap<StoragePath, Entry>,
        path: &StoragePath,
        visibility: Visibility,
    ) -> Result<()> {
        let mut ancestors = Vec::new();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.is_root() {
                break;
            }
            current = dir.parent();
            ancestors.push(dir);
        }

        for dir in ancestors.into_iter().rev() {
            match storage.get(&dir) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(Error::InvalidInput(format!("Parent {dir} is a file")));
                }
                None => {
                    storage.insert(
                        dir,
                        Entry::Directory {
                            visibility,
                            modified: Utc::now(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn insert_file(&self, path: &StoragePath, data: Bytes, options: &WriteOptions) -> Result<()> {
        let mut storage = self.write_storage()?;
        if let Some(Entry::Directory { .. }) = storage.get(path) {
            return Err(Error::InvalidInput(format!("{path} is a directory")));
        }
        Self::ensure_parents(
            &mut storage,
            path,
            options.directory_visibility.unwrap_or(self.default_visibility),
        )?;
        storage.insert(
            path.clone(),
            Entry::File {
                data,
                visibility: options.visibility.unwrap_or(self.default_visibility),
                modified: Utc::now(),
                mime_type: options.mime_type.clone(),
            },
        );
        Ok(())
    }

    fn file_entry(&self, path: &StoragePath) -> Result<Entry> {
        match self.read_storage()?.get(path) {
            Some(entry @ Entry::File { .. }) => Ok(entry.clone()),
            Some(Entry::Directory { .. }) => {
                Err(Error::InvalidInput(format!("{path} is a directory")))
            }
            None => Err(Error::NotFound(format!("File not found: {path}"))),
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Memory
    }

    async fn file_exists(&self, path: &StoragePath) -> Result<bool> {
        Ok(matches!(
            self.read_storage()?.get(path),
            Some(Entry::File { .. })
        ))
    }

    async fn directory_exists(&self, path: &StoragePath) -> Result<bool> {
        if path.is_root() {
            return Ok(true);
        }
        Ok(matches!(
            self.read_storage()?.get(path),
            Some(Entry::Directory { .. })
        ))
    }

    async fn write(&self, path: &StoragePath, contents: Bytes, options: &WriteOptions) -> Result<()> {
        self.insert_file(path, contents, options)
    }

    async fn write_stream(
        &self,
        path: &StoragePath,
        stream: ByteStream,
        options: &WriteOptions,
    ) -> Result<()> {
        let data = collect_stream(stream).await?;
        self.insert_file(path, data, options)
    }

    async fn read(&self, path: &StoragePath) -> Result<Bytes> {
        match self.file_entry(path)? {
            Entry::File { data, .. } => Ok(data),
            Entry::Directory { .. } => Err(Error::InvalidInput(format!("{path} is a directory"))),
        }
    }

    async fn read_stream(&self, path: &StoragePath) -> Result<ByteStream> {
        let data = self.read(path).await?;
        let stream = stream::once(async move { Ok(data) });
        Ok(Box::pin(stream))
    }

    async fn delete(&self, path: &StoragePath) -> Result<()> {
        let mut storage = self.write_storage()?;

        match storage.get(path) {
            Some(Entry::File { .. }) => {
                storage.remove(path);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(Error::InvalidInput(
                "Use delete_directory for directories".to_string(),
            )),
            None => Err(Error::NotFound(format!("File not found: {path}"))),
        }
    }

    async fn delete_directory(&self, path: &StoragePath) -> Result<()> {
        let mut storage = self.write_storage()?;
        if let Some(Entry::File { .. }) = storage.get(path) {
            return Err(Error::InvalidInput(format!("{path} is not a directory")));
        }
        storage.retain(|key, _| key != path && !path.is_ancestor_of(key));
        Ok(())
    }

    async fn create_directory(&self, path: &StoragePath, options: &WriteOptions) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        let visibility = options
            .directory_visibility
            .or(options.visibility)
            .unwrap_or(self.default_visibility);
        let mut storage = self.write_storage()?;
        match storage.get(path) {
            Some(Entry::Directory { .. }) => return Ok(()),
            Some(Entry::File { .. }) => {
                return Err(Error::AlreadyExists(format!("{path} exists as a file")))
            }
            None => {}
        }
        Self::ensure_parents(&mut storage, path, visibility)?;
        storage.insert(
            path.clone(),
            Entry::Directory {
                visibility,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn set_visibility(&self, path: &StoragePath, new_visibility: Visibility) -> Result<()> {
        let mut storage = self.write_storage()?;
        match storage.get_mut(path) {
            Some(Entry::File { visibility, .. }) | Some(Entry::Directory { visibility, .. }) => {
                *visibility = new_visibility;
                Ok(())
            }
            None => Err(Error::NotFound(format!("Path not found: {path}"))),
        }
    }

    async fn visibility(&self, path: &StoragePath) -> Result<Visibility> {
        match self.read_storage()?.get(path) {
            Some(Entry::File { visibility, .. }) | Some(Entry::Directory { visibility, .. }) => {
                Ok(*visibility)
            }
            None => Err(Error::NotFound(format!("Path not found: {path}"))),
        }
    }

    async fn metadata(&self, path: &StoragePath) -> Result<StorageAttributes> {
        Ok(self.file_entry(path)?.attributes(path))
    }

    async fn list_contents(&self, path: &StoragePath, deep: bool) -> Result<Vec<StorageAttributes>> {
        let storage = self.read_storage()?;
        let depth = path.components().len();

        Ok(storage
            .iter()
            .filter(|(key, _)| path.is_ancestor_of(key))
            .filter(|(key, _)| deep || key.components().len() == depth + 1)
            .map(|(key, entry)| entry.attributes(key))
            .collect())
    }

    async fn move_file(
        &self,
        from: &StoragePath,
        to: &StoragePath,
        options: &WriteOptions,
    ) -> Result<()> {
        let entry = self.file_entry(from)?;
        let mut storage = self.write_storage()?;
        Self::ensure_parents(
            &mut storage,
            to,
            options.directory_visibility.unwrap_or(self.default_visibility),
        )?;
        storage.remove(from);
        storage.insert(to.clone(), entry);
        Ok(())
    }

    async fn copy(&self, from: &StoragePath, to: &StoragePath, options: &WriteOptions) -> Result<()> {
        let Entry::File {
            data,
            visibility,
            mime_type,
            ..
        } = self.file_entry(from)?
        else {
            return Err(Error::InvalidInput(format!("{from} is a directory")));
        };
        let options = WriteOptions {
            visibility: options.visibility.or(Some(visibility)),
            mime_type,
            ..options.clone()
        };
        self.insert_file(to, data, &options)
    }
}
