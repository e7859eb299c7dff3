//! Disk manager for resolving and caching named disks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::config::FilesystemConfig;
use crate::disk::Disk;
use stowage_common::{DiskConfig, Error, Result};
use stowage_storage::{create_default_registry, AdapterFactory, AdapterRegistry};

/// Builds a whole disk for a custom type from the manager configuration and
/// the disk's own options.
pub type DiskCreator = Arc<dyn Fn(&FilesystemConfig, &DiskConfig) -> Result<Disk> + Send + Sync>;

/// Resolves disk names to [`Disk`] instances, building each one once.
pub struct DiskManager {
    config: FilesystemConfig,
    registry: AdapterRegistry,
    creators: HashMap<String, DiskCreator>,
    disks: Mutex<HashMap<String, Arc<Disk>>>,
}

impl DiskManager {
    /// Create a manager with the built-in adapters.
    pub fn new(config: FilesystemConfig) -> Self {
        Self::with_registry(config, create_default_registry())
    }

    /// Create with custom registry.
    pub fn with_registry(config: FilesystemConfig, registry: AdapterRegistry) -> Self {
        Self {
            config,
            registry,
            creators: HashMap::new(),
            disks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FilesystemConfig {
        &self.config
    }

    /// Get the adapter registry.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Get mutable adapter registry.
    pub fn registry_mut(&mut self) -> &mut AdapterRegistry {
        &mut self.registry
    }

    /// Register a creator for disks of type `kind`.
    ///
    /// A creator takes precedence over the adapter registry and replaces any
    /// creator registered earlier for the same type.
    pub fn extend<F>(&mut self, kind: impl Into<String>, creator: F) -> &mut Self
    where
        F: Fn(&FilesystemConfig, &DiskConfig) -> Result<Disk> + Send + Sync + 'static,
    {
        self.creators.insert(kind.into(), Arc::new(creator));
        self
    }

    /// Register an adapter factory for disks of type `kind`.
    ///
    /// Unlike [`extend`](Self::extend) the manager still applies the prefix,
    /// read-only and error-mode settings around the adapter.
    pub fn register_adapter(&mut self, kind: impl Into<String>, factory: AdapterFactory) -> &mut Self {
        self.registry.replace(kind, factory);
        self
    }

    /// The named disk, built on first use.
    ///
    /// # Errors
    /// - `Configuration` if the disk is not configured or its type is unknown
    /// - Whatever the adapter factory reports for invalid options
    pub async fn disk(&self, name: &str) -> Result<Arc<Disk>> {
        let mut disks = self.disks.lock().await;
        if let Some(disk) = disks.get(name) {
            return Ok(disk.clone());
        }

        let disk = Arc::new(self.resolve(name)?);
        disks.insert(name.to_string(), disk.clone());
        Ok(disk)
    }

    /// Alias of [`disk`](Self::disk) for cloud-facing call sites.
    pub async fn cloud(&self, name: &str) -> Result<Arc<Disk>> {
        self.disk(name).await
    }

    /// The configured default disk.
    pub async fn default_disk(&self) -> Result<Arc<Disk>> {
        let name = self.config.default_disk()?.to_string();
        self.disk(&name).await
    }

    /// Drop a cached disk so the next access rebuilds it.
    pub async fn forget_disk(&self, name: &str) -> bool {
        self.disks.lock().await.remove(name).is_some()
    }

    /// Use a prebuilt disk for `name`.
    pub async fn set_disk(&self, name: impl Into<String>, disk: Arc<Disk>) {
        self.disks.lock().await.insert(name.into(), disk);
    }

    fn resolve(&self, name: &str) -> Result<Disk> {
        let disk_config = self.config.disk(name)?;
        let kind = disk_config.kind();

        if let Some(creator) = self.creators.get(kind) {
            debug!(disk = name, kind, "Building disk with custom creator");
            let mut disk = creator(&self.config, disk_config)?;
            disk.set_name(name);
            return Ok(disk);
        }

        if self.registry.has_adapter(kind) {
            debug!(disk = name, kind, "Building disk from adapter registry");
            return Disk::from_config(
                name,
                disk_config,
                |config| self.registry.resolve(kind, config),
                self.config.throw,
            );
        }

        Err(Error::Configuration(format!(
            "Driver [{kind}] is not supported."
        )))
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("config", &self.config)
            .field("creators", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}
