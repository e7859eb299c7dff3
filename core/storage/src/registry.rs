//! Adapter registry for resolving a disk `type` to an adapter factory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::local::LocalAdapter;
use crate::memory::MemoryAdapter;
use crate::remote::{RemoteAdapter, RemoteService};
use stowage_common::{DiskConfig, Error, Result};

/// Factory function type for creating adapters from disk options.
pub type AdapterFactory = Arc<dyn Fn(&DiskConfig) -> Result<Arc<dyn Adapter>> + Send + Sync>;

/// Registry for adapter factories, keyed by disk type.
pub struct AdapterRegistry {
    factories: HashMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register an adapter factory.
    ///
    /// # Errors
    /// - Returns `AlreadyExists` if the type is already registered
    pub fn register(&mut self, kind: impl Into<String>, factory: AdapterFactory) -> Result<()> {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            return Err(Error::AlreadyExists(format!(
                "Adapter '{}' is already registered",
                kind
            )));
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Register a factory, replacing any previous one for the type.
    pub fn replace(&mut self, kind: impl Into<String>, factory: AdapterFactory) {
        self.factories.insert(kind.into(), factory);
    }

    /// Build an adapter for `kind` from disk options.
    ///
    /// # Errors
    /// - `Configuration` if the type is not registered
    /// - Whatever the factory reports for invalid options
    pub fn resolve(&self, kind: &str, config: &DiskConfig) -> Result<Arc<dyn Adapter>> {
        let factory = self.factories.get(kind).ok_or_else(|| {
            Error::Configuration(format!("Driver [{}] is not supported.", kind))
        })?;
        factory(config)
    }

    /// Get list of registered adapter types.
    pub fn adapters(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn has_adapter(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn remote_factory(service: RemoteService) -> AdapterFactory {
    Arc::new(move |config: &DiskConfig| -> Result<Arc<dyn Adapter>> {
        Ok(Arc::new(RemoteAdapter::from_config(service, config)?))
    })
}

/// Create a registry with the built-in adapters.
pub fn create_default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();

    registry.replace(
        "local",
        Arc::new(|config: &DiskConfig| -> Result<Arc<dyn Adapter>> {
            Ok(Arc::new(LocalAdapter::from_config(config)?))
        }),
    );
    registry.replace(
        "memory",
        Arc::new(|config: &DiskConfig| -> Result<Arc<dyn Adapter>> {
            Ok(Arc::new(MemoryAdapter::from_config(config)?))
        }),
    );

    for kind in ["ftp", "s3", "aws", "gcs", "google", "oss", "cos", "obs", "qiniu"] {
        if let Some(service) = RemoteService::from_kind(kind) {
            registry.replace(kind, remote_factory(service));
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_factory() -> AdapterFactory {
        Arc::new(|_: &DiskConfig| -> Result<Arc<dyn Adapter>> { Ok(Arc::new(MemoryAdapter::new())) })
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = AdapterRegistry::new();
        registry.register("test", memory_factory()).unwrap();

        let adapter = registry.resolve("test", &DiskConfig::new()).unwrap();
        assert_eq!(adapter.name(), "memory");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = AdapterRegistry::new();
        registry.register("test", memory_factory()).unwrap();

        let result = registry.register("test", memory_factory());
        assert!(result.is_err());

        registry.replace("test", memory_factory());
        assert!(registry.has_adapter("test"));
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let registry = AdapterRegistry::new();
        let err = registry.resolve("dropbox", &DiskConfig::new()).err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Driver [dropbox] is not supported."));
    }

    #[test]
    fn test_default_registry_types() {
        let registry = create_default_registry();
        for kind in ["local", "memory", "ftp", "s3", "aws", "gcs", "google", "oss", "cos", "obs", "qiniu"] {
            assert!(registry.has_adapter(kind), "missing {kind}");
        }
        assert_eq!(registry.adapters().len(), 11);
    }

    #[test]
    fn test_default_registry_builds_local() {
        let dir = tempfile::tempdir().unwrap();
        let registry = create_default_registry();
        let config = DiskConfig::new().with("root", dir.path().to_str().unwrap());
        let adapter = registry.resolve("local", &config).unwrap();
        assert_eq!(adapter.name(), "local");
    }
}
