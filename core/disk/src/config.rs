//! Filesystem configuration: the default disk and the named disk entries.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use stowage_common::{DiskConfig, Error, Result};

/// Configuration shared by every disk of one manager.
///
/// ```json
/// {
///   "default": "local",
///   "throw": false,
///   "disks": {
///     "local": { "type": "local", "root": "/var/data" },
///     "public": { "type": "s3", "bucket": "assets", "url": "https://cdn.example.com" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Disk used when no name is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Strict mode for disks that do not set their own `throw`.
    #[serde(default)]
    pub throw: bool,
    #[serde(default)]
    pub disks: BTreeMap<String, DiskConfig>,
}

impl FilesystemConfig {
    pub fn builder() -> FilesystemConfigBuilder {
        FilesystemConfigBuilder::default()
    }

    /// Parse configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Options of the named disk.
    ///
    /// # Errors
    /// - `Configuration` if no disk has that name
    pub fn disk(&self, name: &str) -> Result<&DiskConfig> {
        self.disks
            .get(name)
            .ok_or_else(|| Error::Configuration(format!("Disk [{name}] not found.")))
    }

    /// Backend type of the named disk.
    pub fn disk_kind(&self, name: &str) -> Result<&str> {
        Ok(self.disk(name)?.kind())
    }

    /// Name of the default disk.
    pub fn default_disk(&self) -> Result<&str> {
        match self.default.as_deref() {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::Configuration(
                "No default disk is configured.".to_string(),
            )),
        }
    }
}

/// Programmatic construction of a [`FilesystemConfig`].
#[derive(Debug, Default)]
pub struct FilesystemConfigBuilder {
    config: FilesystemConfig,
}

impl FilesystemConfigBuilder {
    pub fn default_disk(mut self, name: impl Into<String>) -> Self {
        self.config.default = Some(name.into());
        self
    }

    pub fn throw(mut self, throw: bool) -> Self {
        self.config.throw = throw;
        self
    }

    pub fn disk(mut self, name: impl Into<String>, config: DiskConfig) -> Self {
        self.config.disks.insert(name.into(), config);
        self
    }

    pub fn build(self) -> FilesystemConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "default": "local",
        "disks": {
            "local": { "type": "local", "root": "/tmp/fsroot", "url": "http://example.com" },
            "bare": { "root": "data" }
        }
    }"#;

    #[test]
    fn test_parse_json() {
        let config = FilesystemConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.default_disk().unwrap(), "local");
        assert!(!config.throw);
        assert_eq!(config.disk("local").unwrap().root(), "/tmp/fsroot");
        assert_eq!(config.disk_kind("bare").unwrap(), "local");
    }

    #[test]
    fn test_unknown_disk() {
        let config = FilesystemConfig::from_json_str(SAMPLE).unwrap();
        let err = config.disk("nope").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Disk [nope] not found."));
    }

    #[test]
    fn test_missing_default() {
        let config = FilesystemConfig::builder().build();
        assert!(config.default_disk().unwrap_err().is_configuration());
    }

    #[test]
    fn test_builder_and_round_trip() {
        let config = FilesystemConfig::builder()
            .default_disk("mem")
            .throw(true)
            .disk("mem", DiskConfig::new().with("type", "memory"))
            .build();
        let parsed = FilesystemConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = FilesystemConfig::from_file(file.path()).unwrap();
        assert_eq!(config.disks.len(), 2);

        let err = FilesystemConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_json() {
        let err = FilesystemConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
