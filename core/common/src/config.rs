//! Flat per-disk option mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result, Visibility};

/// Backend type used when a disk entry has no `type` key.
pub const DEFAULT_DISK_TYPE: &str = "local";

/// Options for one configured disk.
///
/// This is a flat mapping from option name to JSON value. The common keys
/// (`type`, `root`, `prefix`, `visibility`, `read-only`, `throw`, `url`...)
/// have typed accessors; backend credentials are read with
/// [`get_str`](Self::get_str) and friends by the adapter that needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiskConfig(Map<String, Value>);

impl DiskConfig {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Build from a JSON value. `null` yields an empty config.
    ///
    /// # Errors
    /// - `Configuration` if the value is neither an object nor null
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(Error::Configuration(format!(
                "Disk configuration must be an object, got {other}"
            ))),
        }
    }

    /// Set an option, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// First key among `keys` holding a non-empty string.
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get_str(k))
            .find(|v| !v.is_empty())
    }

    /// Read a string option that must be present and non-empty.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.get_str(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(Error::Configuration(format!(
                "Missing required option '{key}'"
            ))),
        }
    }

    /// Read a boolean, accepting JSON booleans, `0`/`1` and `"true"`/`"false"`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_u64().map(|n| n != 0),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Read an unsigned integer, accepting numbers and numeric strings.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Backend discriminator, `local` when unset.
    pub fn kind(&self) -> &str {
        match self.get_str("type") {
            Some(t) if !t.is_empty() => t,
            _ => DEFAULT_DISK_TYPE,
        }
    }

    pub fn root(&self) -> &str {
        self.get_str("root").unwrap_or("")
    }

    /// The `prefix` option, when set to a non-empty string.
    pub fn prefix(&self) -> Option<&str> {
        self.get_str("prefix").filter(|p| !p.is_empty())
    }

    pub fn directory_separator(&self) -> &str {
        self.get_str("directory_separator")
            .filter(|s| !s.is_empty())
            .unwrap_or(std::path::MAIN_SEPARATOR_STR)
    }

    pub fn visibility(&self) -> Result<Option<Visibility>> {
        self.parse_visibility("visibility")
    }

    pub fn directory_visibility(&self) -> Result<Option<Visibility>> {
        self.parse_visibility("directory_visibility")
    }

    fn parse_visibility(&self, key: &str) -> Result<Option<Visibility>> {
        match self.get_str(key) {
            Some(v) => v.parse().map(Some).map_err(|_| {
                Error::Configuration(format!("Option '{key}' has invalid visibility '{v}'"))
            }),
            None => Ok(None),
        }
    }

    /// True only when `read-only` is explicitly enabled.
    pub fn is_read_only(&self) -> bool {
        self.get_bool("read-only") == Some(true)
    }

    /// The `throw` switch, if present.
    pub fn throws(&self) -> Option<bool> {
        self.get_bool("throw")
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str("url").filter(|u| !u.is_empty())
    }

    pub fn temporary_url(&self) -> Option<&str> {
        self.get_str("temporary_url").filter(|u| !u.is_empty())
    }

    /// Overlay this config on top of `defaults`; keys set here win.
    pub fn merged_over(&self, defaults: &DiskConfig) -> DiskConfig {
        let mut merged = defaults.0.clone();
        for (k, v) in &self.0 {
            merged.insert(k.clone(), v.clone());
        }
        DiskConfig(merged)
    }

    /// A copy holding only the listed keys.
    pub fn only(&self, keys: &[&str]) -> DiskConfig {
        DiskConfig(
            self.0
                .iter()
                .filter(|(k, _)| keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for DiskConfig {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_defaults_to_local() {
        assert_eq!(DiskConfig::new().kind(), "local");
        assert_eq!(DiskConfig::new().with("type", "").kind(), "local");
        assert_eq!(DiskConfig::new().with("type", "s3").kind(), "s3");
    }

    #[test]
    fn test_read_only_requires_true() {
        assert!(!DiskConfig::new().is_read_only());
        assert!(!DiskConfig::new().with("read-only", false).is_read_only());
        assert!(DiskConfig::new().with("read-only", true).is_read_only());
        assert!(DiskConfig::new().with("read-only", "true").is_read_only());
    }

    #[test]
    fn test_visibility_parsing() {
        let config = DiskConfig::new().with("visibility", "public");
        assert_eq!(config.visibility().unwrap(), Some(Visibility::Public));
        assert_eq!(config.directory_visibility().unwrap(), None);

        let bad = DiskConfig::new().with("visibility", "hidden");
        assert!(bad.visibility().unwrap_err().is_configuration());
    }

    #[test]
    fn test_merged_over_prefers_own_keys() {
        let defaults = DiskConfig::new().with("root", "").with("visibility", "private");
        let merged = DiskConfig::new().with("root", "/data").merged_over(&defaults);
        assert_eq!(merged.root(), "/data");
        assert_eq!(merged.get_str("visibility"), Some("private"));
    }

    #[test]
    fn test_from_value() {
        let config = DiskConfig::from_value(json!({"type": "ftp", "port": "2121"})).unwrap();
        assert_eq!(config.kind(), "ftp");
        assert_eq!(config.get_u64("port"), Some(2121));
        assert!(DiskConfig::from_value(Value::Null).unwrap().as_map().is_empty());
        assert!(DiskConfig::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_require_and_first_str() {
        let config = DiskConfig::new().with("key", "").with("access_key", "ak");
        assert!(config.require_str("key").is_err());
        assert_eq!(config.first_str(&["key", "access_key"]), Some("ak"));
        assert_eq!(config.only(&["key"]).as_map().len(), 1);
    }
}
