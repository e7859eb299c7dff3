//! Common types used throughout Stowage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalized path within a disk, independent of the underlying backend.
///
/// Paths are always relative to the disk root and use `/` between
/// components. The root itself has no components and renders as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoragePath {
    components: Vec<String>,
}

impl StoragePath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Create a path from already-split components.
    ///
    /// # Errors
    /// - Any component is empty, `.`/`..`, or contains a separator or a
    ///   control character
    pub fn from_components(components: Vec<String>) -> crate::Result<Self> {
        for comp in &components {
            if comp.is_empty() || comp == "." || comp == ".." {
                return Err(crate::Error::InvalidPath(format!(
                    "Invalid path component: {comp:?}"
                )));
            }
            if comp.contains('/') || comp.contains('\\') {
                return Err(crate::Error::InvalidPath(
                    "Path component cannot contain separators".to_string(),
                ));
            }
            if comp.chars().any(|c| c.is_control()) {
                return Err(crate::Error::InvalidPath(format!(
                    "Corrupted path component: {comp:?}"
                )));
            }
        }
        Ok(Self { components })
    }

    /// Parse and normalize a caller-supplied path.
    ///
    /// Backslashes are treated as separators, empty and `.` segments are
    /// dropped and `..` removes the preceding segment.
    ///
    /// # Errors
    /// - `PathTraversal` if `..` would climb above the root
    /// - `InvalidPath` if the path contains control characters
    pub fn parse(path: &str) -> crate::Result<Self> {
        if path.chars().any(|c| c.is_control()) {
            return Err(crate::Error::InvalidPath(format!(
                "Corrupted path detected: {path:?}"
            )));
        }

        let mut components: Vec<String> = Vec::new();
        for segment in path.split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if components.pop().is_none() {
                        return Err(crate::Error::PathTraversal(path.to_string()));
                    }
                }
                other => components.push(other.to_string()),
            }
        }
        Ok(Self { components })
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the file/directory name (last component).
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// File extension of the last component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Join this path with a relative path, normalizing the result.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        let child = Self::parse(child)?;
        let mut components = self.components.clone();
        components.extend(child.components);
        Ok(Self { components })
    }

    /// Append another normalized path.
    pub fn concat(&self, other: &StoragePath) -> Self {
        let mut components = self.components.clone();
        components.extend_from_slice(&other.components);
        Self { components }
    }

    /// The remainder of this path below `ancestor`, if it lies below it.
    pub fn strip_ancestor(&self, ancestor: &StoragePath) -> Option<Self> {
        if !ancestor.is_ancestor_of(self) {
            return None;
        }
        Some(Self {
            components: self.components[ancestor.components.len()..].to_vec(),
        })
    }

    /// Whether `other` lies strictly below this path.
    pub fn is_ancestor_of(&self, other: &StoragePath) -> bool {
        other.components.len() > self.components.len()
            && other.components.starts_with(&self.components)
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Render as `a/b/c`; the root renders as an empty string.
    pub fn to_string_path(&self) -> String {
        self.components.join("/")
    }

    /// Render as a directory location, `a/b/` (the root stays empty).
    pub fn to_dir_path(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("{}/", self.to_string_path())
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}

impl FromStr for StoragePath {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

/// Translates disk-relative paths into backend locations under a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixer {
    prefix: String,
    separator: String,
}

impl PathPrefixer {
    /// Build a prefixer. Trailing separators on `prefix` are normalized to
    /// exactly one `separator`; an empty prefix stays empty.
    pub fn new(prefix: &str, separator: &str) -> Self {
        let mut normalized = prefix.trim_end_matches(['/', '\\']).to_string();
        if !normalized.is_empty() || prefix == separator {
            normalized.push_str(separator);
        }
        Self {
            prefix: normalized,
            separator: separator.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn prefix_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches(['/', '\\']))
    }

    /// Remove the prefix from a backend location. Locations outside the
    /// prefix are returned unchanged.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    pub fn strip_directory_prefix<'a>(&self, path: &'a str) -> &'a str {
        self.strip_prefix(path).trim_end_matches(['/', '\\'])
    }

    /// Prefix a directory location, guaranteeing a trailing separator
    /// unless the result is empty.
    pub fn prefix_directory_path(&self, path: &str) -> String {
        let prefixed = self.prefix_path(path.trim_end_matches(['/', '\\']));
        if prefixed.is_empty() || prefixed.ends_with(self.separator.as_str()) {
            prefixed
        } else {
            prefixed + &self.separator
        }
    }
}

/// Portable public/private access classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown visibility '{other}', expected 'public' or 'private'"
            ))),
        }
    }
}
