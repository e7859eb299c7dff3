//! Common error types for Stowage.

use std::fmt;

use thiserror::Error;

/// Top-level error type for Stowage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Disk or driver configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Write attempted on a read-only disk.
    #[error("Read-only: {0}")]
    ReadOnly(String),

    /// Operation not permitted by the backend.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// The backend has no way to perform this operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Path escapes the disk root.
    #[error("Path traversal detected: {0}")]
    PathTraversal(String),

    /// Path contains characters the disk cannot store.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Opaque failure reported by a storage backend.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file operation failed at the adapter boundary.
    #[error("Unable to {operation} at location: {path}: {source}")]
    Operation {
        operation: Operation,
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an adapter failure with the operation and path it belongs to.
    pub fn operation(operation: Operation, path: impl Into<String>, source: Error) -> Self {
        Error::Operation {
            operation,
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through operation wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Error::NotFound(_))
            || matches!(self.root_cause(), Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self.root_cause(), Error::Configuration(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self.root_cause(), Error::Unsupported(_))
    }
}

/// File operations whose failures are reported as [`Error::Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
    Copy,
    Move,
    Delete,
    DeleteDirectory,
    CreateDirectory,
    SetVisibility,
    RetrieveMetadata,
    List,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Read => "read file",
            Operation::Write => "write file",
            Operation::Copy => "copy file",
            Operation::Move => "move file",
            Operation::Delete => "delete file",
            Operation::DeleteDirectory => "delete directory",
            Operation::CreateDirectory => "create directory",
            Operation::SetVisibility => "set visibility",
            Operation::RetrieveMetadata => "retrieve metadata",
            Operation::List => "list contents",
        };
        f.write_str(s)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
