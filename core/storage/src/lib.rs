//! Storage adapters for Stowage.
//!
//! This crate provides a trait-based interface for the storage backends a
//! disk can sit on (local filesystem, memory, FTP and object stores through
//! OpenDAL), decorators for read-only and path-prefixed access, an
//! [`Operator`] that addresses adapters by string path, and an adapter
//! registry for resolving a disk `type`.
//!
//! # Design Principles
//! - Adapter isolation: no backend-specific logic above this crate
//! - Async operations: all I/O operations are async
//! - Streaming support: large files are handled via streams
//! - Unified error semantics: consistent error types across adapters

pub mod adapter;
pub mod local;
pub mod memory;
pub mod operator;
pub mod prefixed;
pub mod read_only;
pub mod registry;
pub mod remote;

pub use adapter::{
    collect_stream, detect_mime_type, Adapter, AdapterKind, ByteStream, EntryKind,
    StorageAttributes, WriteOptions,
};
pub use local::{LinkHandling, LocalAdapter, PermissionMap};
pub use memory::MemoryAdapter;
pub use operator::{concat_path_to_url, Operator, OperatorConfig};
pub use prefixed::PrefixedAdapter;
pub use read_only::ReadOnlyAdapter;
pub use registry::{create_default_registry, AdapterFactory, AdapterRegistry};
pub use remote::{RemoteAdapter, RemoteOptions, RemoteService};
