//! Named disks over Stowage storage adapters.
//!
//! This module provides:
//! - Filesystem configuration with named disk entries
//! - A manager that builds each disk once and caches it
//! - The `Disk` driver with its uniform file API and error mode
//! - Streamed HTTP responses and generated upload names
//!
//! # Architecture
//! A `Disk` sits between the caller and an `Operator` from
//! `stowage-storage`, which in turn drives one backend adapter wrapped in
//! the read-only and prefix decorators the disk options ask for.

pub mod config;
pub mod disk;
pub mod manager;
pub mod naming;
pub mod response;

pub use config::{FilesystemConfig, FilesystemConfigBuilder};
pub use disk::{defaults_for, Disk, DEFAULT_SEPARATOR};
pub use manager::{DiskCreator, DiskManager};
pub use naming::NameRule;
pub use response::{content_disposition, fallback_name, Disposition};

pub use stowage_common::{DiskConfig, Error, Result, Visibility};
pub use stowage_storage::{ByteStream, StorageAttributes, WriteOptions};
