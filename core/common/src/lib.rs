//! Common utilities and types shared across Stowage crates.
//!
//! This crate provides the error taxonomy, the per-disk option mapping and
//! the path and visibility types that every storage adapter and disk
//! agrees on.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DiskConfig, DEFAULT_DISK_TYPE};
pub use error::{Error, Operation, Result};
pub use types::{PathPrefixer, StoragePath, Visibility};
