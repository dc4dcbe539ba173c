//! Namespaced metadata store engine.
//!
//! A store is a typed hierarchy: namespace → element type → element →
//! attribute tree. [`XmlMetaStore`] persists it as directories and XML
//! files under `<root>/metastore/`:
//!
//! ```text
//! <root>/metastore/<namespace>/<elementTypeId>/.type.xml
//! <root>/metastore/<namespace>/<elementTypeId>/<elementId>.xml
//! <root>/metastore/.lock
//! ```
//!
//! Several threads and processes may open the same root. Every operation
//! runs under a lock file at the store root ([`LockCoordinator`]), and an
//! in-process [`LookupCache`](metastore_cache::LookupCache) saves directory
//! scans for lookups by name. The filesystem stays the system of record: a
//! cache hit is always checked against the file it points to.
//!
//! # Modules
//!
//! - [`error`] — [`MetaStoreError`] and [`StoreResult`]
//! - [`traits`] — The [`MetaStore`] trait shared by all backends
//! - [`fs`] — The [`FileSystem`] adapter and its [`LocalFileSystem`] binding
//! - [`lock`] — Lock-file mutual exclusion with bounded retry
//! - [`config`] — [`StoreConfig`], loadable from TOML
//! - [`xml`] — The filesystem-backed [`XmlMetaStore`]
//! - [`memory`] — [`InMemoryMetaStore`] for tests and embedding

pub mod config;
pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod traits;
pub mod xml;

pub use config::{CacheConfig, CacheStrategy, LockConfig, StoreConfig};
pub use error::{MetaStoreError, StoreResult};
pub use fs::{FileEntry, FileSystem, LocalFileSystem};
pub use lock::{LockCoordinator, LockGuard};
pub use memory::InMemoryMetaStore;
pub use traits::MetaStore;
pub use xml::{ListOptions, XmlMetaStore};
