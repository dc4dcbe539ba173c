//! Error types for store operations.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use metastore_codec::CodecError;
use metastore_types::{Element, ElementType, TypeError};
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// The `*Exists` variants carry the collection the new entry collided with
/// so callers can report or resolve the conflict without another lookup.
#[derive(Debug, Error)]
pub enum MetaStoreError {
    /// A namespace with this id already exists.
    #[error("namespace already exists: {namespace}")]
    NamespaceExists {
        namespace: String,
        existing: Vec<String>,
    },

    /// An element type with this id already exists in the namespace.
    #[error("element type already exists: {namespace}/{id}")]
    ElementTypeExists {
        namespace: String,
        id: String,
        existing: Vec<ElementType>,
    },

    /// An element with this id already exists under the element type.
    #[error("element already exists: {namespace}/{type_id}/{id}")]
    ElementExists {
        namespace: String,
        type_id: String,
        id: String,
        existing: Vec<Element>,
    },

    /// The delete target still has children.
    #[error("cannot delete {target}: {} dependent(s) exist", .dependencies.len())]
    DependenciesExist {
        target: String,
        dependencies: Vec<String>,
    },

    /// The namespace, element type or element does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The element type was not loaded from or created in this store.
    #[error("element type {type_id} does not belong to store {store}")]
    ForeignElementType { type_id: String, store: String },

    /// The store lock could not be acquired in time.
    #[error("timed out after {waited:?} waiting for lock {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// I/O error from the underlying filesystem.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A file could not be encoded or decoded.
    #[error("cannot process {}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    /// An id cannot be used as a path component.
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// The store configuration is invalid or unreadable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MetaStoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn codec(path: &Path, source: CodecError) -> Self {
        Self::Codec {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this is an "already exists" conflict of any kind.
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::NamespaceExists { .. } | Self::ElementTypeExists { .. } | Self::ElementExists { .. }
        )
    }
}

/// Convenience type alias for store operations.
pub type StoreResult<T> = Result<T, MetaStoreError>;
