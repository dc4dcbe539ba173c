use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use metastore_types::ElementType;

use crate::stats::CacheStats;

/// Name-to-id lookup cache shared by the threads of one process.
///
/// All lookups are keyed by namespace first. Implementations must be
/// internally synchronized and must tolerate lookups for entries that were
/// never registered (or were evicted): a miss is always a valid answer.
pub trait LookupCache: Send + Sync {
    /// Record the id of the element type named `type_name`.
    ///
    /// If the name was registered under a different id, the old mapping
    /// and every element mapping beneath it are discarded.
    fn register_element_type_id(&self, namespace: &str, type_name: &str, type_id: &str);

    fn get_element_type_id(&self, namespace: &str, type_name: &str) -> Option<String>;

    /// Remove the mapping whose id is `type_id`, with its element mappings.
    fn unregister_element_type_id(&self, namespace: &str, type_id: &str);

    /// Record the id of an element by name.
    ///
    /// The owning type is (re)registered first from `element_type`'s name
    /// and effective id.
    fn register_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
        element_id: &str,
    );

    /// Look up an element id by name. Returns `None` when the cached type
    /// id no longer matches `element_type`'s effective id.
    fn get_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> Option<String>;

    /// Remove the element mapping whose id is `element_id`, whatever name
    /// it was registered under.
    fn unregister_element_id(&self, namespace: &str, element_type: &ElementType, element_id: &str);

    /// Remember that `path` was parsed while its modification time was
    /// `modified`.
    fn register_processed_file(&self, path: &Path, modified: SystemTime);

    /// Snapshot of every processed file and its recorded modification time.
    fn processed_files(&self) -> HashMap<PathBuf, SystemTime>;

    fn unregister_processed_file(&self, path: &Path);

    /// Drop every mapping and every processed-file entry.
    fn clear(&self);

    fn stats(&self) -> &CacheStats;
}
