use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use metastore_types::ElementType;
use tracing::debug;

use crate::stats::CacheStats;
use crate::traits::LookupCache;

#[derive(Debug)]
struct TypeEntry {
    id: String,
    /// Element name -> element id.
    elements: HashMap<String, String>,
}

impl TypeEntry {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            elements: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// Namespace -> element-type name -> entry.
    namespaces: HashMap<String, HashMap<String, TypeEntry>>,
    processed_files: HashMap<PathBuf, SystemTime>,
}

impl State {
    fn upsert_type(&mut self, namespace: &str, type_name: &str, type_id: &str) -> &mut TypeEntry {
        let types = self.namespaces.entry(namespace.to_string()).or_default();
        let entry = types
            .entry(type_name.to_string())
            .or_insert_with(|| TypeEntry::new(type_id));
        if entry.id != type_id {
            debug!(namespace, type_name, old = %entry.id, new = type_id, "element type id changed; dropping element ids");
            *entry = TypeEntry::new(type_id);
        }
        entry
    }

    fn current_type(&self, namespace: &str, element_type: &ElementType) -> Option<&TypeEntry> {
        self.namespaces
            .get(namespace)?
            .get(&element_type.name)
            .filter(|entry| entry.id == element_type.effective_id())
    }
}

/// Lookup cache that keeps every entry until it is unregistered or the
/// cache is cleared.
///
/// All state lives in nested `HashMap`s behind one `RwLock`.
#[derive(Debug, Default)]
pub struct PersistentLookupCache {
    state: RwLock<State>,
    stats: CacheStats,
}

impl PersistentLookupCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LookupCache for PersistentLookupCache {
    fn register_element_type_id(&self, namespace: &str, type_name: &str, type_id: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        state.upsert_type(namespace, type_name, type_id);
    }

    fn get_element_type_id(&self, namespace: &str, type_name: &str) -> Option<String> {
        let state = self.state.read().expect("lock poisoned");
        let id = state
            .namespaces
            .get(namespace)
            .and_then(|types| types.get(type_name))
            .map(|entry| entry.id.clone());
        self.stats.record_lookup(id.is_some());
        id
    }

    fn unregister_element_type_id(&self, namespace: &str, type_id: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(types) = state.namespaces.get_mut(namespace) {
            types.retain(|_, entry| entry.id != type_id);
        }
    }

    fn register_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
        element_id: &str,
    ) {
        let mut state = self.state.write().expect("lock poisoned");
        let entry = state.upsert_type(namespace, &element_type.name, element_type.effective_id());
        entry
            .elements
            .insert(element_name.to_string(), element_id.to_string());
    }

    fn get_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> Option<String> {
        let state = self.state.read().expect("lock poisoned");
        let id = state
            .current_type(namespace, element_type)
            .and_then(|entry| entry.elements.get(element_name))
            .cloned();
        self.stats.record_lookup(id.is_some());
        id
    }

    fn unregister_element_id(&self, namespace: &str, element_type: &ElementType, element_id: &str) {
        let mut state = self.state.write().expect("lock poisoned");
        if let Some(entry) = state
            .namespaces
            .get_mut(namespace)
            .and_then(|types| types.get_mut(&element_type.name))
        {
            entry.elements.retain(|_, id| id != element_id);
        }
    }

    fn register_processed_file(&self, path: &Path, modified: SystemTime) {
        let mut state = self.state.write().expect("lock poisoned");
        state.processed_files.insert(path.to_path_buf(), modified);
    }

    fn processed_files(&self) -> HashMap<PathBuf, SystemTime> {
        self.state.read().expect("lock poisoned").processed_files.clone()
    }

    fn unregister_processed_file(&self, path: &Path) {
        let mut state = self.state.write().expect("lock poisoned");
        state.processed_files.remove(path);
    }

    fn clear(&self) {
        let mut state = self.state.write().expect("lock poisoned");
        state.namespaces.clear();
        state.processed_files.clear();
    }

    fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
