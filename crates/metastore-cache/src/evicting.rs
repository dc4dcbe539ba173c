use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use metastore_types::ElementType;
use tracing::debug;

use crate::lru::LruMap;
use crate::stats::CacheStats;
use crate::traits::LookupCache;

/// Default number of entries kept per table.
pub const DEFAULT_CAPACITY: usize = 10_000;

type TypeKey = (String, String);
type ElementKey = (String, String, String);

/// Element id plus the type id it was registered under, so a mapping
/// recorded against an old type identity is never served.
#[derive(Debug, Clone)]
struct ElementSlot {
    type_id: String,
    element_id: String,
}

#[derive(Debug)]
struct State {
    /// (namespace, type name) -> type id.
    types: LruMap<TypeKey, String>,
    /// (namespace, type name, element name) -> element slot.
    elements: LruMap<ElementKey, ElementSlot>,
    processed_files: LruMap<PathBuf, SystemTime>,
}

impl State {
    fn drop_elements_of(&mut self, namespace: &str, type_name: &str) {
        self.elements
            .retain(|(ns, t, _), _| !(ns == namespace && t == type_name));
    }

    /// Upsert a type mapping; returns evictions.
    fn upsert_type(&mut self, namespace: &str, type_name: &str, type_id: &str) -> usize {
        let key = (namespace.to_string(), type_name.to_string());
        let mut evicted = 0;
        let changed = match self.types.get(&key, &mut evicted) {
            Some(current) => current != type_id,
            None => false,
        };
        if changed {
            debug!(namespace, type_name, new = type_id, "element type id changed; dropping element ids");
            self.drop_elements_of(namespace, type_name);
        }
        evicted + self.types.insert(key, type_id.to_string())
    }
}

/// Bounded lookup cache whose entries may disappear at any time.
///
/// Each table (type ids, element ids, processed files) is an LRU capped at
/// `capacity` entries. With a time-to-live, entries older than the TTL are
/// also dropped on access. Callers must treat any lookup as a possible
/// miss, even for entries they never unregistered.
#[derive(Debug)]
pub struct EvictingLookupCache {
    state: Mutex<State>,
    stats: CacheStats,
}

impl EvictingLookupCache {
    pub fn new(capacity: usize) -> Self {
        Self::with_ttl(capacity, None)
    }

    pub fn with_ttl(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            state: Mutex::new(State {
                types: LruMap::new(capacity, ttl),
                elements: LruMap::new(capacity, ttl),
                processed_files: LruMap::new(capacity, ttl),
            }),
            stats: CacheStats::default(),
        }
    }

    /// Number of live entries across all tables.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("lock poisoned");
        state.types.len() + state.elements.len() + state.processed_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EvictingLookupCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LookupCache for EvictingLookupCache {
    fn register_element_type_id(&self, namespace: &str, type_name: &str, type_id: &str) {
        let mut state = self.state.lock().expect("lock poisoned");
        let evicted = state.upsert_type(namespace, type_name, type_id);
        self.stats.record_evictions(evicted);
    }

    fn get_element_type_id(&self, namespace: &str, type_name: &str) -> Option<String> {
        let mut state = self.state.lock().expect("lock poisoned");
        let mut evicted = 0;
        let id = state
            .types
            .get(&(namespace.to_string(), type_name.to_string()), &mut evicted)
            .cloned();
        self.stats.record_evictions(evicted);
        self.stats.record_lookup(id.is_some());
        id
    }

    fn unregister_element_type_id(&self, namespace: &str, type_id: &str) {
        let mut state = self.state.lock().expect("lock poisoned");
        let mut names = Vec::new();
        state.types.retain(|(ns, name), id| {
            let doomed = ns == namespace && id == type_id;
            if doomed {
                names.push(name.clone());
            }
            !doomed
        });
        for name in names {
            state.drop_elements_of(namespace, &name);
        }
    }

    fn register_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
        element_id: &str,
    ) {
        let mut state = self.state.lock().expect("lock poisoned");
        let type_id = element_type.effective_id();
        let mut evicted = state.upsert_type(namespace, &element_type.name, type_id);
        evicted += state.elements.insert(
            (
                namespace.to_string(),
                element_type.name.clone(),
                element_name.to_string(),
            ),
            ElementSlot {
                type_id: type_id.to_string(),
                element_id: element_id.to_string(),
            },
        );
        self.stats.record_evictions(evicted);
    }

    fn get_element_id(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> Option<String> {
        let mut state = self.state.lock().expect("lock poisoned");
        let mut evicted = 0;
        let type_key = (namespace.to_string(), element_type.name.clone());
        let current_type = state.types.get(&type_key, &mut evicted).cloned();
        let id = match current_type {
            Some(type_id) if type_id == element_type.effective_id() => state
                .elements
                .get(
                    &(type_key.0, type_key.1, element_name.to_string()),
                    &mut evicted,
                )
                .filter(|slot| slot.type_id == type_id)
                .map(|slot| slot.element_id.clone()),
            _ => None,
        };
        self.stats.record_evictions(evicted);
        self.stats.record_lookup(id.is_some());
        id
    }

    fn unregister_element_id(&self, namespace: &str, element_type: &ElementType, element_id: &str) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.elements.retain(|(ns, t, _), slot| {
            !(ns == namespace && *t == element_type.name && slot.element_id == element_id)
        });
    }

    fn register_processed_file(&self, path: &Path, modified: SystemTime) {
        let mut state = self.state.lock().expect("lock poisoned");
        let evicted = state.processed_files.insert(path.to_path_buf(), modified);
        self.stats.record_evictions(evicted);
    }

    fn processed_files(&self) -> HashMap<PathBuf, SystemTime> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .processed_files
            .iter_live()
            .map(|(path, modified)| (path.clone(), *modified))
            .collect()
    }

    fn unregister_processed_file(&self, path: &Path) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.processed_files.remove(&path.to_path_buf());
    }

    fn clear(&self) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.types.clear();
        state.elements.clear();
        state.processed_files.clear();
    }

    fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
