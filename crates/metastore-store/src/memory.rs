//! In-memory store for testing and ephemeral use.
//!
//! [`InMemoryMetaStore`] keeps the whole hierarchy in ordered maps behind a
//! `RwLock`. It follows the same uniqueness, dependency and delete rules as
//! [`XmlMetaStore`](crate::XmlMetaStore) but has no lock file and no lookup
//! cache. Data is lost when the store is dropped.

use std::collections::BTreeMap;
use std::sync::RwLock;

use metastore_types::{names_match, validate_id, Element, ElementType};

use crate::error::{MetaStoreError, StoreResult};
use crate::traits::MetaStore;

#[derive(Debug, Clone)]
struct TypeEntry {
    element_type: ElementType,
    elements: BTreeMap<String, Element>,
}

type Namespace = BTreeMap<String, TypeEntry>;

/// An in-memory implementation of [`MetaStore`].
#[derive(Debug)]
pub struct InMemoryMetaStore {
    name: String,
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl InMemoryMetaStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: RwLock::new(BTreeMap::new()),
        }
    }

    fn bind(&self, namespace: &str, element_type: &ElementType) -> ElementType {
        let mut bound = element_type.clone();
        bound.namespace = Some(namespace.to_string());
        bound.id = Some(element_type.effective_id().to_string());
        bound.meta_store_name = Some(self.name.clone());
        bound
    }
}

impl Default for InMemoryMetaStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl MetaStore for InMemoryMetaStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_namespaces(&self) -> StoreResult<Vec<String>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces.keys().cloned().collect())
    }

    fn namespace_exists(&self, namespace: &str) -> StoreResult<bool> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces.contains_key(namespace))
    }

    fn create_namespace(&self, namespace: &str) -> StoreResult<()> {
        validate_id("namespace", namespace)?;
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        if namespaces.contains_key(namespace) {
            return Err(MetaStoreError::NamespaceExists {
                namespace: namespace.to_string(),
                existing: namespaces.keys().cloned().collect(),
            });
        }
        namespaces.insert(namespace.to_string(), Namespace::new());
        Ok(())
    }

    fn delete_namespace(&self, namespace: &str) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        if let Some(types) = namespaces.get(namespace) {
            if !types.is_empty() {
                return Err(MetaStoreError::DependenciesExist {
                    target: namespace.to_string(),
                    dependencies: types.keys().cloned().collect(),
                });
            }
        }
        namespaces.remove(namespace);
        Ok(())
    }

    fn get_element_types(&self, namespace: &str) -> StoreResult<Vec<ElementType>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .map(|types| types.values().map(|t| t.element_type.clone()).collect())
            .unwrap_or_default())
    }

    fn get_element_type_ids(&self, namespace: &str) -> StoreResult<Vec<String>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_element_type(&self, namespace: &str, type_id: &str) -> StoreResult<Option<ElementType>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|types| types.get(type_id))
            .map(|t| t.element_type.clone()))
    }

    fn get_element_type_by_name(
        &self,
        namespace: &str,
        type_name: &str,
    ) -> StoreResult<Option<ElementType>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces.get(namespace).and_then(|types| {
            types
                .values()
                .find(|t| names_match(&t.element_type.name, type_name))
                .map(|t| t.element_type.clone())
        }))
    }

    fn create_element_type(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<ElementType> {
        let type_id = element_type.effective_id();
        validate_id("element type", type_id)?;
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let types = namespaces
            .get_mut(namespace)
            .ok_or_else(|| MetaStoreError::not_found("namespace", namespace))?;
        if types.contains_key(type_id) {
            return Err(MetaStoreError::ElementTypeExists {
                namespace: namespace.to_string(),
                id: type_id.to_string(),
                existing: types.values().map(|t| t.element_type.clone()).collect(),
            });
        }
        let stored = self.bind(namespace, element_type);
        types.insert(
            type_id.to_string(),
            TypeEntry {
                element_type: stored.clone(),
                elements: BTreeMap::new(),
            },
        );
        Ok(stored)
    }

    fn update_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()> {
        let type_id = element_type.effective_id();
        let stored = self.bind(namespace, element_type);
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let entry = namespaces
            .get_mut(namespace)
            .and_then(|types| types.get_mut(type_id))
            .ok_or_else(|| {
                MetaStoreError::not_found("element type", format!("{namespace}/{type_id}"))
            })?;
        entry.element_type = stored;
        Ok(())
    }

    fn delete_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()> {
        let type_id = element_type.effective_id();
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let Some(types) = namespaces.get_mut(namespace) else {
            return Ok(());
        };
        if let Some(entry) = types.get(type_id) {
            if !entry.elements.is_empty() {
                return Err(MetaStoreError::DependenciesExist {
                    target: format!("{namespace}/{type_id}"),
                    dependencies: entry.elements.keys().cloned().collect(),
                });
            }
        }
        types.remove(type_id);
        Ok(())
    }

    fn get_elements(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<Vec<Element>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|types| types.get(element_type.effective_id()))
            .map(|t| t.elements.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_element_ids(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<Vec<String>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|types| types.get(element_type.effective_id()))
            .map(|t| t.elements.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<Option<Element>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|types| types.get(element_type.effective_id()))
            .and_then(|t| t.elements.get(element_id))
            .cloned())
    }

    fn get_element_by_name(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> StoreResult<Option<Element>> {
        let namespaces = self.namespaces.read().expect("lock poisoned");
        Ok(namespaces
            .get(namespace)
            .and_then(|types| types.get(element_type.effective_id()))
            .and_then(|t| t.elements.values().find(|e| e.name_matches(element_name)))
            .cloned())
    }

    fn create_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element: &Element,
    ) -> StoreResult<Element> {
        let type_id = element_type.effective_id();
        let element_id = element.effective_id().unwrap_or_default();
        validate_id("element", element_id)?;
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let entry = namespaces
            .get_mut(namespace)
            .and_then(|types| types.get_mut(type_id))
            .ok_or_else(|| {
                MetaStoreError::not_found("element type", format!("{namespace}/{type_id}"))
            })?;
        if entry.elements.contains_key(element_id) {
            return Err(MetaStoreError::ElementExists {
                namespace: namespace.to_string(),
                type_id: type_id.to_string(),
                id: element_id.to_string(),
                existing: entry.elements.values().cloned().collect(),
            });
        }
        let mut stored = element.clone();
        stored.id = Some(element_id.to_string());
        entry.elements.insert(element_id.to_string(), stored.clone());
        Ok(stored)
    }

    fn update_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
        element: &Element,
    ) -> StoreResult<()> {
        let type_id = element_type.effective_id();
        if !element_type.belongs_to(&self.name) {
            return Err(MetaStoreError::ForeignElementType {
                type_id: type_id.to_string(),
                store: self.name.clone(),
            });
        }
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        let slot = namespaces
            .get_mut(namespace)
            .and_then(|types| types.get_mut(type_id))
            .and_then(|t| t.elements.get_mut(element_id))
            .ok_or_else(|| {
                MetaStoreError::not_found("element", format!("{namespace}/{type_id}/{element_id}"))
            })?;
        let mut stored = element.clone();
        stored.id = Some(element_id.to_string());
        *slot = stored;
        Ok(())
    }

    fn delete_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<()> {
        let mut namespaces = self.namespaces.write().expect("lock poisoned");
        if let Some(entry) = namespaces
            .get_mut(namespace)
            .and_then(|types| types.get_mut(element_type.effective_id()))
        {
            entry.elements.remove(element_id);
        }
        Ok(())
    }
}
