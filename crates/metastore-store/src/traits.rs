use metastore_types::{Element, ElementType};

use crate::error::StoreResult;

/// A namespaced metadata store.
///
/// All implementations must satisfy these invariants:
/// - Namespace ids are unique in a store, element-type ids are unique in a
///   namespace, element ids are unique under an element type.
/// - Ids default to the name when the caller leaves them unset, and never
///   change afterwards even if the name does.
/// - A namespace holding element types, or an element type holding
///   elements, cannot be deleted.
/// - Deleting something that is already gone succeeds.
/// - Lookups by id are case-sensitive; lookups by name are not.
pub trait MetaStore: Send + Sync {
    /// Name this store is known by. Element types it returns are bound to it.
    fn name(&self) -> &str;

    fn get_namespaces(&self) -> StoreResult<Vec<String>>;

    fn namespace_exists(&self, namespace: &str) -> StoreResult<bool>;

    /// Fails with `NamespaceExists` if the namespace is already present.
    fn create_namespace(&self, namespace: &str) -> StoreResult<()>;

    /// Fails with `DependenciesExist`, listing the element-type ids, if
    /// the namespace is not empty.
    fn delete_namespace(&self, namespace: &str) -> StoreResult<()>;

    fn get_element_types(&self, namespace: &str) -> StoreResult<Vec<ElementType>>;

    fn get_element_type_ids(&self, namespace: &str) -> StoreResult<Vec<String>>;

    /// Returns `Ok(None)` if there is no element type with this id.
    fn get_element_type(&self, namespace: &str, type_id: &str) -> StoreResult<Option<ElementType>>;

    /// Case-insensitive lookup by name.
    fn get_element_type_by_name(
        &self,
        namespace: &str,
        type_name: &str,
    ) -> StoreResult<Option<ElementType>>;

    /// Create an element type and return it as stored, with its id and
    /// owning store filled in.
    fn create_element_type(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<ElementType>;

    /// Fails with `NotFound` if the element type does not exist.
    fn update_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()>;

    /// Fails with `DependenciesExist`, listing the element ids, if the type
    /// still holds elements.
    fn delete_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()>;

    fn get_elements(&self, namespace: &str, element_type: &ElementType)
        -> StoreResult<Vec<Element>>;

    fn get_element_ids(&self, namespace: &str, element_type: &ElementType)
        -> StoreResult<Vec<String>>;

    /// Returns `Ok(None)` if there is no element with this id.
    fn get_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<Option<Element>>;

    /// Case-insensitive lookup by name.
    fn get_element_by_name(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> StoreResult<Option<Element>>;

    /// Create an element and return it as stored, with its id filled in.
    fn create_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element: &Element,
    ) -> StoreResult<Element>;

    /// Overwrite the element with id `element_id`.
    ///
    /// `element_type` must be bound to this store (see [`MetaStore::name`]).
    fn update_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
        element: &Element,
    ) -> StoreResult<()>;

    fn delete_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<()>;
}
