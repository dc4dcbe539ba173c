//! Filesystem-backed store engine.
//!
//! [`XmlMetaStore`] maps the store hierarchy onto directories and XML
//! files under `<root>/metastore/`. Each public operation takes the store
//! lock for its whole duration; the `*_nolock` helpers assume the caller
//! already holds it, so larger sequences (a delete that first lists its
//! dependents) never try to take the lock twice.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use metastore_cache::LookupCache;
use metastore_codec::XmlCodec;
use metastore_types::{names_match, validate_id, Element, ElementType, TypeError};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::{MetaStoreError, StoreResult};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::lock::LockCoordinator;
use crate::traits::MetaStore;

/// Folder created under the configured root to hold the store.
pub const STORE_FOLDER: &str = "metastore";

/// Element-type metadata file inside each element-type directory.
pub const TYPE_FILE_NAME: &str = ".type.xml";

const ELEMENT_EXTENSION: &str = ".xml";

/// Options for element listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Leave out files already parsed by this process whose modification
    /// time has not changed since.
    pub skip_unchanged: bool,
}

/// A store persisted as a directory tree of XML files.
pub struct XmlMetaStore {
    name: String,
    root_folder: PathBuf,
    fs: Arc<dyn FileSystem>,
    lock: LockCoordinator,
    cache: Arc<dyn LookupCache>,
}

impl fmt::Debug for XmlMetaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlMetaStore")
            .field("name", &self.name)
            .field("root_folder", &self.root_folder)
            .finish_non_exhaustive()
    }
}

/// Reject ids that would escape their parent directory.
///
/// Full [`validate_id`] rules apply only when something is created; reads
/// and deletes accept any single path component so existing entries stay
/// reachable.
fn check_component(kind: &'static str, id: &str) -> StoreResult<()> {
    let bad = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(|c: char| c == '/' || c == '\\' || c == '\0');
    if bad {
        return Err(TypeError::InvalidName {
            kind,
            name: id.to_string(),
            reason: "is not a single path component".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Push `err` onto `errors` if the caller collects them, else fail with it.
fn record(errors: Option<&mut Vec<MetaStoreError>>, err: MetaStoreError) -> StoreResult<()> {
    match errors {
        Some(errors) => {
            warn!(error = %err, "skipping unreadable entry");
            errors.push(err);
            Ok(())
        }
        None => Err(err),
    }
}

fn element_id_of(file_name: &str) -> Option<&str> {
    if file_name == TYPE_FILE_NAME {
        return None;
    }
    file_name
        .strip_suffix(ELEMENT_EXTENSION)
        .filter(|stem| !stem.is_empty())
}

impl XmlMetaStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        Self::with_parts(config, Arc::new(LocalFileSystem), config.cache.build())
    }

    /// Open the store under `root` with default settings.
    pub fn open_at(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open(&StoreConfig::new(root))
    }

    /// Open a store over an explicit filesystem adapter and cache.
    pub fn with_parts(
        config: &StoreConfig,
        fs: Arc<dyn FileSystem>,
        cache: Arc<dyn LookupCache>,
    ) -> StoreResult<Self> {
        let root_folder = config.store_folder();
        fs.create_dir(&root_folder)
            .map_err(|e| MetaStoreError::io(&root_folder, e))?;
        let lock = LockCoordinator::new(Arc::clone(&fs), &root_folder, &config.lock);
        debug!(root = %root_folder.display(), "opened store");
        Ok(Self {
            name: config.store_name(),
            root_folder,
            fs,
            lock,
            cache,
        })
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn cache(&self) -> &dyn LookupCache {
        self.cache.as_ref()
    }

    pub fn lock(&self) -> &LockCoordinator {
        &self.lock
    }

    /// List element types, collecting unreadable ones into `errors` when
    /// given instead of failing on the first.
    pub fn get_element_types_with(
        &self,
        namespace: &str,
        errors: Option<&mut Vec<MetaStoreError>>,
    ) -> StoreResult<Vec<ElementType>> {
        check_component("namespace", namespace)?;
        self.locked(|| self.element_types_nolock(namespace, errors))
    }

    /// List elements with `options`, collecting unreadable files into
    /// `errors` when given instead of failing on the first.
    pub fn get_elements_with(
        &self,
        namespace: &str,
        element_type: &ElementType,
        options: ListOptions,
        errors: Option<&mut Vec<MetaStoreError>>,
    ) -> StoreResult<Vec<Element>> {
        check_component("namespace", namespace)?;
        check_component("element type", element_type.effective_id())?;
        self.locked(|| self.elements_nolock(namespace, element_type, options, errors))
    }

    fn locked<T>(&self, op: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.lock.acquire()?;
        op()
    }

    // -- paths --

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root_folder.join(namespace)
    }

    fn type_dir(&self, namespace: &str, type_id: &str) -> PathBuf {
        self.namespace_dir(namespace).join(type_id)
    }

    fn type_file(&self, namespace: &str, type_id: &str) -> PathBuf {
        self.type_dir(namespace, type_id).join(TYPE_FILE_NAME)
    }

    fn element_file(&self, namespace: &str, type_id: &str, element_id: &str) -> PathBuf {
        self.type_dir(namespace, type_id)
            .join(format!("{element_id}{ELEMENT_EXTENSION}"))
    }

    // -- filesystem helpers --

    fn read(&self, path: &Path) -> StoreResult<String> {
        self.fs
            .read_to_string(path)
            .map_err(|e| MetaStoreError::io(path, e))
    }

    fn write(&self, path: &Path, contents: &str) -> StoreResult<()> {
        self.fs
            .write(path, contents)
            .map_err(|e| MetaStoreError::io(path, e))
    }

    fn delete(&self, path: &Path) -> StoreResult<bool> {
        self.fs.delete(path).map_err(|e| MetaStoreError::io(path, e))
    }

    // -- namespaces --

    fn namespaces_nolock(&self) -> StoreResult<Vec<String>> {
        if !self.fs.path_exists(&self.root_folder) {
            return Ok(Vec::new());
        }
        self.fs
            .list_folders(&self.root_folder)
            .map_err(|e| MetaStoreError::io(&self.root_folder, e))
    }

    fn namespace_exists_nolock(&self, namespace: &str) -> bool {
        self.fs.path_exists(&self.namespace_dir(namespace))
    }

    // -- element types --

    fn element_type_ids_nolock(&self, namespace: &str) -> StoreResult<Vec<String>> {
        let dir = self.namespace_dir(namespace);
        if !self.fs.path_exists(&dir) {
            return Ok(Vec::new());
        }
        let folders = self
            .fs
            .list_folders(&dir)
            .map_err(|e| MetaStoreError::io(&dir, e))?;
        Ok(folders
            .into_iter()
            .filter(|id| self.fs.path_exists(&self.type_file(namespace, id)))
            .collect())
    }

    /// Load the element type stored under `type_id`, binding it to this
    /// store and recording its id in the cache.
    fn load_element_type(&self, namespace: &str, type_id: &str) -> StoreResult<Option<ElementType>> {
        let path = self.type_file(namespace, type_id);
        if !self.fs.path_exists(&path) {
            return Ok(None);
        }
        let xml = self.read(&path)?;
        let mut element_type =
            XmlCodec::decode_element_type(&xml).map_err(|e| MetaStoreError::codec(&path, e))?;
        element_type.namespace = Some(namespace.to_string());
        element_type.id = Some(type_id.to_string());
        element_type.meta_store_name = Some(self.name.clone());
        self.cache
            .register_element_type_id(namespace, &element_type.name, type_id);
        Ok(Some(element_type))
    }

    fn element_types_nolock(
        &self,
        namespace: &str,
        mut errors: Option<&mut Vec<MetaStoreError>>,
    ) -> StoreResult<Vec<ElementType>> {
        let mut types = Vec::new();
        for id in self.element_type_ids_nolock(namespace)? {
            match self.load_element_type(namespace, &id) {
                Ok(Some(element_type)) => types.push(element_type),
                Ok(None) => {}
                Err(e) => record(errors.as_deref_mut(), e)?,
            }
        }
        Ok(types)
    }

    /// Element types that could be read, skipping the rest.
    fn element_types_lenient(&self, namespace: &str) -> StoreResult<Vec<ElementType>> {
        let mut skipped = Vec::new();
        self.element_types_nolock(namespace, Some(&mut skipped))
    }

    fn element_type_by_name_nolock(
        &self,
        namespace: &str,
        type_name: &str,
    ) -> StoreResult<Option<ElementType>> {
        if let Some(id) = self.cache.get_element_type_id(namespace, type_name) {
            match self.load_element_type(namespace, &id) {
                Ok(Some(found)) if names_match(&found.name, type_name) => {
                    return Ok(Some(found));
                }
                Ok(_) => warn!(namespace, type_name, id = %id, "stale element type id in cache"),
                Err(e) => warn!(namespace, type_name, id = %id, error = %e, "cached element type unreadable"),
            }
            self.cache.unregister_element_type_id(namespace, &id);
        }
        Ok(self
            .element_types_lenient(namespace)?
            .into_iter()
            .find(|t| names_match(&t.name, type_name)))
    }

    /// Visible entries of a type folder that are neither the type file nor
    /// element files.
    fn stray_entries_nolock(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let mut strays: Vec<String> = self
            .fs
            .list_files(dir, None)
            .map_err(|e| MetaStoreError::io(dir, e))?
            .into_iter()
            .filter(|f| element_id_of(&f.name).is_none())
            .map(|f| f.name)
            .collect();
        strays.extend(
            self.fs
                .list_folders(dir)
                .map_err(|e| MetaStoreError::io(dir, e))?,
        );
        strays.sort();
        Ok(strays)
    }

    // -- elements --

    fn element_ids_nolock(&self, namespace: &str, type_id: &str) -> StoreResult<Vec<String>> {
        let dir = self.type_dir(namespace, type_id);
        if !self.fs.path_exists(&dir) {
            return Ok(Vec::new());
        }
        let files = self
            .fs
            .list_files(&dir, None)
            .map_err(|e| MetaStoreError::io(&dir, e))?;
        Ok(files
            .iter()
            .filter_map(|f| element_id_of(&f.name).map(str::to_string))
            .collect())
    }

    /// Parse an element file. The id is always the file's stem.
    fn load_element(&self, path: &Path, element_id: &str) -> StoreResult<Element> {
        let xml = self.read(path)?;
        let mut element = XmlCodec::decode_element(&xml).map_err(|e| MetaStoreError::codec(path, e))?;
        if element.id.as_deref().is_some_and(|stored| stored != element_id) {
            debug!(path = %path.display(), "element id differs from file name; using file name");
        }
        element.id = Some(element_id.to_string());
        Ok(element)
    }

    fn remember_element(&self, namespace: &str, element_type: &ElementType, element: &Element) {
        if let (Some(name), Some(id)) = (element.name.as_deref(), element.id.as_deref()) {
            self.cache
                .register_element_id(namespace, element_type, name, id);
        }
    }

    fn elements_nolock(
        &self,
        namespace: &str,
        element_type: &ElementType,
        options: ListOptions,
        mut errors: Option<&mut Vec<MetaStoreError>>,
    ) -> StoreResult<Vec<Element>> {
        let dir = self.type_dir(namespace, element_type.effective_id());
        if !self.fs.path_exists(&dir) {
            return Ok(Vec::new());
        }
        let known = options.skip_unchanged.then(|| self.cache.processed_files());
        let files = self
            .fs
            .list_files(&dir, known.as_ref())
            .map_err(|e| MetaStoreError::io(&dir, e))?;

        let mut elements = Vec::new();
        for file in &files {
            let Some(id) = element_id_of(&file.name) else {
                continue;
            };
            match self.load_element(&file.path, id) {
                Ok(element) => {
                    self.cache.register_processed_file(&file.path, file.modified);
                    self.remember_element(namespace, element_type, &element);
                    elements.push(element);
                }
                Err(e) => record(errors.as_deref_mut(), e)?,
            }
        }
        Ok(elements)
    }

    fn elements_lenient(&self, namespace: &str, element_type: &ElementType) -> StoreResult<Vec<Element>> {
        let mut skipped = Vec::new();
        self.elements_nolock(namespace, element_type, ListOptions::default(), Some(&mut skipped))
    }

    fn element_nolock(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<Option<Element>> {
        let path = self.element_file(namespace, element_type.effective_id(), element_id);
        if !self.fs.path_exists(&path) {
            return Ok(None);
        }
        let element = self.load_element(&path, element_id)?;
        self.remember_element(namespace, element_type, &element);
        Ok(Some(element))
    }

    fn element_by_name_nolock(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> StoreResult<Option<Element>> {
        if let Some(id) = self.cache.get_element_id(namespace, element_type, element_name) {
            match self.element_nolock(namespace, element_type, &id) {
                Ok(Some(found)) if found.name_matches(element_name) => return Ok(Some(found)),
                Ok(_) => warn!(namespace, element_name, id = %id, "stale element id in cache"),
                Err(e) => warn!(namespace, element_name, id = %id, error = %e, "cached element unreadable"),
            }
            self.cache.unregister_element_id(namespace, element_type, &id);
        }
        Ok(self
            .elements_lenient(namespace, element_type)?
            .into_iter()
            .find(|e| e.name_matches(element_name)))
    }
}

impl MetaStore for XmlMetaStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_namespaces(&self) -> StoreResult<Vec<String>> {
        self.locked(|| self.namespaces_nolock())
    }

    fn namespace_exists(&self, namespace: &str) -> StoreResult<bool> {
        check_component("namespace", namespace)?;
        self.locked(|| Ok(self.namespace_exists_nolock(namespace)))
    }

    fn create_namespace(&self, namespace: &str) -> StoreResult<()> {
        validate_id("namespace", namespace)?;
        self.locked(|| {
            if self.namespace_exists_nolock(namespace) {
                return Err(MetaStoreError::NamespaceExists {
                    namespace: namespace.to_string(),
                    existing: self.namespaces_nolock()?,
                });
            }
            let dir = self.namespace_dir(namespace);
            self.fs
                .create_dir(&dir)
                .map_err(|e| MetaStoreError::io(&dir, e))?;
            debug!(namespace, "created namespace");
            Ok(())
        })
    }

    fn delete_namespace(&self, namespace: &str) -> StoreResult<()> {
        check_component("namespace", namespace)?;
        self.locked(|| {
            let dir = self.namespace_dir(namespace);
            if !self.fs.path_exists(&dir) {
                return Ok(());
            }
            let dependencies = self.element_type_ids_nolock(namespace)?;
            if !dependencies.is_empty() {
                return Err(MetaStoreError::DependenciesExist {
                    target: namespace.to_string(),
                    dependencies,
                });
            }
            self.delete(&dir)?;
            debug!(namespace, "deleted namespace");
            Ok(())
        })
    }

    fn get_element_types(&self, namespace: &str) -> StoreResult<Vec<ElementType>> {
        self.get_element_types_with(namespace, None)
    }

    fn get_element_type_ids(&self, namespace: &str) -> StoreResult<Vec<String>> {
        check_component("namespace", namespace)?;
        self.locked(|| self.element_type_ids_nolock(namespace))
    }

    fn get_element_type(&self, namespace: &str, type_id: &str) -> StoreResult<Option<ElementType>> {
        check_component("namespace", namespace)?;
        check_component("element type", type_id)?;
        self.locked(|| self.load_element_type(namespace, type_id))
    }

    fn get_element_type_by_name(
        &self,
        namespace: &str,
        type_name: &str,
    ) -> StoreResult<Option<ElementType>> {
        check_component("namespace", namespace)?;
        self.locked(|| self.element_type_by_name_nolock(namespace, type_name))
    }

    fn create_element_type(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<ElementType> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        validate_id("element type", type_id)?;

        let mut stored = element_type.clone();
        stored.namespace = Some(namespace.to_string());
        stored.id = Some(type_id.to_string());
        stored.meta_store_name = Some(self.name.clone());
        let xml = XmlCodec::encode_element_type(&stored)
            .map_err(|e| MetaStoreError::codec(&self.type_file(namespace, type_id), e))?;

        self.locked(|| {
            if !self.namespace_exists_nolock(namespace) {
                return Err(MetaStoreError::not_found("namespace", namespace));
            }
            let dir = self.type_dir(namespace, type_id);
            let file = self.type_file(namespace, type_id);
            if self.fs.path_exists(&file) {
                return Err(MetaStoreError::ElementTypeExists {
                    namespace: namespace.to_string(),
                    id: type_id.to_string(),
                    existing: self.element_types_lenient(namespace)?,
                });
            }

            let created_dir = !self.fs.path_exists(&dir);
            self.fs
                .create_dir(&dir)
                .map_err(|e| MetaStoreError::io(&dir, e))?;
            if let Err(e) = self.write(&file, &xml) {
                if created_dir {
                    if let Err(cleanup) = self.fs.delete(&dir) {
                        warn!(path = %dir.display(), error = %cleanup, "failed to remove element type directory");
                    }
                }
                return Err(e);
            }

            self.cache
                .register_element_type_id(namespace, &stored.name, type_id);
            debug!(namespace, type_id, "created element type");
            Ok(stored)
        })
    }

    fn update_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        check_component("element type", type_id)?;
        let file = self.type_file(namespace, type_id);
        let xml = XmlCodec::encode_element_type(element_type)
            .map_err(|e| MetaStoreError::codec(&file, e))?;

        self.locked(|| {
            if !self.fs.path_exists(&file) {
                return Err(MetaStoreError::not_found(
                    "element type",
                    format!("{namespace}/{type_id}"),
                ));
            }
            self.write(&file, &xml)?;
            // The name may have changed; drop whatever the old name mapped to.
            self.cache.unregister_element_type_id(namespace, type_id);
            self.cache
                .register_element_type_id(namespace, &element_type.name, type_id);
            debug!(namespace, type_id, "updated element type");
            Ok(())
        })
    }

    fn delete_element_type(&self, namespace: &str, element_type: &ElementType) -> StoreResult<()> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        check_component("element type", type_id)?;

        self.locked(|| {
            let dir = self.type_dir(namespace, type_id);
            if !self.fs.path_exists(&dir) {
                return Ok(());
            }
            let dependencies = self.element_ids_nolock(namespace, type_id)?;
            if !dependencies.is_empty() {
                return Err(MetaStoreError::DependenciesExist {
                    target: format!("{namespace}/{type_id}"),
                    dependencies,
                });
            }
            let strays = self.stray_entries_nolock(&dir)?;
            if !strays.is_empty() {
                return Err(MetaStoreError::DependenciesExist {
                    target: format!("{namespace}/{type_id}"),
                    dependencies: strays,
                });
            }

            // Hidden entries are not listed, so the directory delete can
            // still fail; put the type file back when it does.
            let type_file = self.type_file(namespace, type_id);
            let saved = if self.fs.path_exists(&type_file) {
                Some(self.read(&type_file)?)
            } else {
                None
            };
            self.delete(&type_file)?;
            if let Err(e) = self.delete(&dir) {
                if let Some(contents) = saved {
                    self.write(&type_file, &contents)?;
                }
                warn!(namespace, type_id, error = %e, "element type folder not empty, type kept");
                return Err(e);
            }
            self.cache.unregister_element_type_id(namespace, type_id);
            debug!(namespace, type_id, "deleted element type");
            Ok(())
        })
    }

    fn get_elements(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<Vec<Element>> {
        self.get_elements_with(namespace, element_type, ListOptions::default(), None)
    }

    fn get_element_ids(
        &self,
        namespace: &str,
        element_type: &ElementType,
    ) -> StoreResult<Vec<String>> {
        check_component("namespace", namespace)?;
        check_component("element type", element_type.effective_id())?;
        self.locked(|| self.element_ids_nolock(namespace, element_type.effective_id()))
    }

    fn get_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<Option<Element>> {
        check_component("namespace", namespace)?;
        check_component("element type", element_type.effective_id())?;
        check_component("element", element_id)?;
        self.locked(|| self.element_nolock(namespace, element_type, element_id))
    }

    fn get_element_by_name(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_name: &str,
    ) -> StoreResult<Option<Element>> {
        check_component("namespace", namespace)?;
        check_component("element type", element_type.effective_id())?;
        self.locked(|| self.element_by_name_nolock(namespace, element_type, element_name))
    }

    fn create_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element: &Element,
    ) -> StoreResult<Element> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        check_component("element type", type_id)?;
        let element_id = element.effective_id().unwrap_or_default();
        validate_id("element", element_id)?;

        let mut stored = element.clone();
        stored.id = Some(element_id.to_string());
        let file = self.element_file(namespace, type_id, element_id);
        let xml = XmlCodec::encode_element(&stored).map_err(|e| MetaStoreError::codec(&file, e))?;

        self.locked(|| {
            if !self.fs.path_exists(&self.type_file(namespace, type_id)) {
                return Err(MetaStoreError::not_found(
                    "element type",
                    format!("{namespace}/{type_id}"),
                ));
            }
            if self.fs.path_exists(&file) {
                return Err(MetaStoreError::ElementExists {
                    namespace: namespace.to_string(),
                    type_id: type_id.to_string(),
                    id: element_id.to_string(),
                    existing: self.elements_lenient(namespace, element_type)?,
                });
            }
            self.write(&file, &xml)?;
            self.remember_element(namespace, element_type, &stored);
            debug!(namespace, type_id, element_id, "created element");
            Ok(stored)
        })
    }

    fn update_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
        element: &Element,
    ) -> StoreResult<()> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        check_component("element type", type_id)?;
        check_component("element", element_id)?;
        if !element_type.belongs_to(&self.name) {
            return Err(MetaStoreError::ForeignElementType {
                type_id: type_id.to_string(),
                store: self.name.clone(),
            });
        }

        let mut stored = element.clone();
        stored.id = Some(element_id.to_string());
        let file = self.element_file(namespace, type_id, element_id);
        let xml = XmlCodec::encode_element(&stored).map_err(|e| MetaStoreError::codec(&file, e))?;

        self.locked(|| {
            if !self.fs.path_exists(&file) {
                return Err(MetaStoreError::not_found(
                    "element",
                    format!("{namespace}/{type_id}/{element_id}"),
                ));
            }
            self.write(&file, &xml)?;
            self.cache.unregister_processed_file(&file);
            self.cache
                .unregister_element_id(namespace, element_type, element_id);
            self.remember_element(namespace, element_type, &stored);
            debug!(namespace, type_id, element_id, "updated element");
            Ok(())
        })
    }

    fn delete_element(
        &self,
        namespace: &str,
        element_type: &ElementType,
        element_id: &str,
    ) -> StoreResult<()> {
        check_component("namespace", namespace)?;
        let type_id = element_type.effective_id();
        check_component("element type", type_id)?;
        check_component("element", element_id)?;

        self.locked(|| {
            let file = self.element_file(namespace, type_id, element_id);
            let existed = self.delete(&file)?;
            self.cache
                .unregister_element_id(namespace, element_type, element_id);
            self.cache.unregister_processed_file(&file);
            debug!(namespace, type_id, element_id, existed, "deleted element");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use metastore_types::{
        Attribute, AttributeNode, AttributeValue, Owner, OwnerPermissions, OwnerType, Permission,
    };

    use super::*;
    use crate::config::{CacheStrategy, LockConfig};

    fn open(root: &Path) -> XmlMetaStore {
        XmlMetaStore::open_at(root).unwrap()
    }

    fn dimension(store: &XmlMetaStore) -> ElementType {
        store.create_namespace("pentaho").unwrap();
        store
            .create_element_type(
                "pentaho",
                &ElementType::new("pentaho", "Dimension")
                    .with_id("dim1")
                    .with_description("Star schema dimension"),
            )
            .unwrap()
    }

    fn customer() -> Element {
        Element::new("Customer")
            .with_id("cust")
            .with_child(Attribute::new("physical_table").with_value("DIM_CUSTOMER"))
    }

    #[test]
    fn pentaho_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();

        let found = store
            .get_element_by_name("pentaho", &dim, "Customer")
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("cust"));
        assert_eq!(
            found.child("physical_table").and_then(|a| a.value.clone()),
            Some(AttributeValue::from("DIM_CUSTOMER"))
        );

        store.delete_element("pentaho", &dim, "cust").unwrap();
        assert!(store.get_elements("pentaho", &dim).unwrap().is_empty());
        store.delete_element_type("pentaho", &dim).unwrap();
        store.delete_namespace("pentaho").unwrap();
        assert!(!store
            .get_namespaces()
            .unwrap()
            .contains(&"pentaho".to_string()));
    }

    #[test]
    fn layout_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();

        let type_dir = dir.path().join("metastore/pentaho/dim1");
        assert!(type_dir.join(".type.xml").is_file());
        assert!(type_dir.join("cust.xml").is_file());
        assert!(!dir.path().join("metastore/.lock").exists());

        let type_xml = std::fs::read_to_string(type_dir.join(".type.xml")).unwrap();
        assert!(type_xml.contains("<data-type>"));
        assert!(type_xml.contains("<name>Dimension</name>"));
        let element_xml = std::fs::read_to_string(type_dir.join("cust.xml")).unwrap();
        assert!(element_xml.contains("<element>"));
        assert!(element_xml.contains("<name>Customer</name>"));
    }

    #[test]
    fn created_type_is_bound_to_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_namespace("ns").unwrap();
        let created = store
            .create_element_type("ns", &ElementType::new("ns", "Plain"))
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("Plain"));
        assert!(created.belongs_to(store.name()));

        let loaded = store.get_element_type("ns", "Plain").unwrap().unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);

        let err = store.create_namespace("pentaho").unwrap_err();
        assert!(matches!(err, MetaStoreError::NamespaceExists { ref existing, .. } if existing == &["pentaho"]));

        let err = store
            .create_element_type("pentaho", &ElementType::new("pentaho", "Other").with_id("dim1"))
            .unwrap_err();
        match err {
            MetaStoreError::ElementTypeExists { id, existing, .. } => {
                assert_eq!(id, "dim1");
                assert_eq!(existing.len(), 1);
                assert_eq!(existing[0].name, "Dimension");
            }
            other => panic!("expected ElementTypeExists, got {other:?}"),
        }

        store.create_element("pentaho", &dim, &customer()).unwrap();
        let err = store
            .create_element("pentaho", &dim, &Element::new("Another").with_id("cust"))
            .unwrap_err();
        match err {
            MetaStoreError::ElementExists { id, existing, .. } => {
                assert_eq!(id, "cust");
                assert_eq!(existing.len(), 1);
                assert_eq!(existing[0].name.as_deref(), Some("Customer"));
            }
            other => panic!("expected ElementExists, got {other:?}"),
        }
        assert!(store
            .create_element("pentaho", &dim, &customer())
            .unwrap_err()
            .is_already_exists());
    }

    #[test]
    fn non_empty_deletes_list_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        let fact = store
            .create_element_type("pentaho", &ElementType::new("pentaho", "Fact"))
            .unwrap();
        store.create_element("pentaho", &dim, &customer()).unwrap();
        store
            .create_element("pentaho", &dim, &Element::new("Product").with_id("prod"))
            .unwrap();

        match store.delete_namespace("pentaho").unwrap_err() {
            MetaStoreError::DependenciesExist { dependencies, .. } => {
                assert_eq!(dependencies, vec!["Fact", "dim1"]);
            }
            other => panic!("expected DependenciesExist, got {other:?}"),
        }
        match store.delete_element_type("pentaho", &dim).unwrap_err() {
            MetaStoreError::DependenciesExist { dependencies, .. } => {
                assert_eq!(dependencies, vec!["cust", "prod"]);
            }
            other => panic!("expected DependenciesExist, got {other:?}"),
        }

        store.delete_element("pentaho", &dim, "cust").unwrap();
        store.delete_element("pentaho", &dim, "prod").unwrap();
        store.delete_element_type("pentaho", &dim).unwrap();
        store.delete_element_type("pentaho", &fact).unwrap();
        store.delete_namespace("pentaho").unwrap();
        assert!(!store.namespace_exists("pentaho").unwrap());
    }

    #[test]
    fn type_delete_leaves_folder_with_foreign_files_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        let type_dir = dir.path().join("metastore/pentaho/dim1");
        std::fs::write(type_dir.join("notes.txt"), "keep me").unwrap();

        match store.delete_element_type("pentaho", &dim).unwrap_err() {
            MetaStoreError::DependenciesExist { dependencies, .. } => {
                assert_eq!(dependencies, vec!["notes.txt"]);
            }
            other => panic!("expected DependenciesExist, got {other:?}"),
        }
        assert!(type_dir.join(TYPE_FILE_NAME).exists());
        assert_eq!(store.get_element_type_ids("pentaho").unwrap(), vec!["dim1"]);

        // Hidden files are not listed; the type file is restored instead.
        std::fs::remove_file(type_dir.join("notes.txt")).unwrap();
        std::fs::write(type_dir.join(".DS_Store"), "").unwrap();
        assert!(store.delete_element_type("pentaho", &dim).is_err());
        assert!(type_dir.join(TYPE_FILE_NAME).exists());
        let kept = store.get_element_type("pentaho", "dim1").unwrap().unwrap();
        assert_eq!(kept.description.as_deref(), Some("Star schema dimension"));

        std::fs::remove_file(type_dir.join(".DS_Store")).unwrap();
        store.delete_element_type("pentaho", &dim).unwrap();
        assert!(!type_dir.exists());
    }

    #[test]
    fn deleting_missing_entries_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let ghost = ElementType::new("nowhere", "Ghost");
        store.delete_element("nowhere", &ghost, "nobody").unwrap();
        store.delete_element_type("nowhere", &ghost).unwrap();
        store.delete_namespace("nowhere").unwrap();

        let dim = dimension(&store);
        store.delete_element("pentaho", &dim, "nobody").unwrap();
    }

    #[test]
    fn typed_values_survive_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);

        let mut element = Element::new("Typed").with_id("typed");
        element.add_child(Attribute::new("text").with_value("3"));
        element.add_child(Attribute::new("pad").with_value("  padded  "));
        element.add_child(Attribute::new("blank").with_value("   "));
        element.add_child(Attribute::new("int").with_value(3_i32));
        element.add_child(Attribute::new("long").with_value(3_000_000_000_i64));
        element.add_child(Attribute::new("double").with_value(2.5));
        element.add_child(
            Attribute::new("nested").with_child(Attribute::new("deep").with_value(-7_i32)),
        );
        element.set_owner(Some(Owner::new("admin", OwnerType::Role)));
        element.add_owner_permissions(OwnerPermissions::new(
            Owner::user("joe"),
            vec![Permission::Read, Permission::Update],
        ));
        store.create_element("pentaho", &dim, &element).unwrap();

        let loaded = store.get_element("pentaho", &dim, "typed").unwrap().unwrap();
        assert_eq!(loaded, element);
        assert_eq!(
            loaded.child("text").and_then(|a| a.value.clone()),
            Some(AttributeValue::String("3".into()))
        );
        assert_eq!(
            loaded.child("int").and_then(|a| a.value.clone()),
            Some(AttributeValue::Integer(3))
        );
        assert_eq!(
            loaded.child("blank").and_then(|a| a.value.clone()),
            Some(AttributeValue::String("   ".into()))
        );
    }

    #[test]
    fn id_defaults_to_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        let created = store
            .create_element("pentaho", &dim, &Element::new("Region"))
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("Region"));
        assert!(store.get_element("pentaho", &dim, "Region").unwrap().is_some());
    }

    #[test]
    fn invalid_ids_are_rejected_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(matches!(
            store.create_namespace("../escape"),
            Err(MetaStoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.create_namespace(".hidden"),
            Err(MetaStoreError::InvalidName(_))
        ));
        let dim = dimension(&store);
        assert!(matches!(
            store.create_element("pentaho", &dim, &Element::default()),
            Err(MetaStoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.get_element("pentaho", &dim, ".."),
            Err(MetaStoreError::InvalidName(_))
        ));
    }

    #[test]
    fn create_requires_parent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        assert!(matches!(
            store.create_element_type("missing", &ElementType::new("missing", "T")),
            Err(MetaStoreError::NotFound { kind: "namespace", .. })
        ));
        store.create_namespace("ns").unwrap();
        assert!(matches!(
            store.create_element("ns", &ElementType::new("ns", "T"), &Element::new("e")),
            Err(MetaStoreError::NotFound { kind: "element type", .. })
        ));
    }

    #[test]
    fn folder_without_type_file_is_not_a_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_namespace("ns").unwrap();
        std::fs::create_dir(dir.path().join("metastore/ns/stray")).unwrap();

        assert!(store.get_element_type_ids("ns").unwrap().is_empty());
        assert!(store.get_element_type("ns", "stray").unwrap().is_none());
        store
            .create_element_type("ns", &ElementType::new("ns", "Stray").with_id("stray"))
            .unwrap();
        assert_eq!(store.get_element_type_ids("ns").unwrap(), vec!["stray"]);
    }

    #[test]
    fn type_lookup_by_name_is_case_insensitive_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open(dir.path());
            dimension(&store);
            let found = store
                .get_element_type_by_name("pentaho", "Dimension")
                .unwrap()
                .unwrap();
            assert_eq!(found.id.as_deref(), Some("dim1"));
        }
        let reopened = open(dir.path());
        let found = reopened
            .get_element_type_by_name("pentaho", "dimension")
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("dim1"));
        assert_eq!(found.description.as_deref(), Some("Star schema dimension"));
        assert!(reopened
            .get_element_type_by_name("pentaho", "Fact")
            .unwrap()
            .is_none());
    }

    #[test]
    fn name_lookups_fold_non_ascii_case() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_namespace("pentaho").unwrap();
        let overview = store
            .create_element_type("pentaho", &ElementType::new("pentaho", "Übersicht").with_id("ov"))
            .unwrap();
        store
            .create_element("pentaho", &overview, &Element::new("Äpfel").with_id("apples"))
            .unwrap();

        let reopened = open(dir.path());
        let found = reopened
            .get_element_type_by_name("pentaho", "übersicht")
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("ov"));
        let apples = reopened
            .get_element_by_name("pentaho", &found, "äpfel")
            .unwrap()
            .unwrap();
        assert_eq!(apples.id.as_deref(), Some("apples"));
    }

    #[test]
    fn renamed_type_is_found_under_new_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let mut dim = dimension(&store);
        dim.name = "Conformed Dimension".into();
        store.update_element_type("pentaho", &dim).unwrap();

        assert!(store
            .get_element_type_by_name("pentaho", "Dimension")
            .unwrap()
            .is_none());
        let found = store
            .get_element_type_by_name("pentaho", "conformed dimension")
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("dim1"));

        let missing = ElementType::new("pentaho", "Nope");
        assert!(matches!(
            store.update_element_type("pentaho", &missing),
            Err(MetaStoreError::NotFound { .. })
        ));
    }

    #[test]
    fn external_rename_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();
        assert!(store
            .get_element_by_name("pentaho", &dim, "Customer")
            .unwrap()
            .is_some());

        // Another process renames the element behind this store's back.
        let renamed = Element::new("Client").with_id("cust");
        let path = dir.path().join("metastore/pentaho/dim1/cust.xml");
        std::fs::write(&path, XmlCodec::encode_element(&renamed).unwrap()).unwrap();

        assert!(store
            .get_element_by_name("pentaho", &dim, "Customer")
            .unwrap()
            .is_none());
        let found = store
            .get_element_by_name("pentaho", &dim, "client")
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_deref(), Some("cust"));
    }

    #[test]
    fn element_lookup_follows_reregistered_type_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        store.create_namespace("ns").unwrap();
        let t1 = store
            .create_element_type("ns", &ElementType::new("ns", "T").with_id("id1"))
            .unwrap();
        store
            .create_element("ns", &t1, &Element::new("E").with_id("old"))
            .unwrap();
        assert!(store.get_element_by_name("ns", &t1, "E").unwrap().is_some());

        store.cache().register_element_type_id("ns", "T", "id2");
        let t2 = ElementType::new("ns", "T").with_id("id2");
        assert!(store.cache().get_element_id("ns", &t2, "E").is_none());
        assert!(store.get_element_by_name("ns", &t2, "E").unwrap().is_none());
    }

    #[test]
    fn update_requires_store_binding() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();

        let unbound = ElementType::new("pentaho", "Dimension").with_id("dim1");
        let renamed = Element::new("Client");
        assert!(matches!(
            store.update_element("pentaho", &unbound, "cust", &renamed),
            Err(MetaStoreError::ForeignElementType { .. })
        ));

        store.update_element("pentaho", &dim, "cust", &renamed).unwrap();
        let loaded = store.get_element("pentaho", &dim, "cust").unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("Client"));
        assert!(store
            .get_element_by_name("pentaho", &dim, "Customer")
            .unwrap()
            .is_none());

        assert!(matches!(
            store.update_element("pentaho", &dim, "nobody", &renamed),
            Err(MetaStoreError::NotFound { kind: "element", .. })
        ));
    }

    #[test]
    fn skip_unchanged_lists_only_new_or_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();
        store
            .create_element("pentaho", &dim, &Element::new("Product").with_id("prod"))
            .unwrap();
        let skip = ListOptions {
            skip_unchanged: true,
        };

        assert_eq!(store.get_elements_with("pentaho", &dim, skip, None).unwrap().len(), 2);
        assert!(store.get_elements_with("pentaho", &dim, skip, None).unwrap().is_empty());

        store
            .update_element("pentaho", &dim, "prod", &Element::new("Product v2"))
            .unwrap();
        let changed = store.get_elements_with("pentaho", &dim, skip, None).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].id.as_deref(), Some("prod"));

        assert_eq!(store.get_elements("pentaho", &dim).unwrap().len(), 2);
    }

    #[test]
    fn listing_errors_abort_or_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();
        std::fs::write(
            dir.path().join("metastore/pentaho/dim1/broken.xml"),
            "<element><name>Broken</name><value>1</value><type>bogus</type></element>",
        )
        .unwrap();

        assert!(matches!(
            store.get_elements("pentaho", &dim),
            Err(MetaStoreError::Codec { .. })
        ));

        let mut errors = Vec::new();
        let elements = store
            .get_elements_with("pentaho", &dim, ListOptions::default(), Some(&mut errors))
            .unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], MetaStoreError::Codec { ref path, .. } if path.ends_with("broken.xml")));

        // Lookups by name skip the unreadable file.
        assert!(store
            .get_element_by_name("pentaho", &dim, "Customer")
            .unwrap()
            .is_some());
    }

    #[test]
    fn persistent_cache_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StoreConfig::new(dir.path());
        config.cache.strategy = CacheStrategy::Persistent;
        let store = XmlMetaStore::open(&config).unwrap();
        let dim = dimension(&store);
        store.create_element("pentaho", &dim, &customer()).unwrap();

        assert!(store.get_element_by_name("pentaho", &dim, "Customer").unwrap().is_some());
        assert!(store.cache().stats().snapshot().hits >= 1);
    }

    #[test]
    fn concurrent_creates_of_same_type() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            lock: LockConfig {
                retry_interval_ms: 5,
                timeout_ms: 10_000,
            },
            ..StoreConfig::new(dir.path())
        };
        open(dir.path()).create_namespace("ns").unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|i| {
                // Separate instances share nothing but the directory tree.
                let store = XmlMetaStore::open(&config).unwrap();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let t = ElementType::new("ns", format!("Writer {i}")).with_id("shared");
                    barrier.wait();
                    store.create_element_type("ns", &t)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser, MetaStoreError::ElementTypeExists { .. }));

        let stored = open(dir.path()).get_element_type("ns", "shared").unwrap().unwrap();
        assert!(stored.name.starts_with("Writer "));
    }
}
