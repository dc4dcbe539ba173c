use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use metastore_cache::{EvictingLookupCache, LookupCache, PersistentLookupCache};
use serde::{Deserialize, Serialize};

use crate::error::{MetaStoreError, StoreResult};
use crate::xml::STORE_FOLDER;

/// Configuration for an on-disk store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory under which the `metastore/` folder lives.
    pub root: PathBuf,
    /// Store name. Defaults to the path of the `metastore/` folder.
    pub name: Option<String>,
    pub lock: LockConfig,
    pub cache: CacheConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: std::env::temp_dir(),
            name: None,
            lock: LockConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| MetaStoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MetaStoreError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// The `metastore/` folder holding namespaces and the lock file.
    pub fn store_folder(&self) -> PathBuf {
        self.root.join(STORE_FOLDER)
    }

    pub fn store_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.store_folder().display().to_string())
    }
}

/// Lock-file retry settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Pause between attempts to create the lock file.
    pub retry_interval_ms: u64,
    /// Give up once this much time has passed without getting the lock.
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 100,
            timeout_ms: 10_000,
        }
    }
}

impl LockConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Which lookup cache strategy a store uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Bounded LRU; entries may be dropped at any time.
    #[default]
    Evicting,
    /// Entries are kept until explicitly removed.
    Persistent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub strategy: CacheStrategy,
    /// Entries per table for the evicting strategy.
    pub capacity: usize,
    /// Optional time-to-live for the evicting strategy.
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::default(),
            capacity: metastore_cache::evicting::DEFAULT_CAPACITY,
            ttl_secs: None,
        }
    }
}

impl CacheConfig {
    pub fn build(&self) -> Arc<dyn LookupCache> {
        match self.strategy {
            CacheStrategy::Evicting => Arc::new(EvictingLookupCache::with_ttl(
                self.capacity,
                self.ttl_secs.map(Duration::from_secs),
            )),
            CacheStrategy::Persistent => Arc::new(PersistentLookupCache::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::new("/data");
        assert_eq!(c.store_folder(), PathBuf::from("/data/metastore"));
        assert_eq!(c.lock.retry_interval(), Duration::from_millis(100));
        assert_eq!(c.lock.timeout(), Duration::from_secs(10));
        assert_eq!(c.cache.strategy, CacheStrategy::Evicting);
        assert_eq!(c.cache.capacity, 10_000);
        assert!(c.name.is_none());
    }

    #[test]
    fn store_name_defaults_to_folder() {
        let c = StoreConfig::new("/data");
        assert_eq!(c.store_name(), PathBuf::from("/data/metastore").display().to_string());
        let named = StoreConfig {
            name: Some("local".into()),
            ..c
        };
        assert_eq!(named.store_name(), "local");
    }

    #[test]
    fn parse_partial_toml() {
        let c = StoreConfig::from_toml_str(
            r#"
            root = "/srv/meta"
            name = "shared"

            [lock]
            timeout_ms = 2500

            [cache]
            strategy = "persistent"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/meta"));
        assert_eq!(c.name.as_deref(), Some("shared"));
        assert_eq!(c.lock.timeout_ms, 2500);
        assert_eq!(c.lock.retry_interval_ms, 100);
        assert_eq!(c.cache.strategy, CacheStrategy::Persistent);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = StoreConfig::from_toml_str("[cache]\nstrategy = \"sometimes\"").unwrap_err();
        assert!(matches!(err, MetaStoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "root = \"/x\"\n").unwrap();
        assert_eq!(StoreConfig::load(&path).unwrap().root, PathBuf::from("/x"));
        assert!(matches!(
            StoreConfig::load(&dir.path().join("missing.toml")),
            Err(MetaStoreError::Io { .. })
        ));
    }
}
