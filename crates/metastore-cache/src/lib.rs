//! In-process lookup cache for the metastore.
//!
//! The cache maps `(namespace, element-type name)` to the element-type id
//! and `(namespace, element type, element name)` to the element id, so a
//! lookup by name does not have to scan and parse a whole directory. It
//! also remembers the modification time of every file already parsed.
//!
//! The cache is an accelerator only. It is process-local, so another
//! process writing to the same store is invisible to it: every hit must be
//! verified against the file it points to before it is trusted.
//!
//! # Strategies
//!
//! - [`PersistentLookupCache`] — keeps every entry until it is removed
//! - [`EvictingLookupCache`] — bounded LRU with an optional time-to-live;
//!   entries may disappear at any time
//!
//! Both implement [`LookupCache`] and are internally synchronized.

mod lru;

pub mod evicting;
pub mod persistent;
pub mod stats;
pub mod traits;

pub use evicting::EvictingLookupCache;
pub use persistent::PersistentLookupCache;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use traits::LookupCache;
