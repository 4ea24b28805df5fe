//! PivotStore - persistence tiers for Pivot event records
//!
//! Records are opaque JSON values addressed by a [`RecordKey`]. Two tiers live
//! here; the third (the shareable snapshot) is self-contained and needs no
//! storage.
//!
//! # Tiers
//!
//! - [`LocalCache`] - synchronous, device-scoped. Writes never fail observably.
//! - [`RecordStore`] - async, durable, last-write-wins. May fail; callers treat
//!   failures as best-effort.
//!
//! # Layout of the file-backed cache
//!
//! ```text
//! <cache-dir>/
//! ├── event/
//! │   └── {owner}/
//! │       └── {slug}.json
//! └── account/
//!     └── device/
//!         └── current.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pivotstore::{FileCache, LocalCache, RecordKey};
//!
//! let cache = FileCache::open(".pivot-cache")?;
//! let key = RecordKey::event("maya", "friday-walk");
//! cache.set(&key, &serde_json::json!({"v": 1}));
//! assert!(cache.get(&key).is_some());
//! ```

mod cache;
mod error;
mod key;
mod remote;

pub use cache::{FileCache, LocalCache, MemoryCache};
pub use error::StoreError;
pub use key::{Namespace, RecordKey};
pub use remote::{DisabledStore, KvRestStore, MemoryStore, RecordStore};

/// Default directory name used under the platform data dir
pub const DEFAULT_CACHE_DIR_NAME: &str = "pivot";
