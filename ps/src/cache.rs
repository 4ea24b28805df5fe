//! Device-local cache tier
//!
//! Synchronous and infallible from the caller's point of view: read problems
//! surface as "absent", write problems are logged and dropped.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::key::RecordKey;

/// Synchronous device-scoped record cache
pub trait LocalCache: Send + Sync {
    /// Read a record, `None` when absent or unreadable
    fn get(&self, key: &RecordKey) -> Option<Value>;

    /// Overwrite a record
    fn set(&self, key: &RecordKey, record: &Value);

    /// Drop a record if present
    fn remove(&self, key: &RecordKey);
}

/// Cache backed by one JSON file per record
pub struct FileCache {
    base_path: PathBuf,
}

impl FileCache {
    /// Open or create a cache rooted at the given directory
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "FileCache::open: opened");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.base_path
            .join(key.namespace.as_str())
            .join(sanitize(&key.owner))
            .join(format!("{}.json", sanitize(&key.slug)))
    }

    fn write(&self, path: &Path, record: &Value) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(record)?;
        // Write-then-rename so a crash never leaves a torn record behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &RecordKey) -> Option<Value> {
        let path = self.record_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(%key, error = %e, "FileCache::get: absent");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(%key, error = %e, "FileCache::get: unreadable record, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &RecordKey, record: &Value) {
        let path = self.record_path(key);
        match self.write(&path, record) {
            Ok(()) => debug!(%key, "FileCache::set: written"),
            Err(e) => warn!(%key, error = %e, "FileCache::set: write dropped"),
        }
    }

    fn remove(&self, key: &RecordKey) {
        let path = self.record_path(key);
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                warn!(%key, error = %e, "FileCache::remove: failed");
            } else {
                info!(%key, "Removed cached record");
            }
        }
    }
}

/// In-process cache, used for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryCache {
    records: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &RecordKey) -> Option<Value> {
        let records = self.records.lock().ok()?;
        records.get(&key.storage_key()).cloned()
    }

    fn set(&self, key: &RecordKey, record: &Value) {
        if let Ok(mut records) = self.records.lock() {
            records.insert(key.storage_key(), record.clone());
        }
    }

    fn remove(&self, key: &RecordKey) {
        if let Ok(mut records) = self.records.lock() {
            records.remove(&key.storage_key());
        }
    }
}

/// Keep a path component inside its parent directory
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}
