//! Write-out side of the storage tiers
//!
//! Every save overwrites the local cache immediately and schedules a durable
//! write after a quiet window. A newer save for the same key cancels the
//! scheduled write if it has not started sending yet, so only the last record
//! in a burst reaches the store. A write that already started is never
//! overtaken: sends go out one at a time in the order they started. Durable
//! failures are logged and dropped.

use pivotstore::{LocalCache, RecordKey, RecordStore};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default quiet window before a durable write is sent
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

struct PendingWrite {
    key: RecordKey,
    value: Value,
    started: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Debounced, best-effort record writer
pub struct Persister {
    cache: Arc<dyn LocalCache>,
    store: Arc<dyn RecordStore>,
    debounce: Duration,
    pending: Mutex<HashMap<String, PendingWrite>>,
    /// Superseded writes that were already sending
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    send_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Persister {
    pub fn new(cache: Arc<dyn LocalCache>, store: Arc<dyn RecordStore>, debounce: Duration) -> Self {
        debug!(debounce_ms = debounce.as_millis() as u64, "Persister::new: called");
        Self {
            cache,
            store,
            debounce,
            pending: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(Vec::new()),
            send_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Save a record to both tiers; must be called inside a tokio runtime
    pub fn save(&self, key: &RecordKey, value: Value) {
        let storage_key = key.storage_key();
        debug!(key = %storage_key, "save: called");
        self.cache.set(key, &value);

        let started = Arc::new(AtomicBool::new(false));
        let handle = {
            let store = self.store.clone();
            let key = key.clone();
            let value = value.clone();
            let started = started.clone();
            let send_lock = self.send_lock.clone();
            let debounce = self.debounce;
            tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                started.store(true, Ordering::SeqCst);
                let _turn = send_lock.lock().await;
                send(store.as_ref(), &key, &value).await;
            })
        };

        let previous = lock(&self.pending).insert(
            storage_key.clone(),
            PendingWrite {
                key: key.clone(),
                value,
                started,
                handle,
            },
        );
        if let Some(previous) = previous {
            if previous.started.load(Ordering::SeqCst) {
                debug!(key = %storage_key, "save: previous write already sending");
                let mut in_flight = lock(&self.in_flight);
                in_flight.retain(|handle| !handle.is_finished());
                in_flight.push(previous.handle);
            } else {
                debug!(key = %storage_key, "save: cancelling scheduled write");
                previous.handle.abort();
            }
        }
    }

    /// Number of keys with a write scheduled or in flight
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).values().filter(|p| !p.handle.is_finished()).count()
    }

    /// Send every scheduled write now and wait for in-flight ones
    pub async fn flush(&self) {
        let in_flight: Vec<JoinHandle<()>> = lock(&self.in_flight).drain(..).collect();
        let pending: Vec<PendingWrite> = lock(&self.pending).drain().map(|(_, p)| p).collect();
        debug!(in_flight = in_flight.len(), pending = pending.len(), "flush: called");
        for handle in in_flight {
            let _ = handle.await;
        }
        for write in pending {
            if write.started.load(Ordering::SeqCst) {
                let _ = write.handle.await;
            } else {
                write.handle.abort();
                let _turn = self.send_lock.lock().await;
                send(self.store.as_ref(), &write.key, &write.value).await;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn send(store: &dyn RecordStore, key: &RecordKey, value: &Value) {
    match store.put(key, value).await {
        Ok(()) => debug!(%key, "durable write sent"),
        Err(e) => debug!(%key, error = %e, "durable write failed; dropped"),
    }
}
