//! Durable record tier
//!
//! Last-write-wins key-value storage. There is no compare-and-swap: two
//! sessions writing the same key race, and the later write sticks.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::key::RecordKey;

/// Async durable record storage
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record, `Ok(None)` when the key has never been written
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError>;

    /// Overwrite a record
    async fn put(&self, key: &RecordKey, record: &Value) -> Result<(), StoreError>;
}

/// Envelope returned by the KV REST `get` endpoint
#[derive(Debug, Deserialize)]
struct KvGetResponse {
    result: Option<String>,
}

/// Record store speaking the Upstash-style KV REST protocol
///
/// - `GET  {base}/get/{key}` returns `{"result": "<json text>" | null}`
/// - `POST {base}/set/{key}` with body `{"value": "<json text>"}`
pub struct KvRestStore {
    base_url: Url,
    token: String,
    http: Client,
}

impl KvRestStore {
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        debug!(%base_url, ?timeout, "KvRestStore::new: called");
        let base_url = Url::parse(base_url).map_err(|e| StoreError::NotConfigured(format!("kv-url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::NotConfigured(format!("kv-url is not a base URL: {}", base_url)));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            token: token.into(),
            http,
        })
    }

    /// Build `{base}/{op}/{key}` with the key as a single encoded segment
    fn endpoint(&self, op: &str, key: &RecordKey) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(op).push(&key.storage_key());
        }
        url
    }
}

#[async_trait]
impl RecordStore for KvRestStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        debug!(%key, "KvRestStore::get: called");
        let response = self
            .http
            .get(self.endpoint("get", key))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%key, status, "KvRestStore::get: API error");
            return Err(StoreError::ApiError { status, message });
        }

        let envelope: KvGetResponse = response.json().await?;
        match envelope.result {
            None => {
                debug!(%key, "KvRestStore::get: not found");
                Ok(None)
            }
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(|e| StoreError::InvalidRecord(e.to_string()))?;
                Ok(Some(value))
            }
        }
    }

    async fn put(&self, key: &RecordKey, record: &Value) -> Result<(), StoreError> {
        debug!(%key, "KvRestStore::put: called");
        let body = serde_json::json!({ "value": serde_json::to_string(record)? });
        let response = self
            .http
            .post(self.endpoint("set", key))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            debug!(%key, status, "KvRestStore::put: API error");
            return Err(StoreError::ApiError { status, message });
        }
        Ok(())
    }
}

/// Stand-in used when no durable backend is configured; every call fails
pub struct DisabledStore;

#[async_trait]
impl RecordStore for DisabledStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        debug!(%key, "DisabledStore::get: no backend");
        Err(StoreError::NotConfigured("durable store".to_string()))
    }

    async fn put(&self, key: &RecordKey, _record: &Value) -> Result<(), StoreError> {
        debug!(%key, "DisabledStore::put: no backend");
        Err(StoreError::NotConfigured("durable store".to_string()))
    }
}

/// In-process record store with switchable failures
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Value>>,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `get` fail
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `put` fail
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of `put` calls that reached the store, failed or not
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Read a record without going through the async trait
    pub fn peek(&self, key: &RecordKey) -> Option<Value> {
        self.records.lock().ok()?.get(&key.storage_key()).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<Value>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.peek(key))
    }

    async fn put(&self, key: &RecordKey, record: &Value) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::ApiError {
                status: 502,
                message: "KV set failed".to_string(),
            });
        }
        if let Ok(mut records) = self.records.lock() {
            records.insert(key.storage_key(), record.clone());
        }
        Ok(())
    }
}
