//! Load side of the storage tiers
//!
//! Precedence, first hit wins:
//!
//! 1. snapshot carried in the reference
//! 2. durable record for the identity in the reference path
//! 3. device cache for the same identity
//! 4. defaults
//!
//! Each field group present in the winning record replaces the default
//! wholesale; absent groups keep their defaults.

use pivotstore::{LocalCache, RecordStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::Candidate;
use crate::session::{Reference, SessionRecord, SessionState};

/// Tier a session was reconstructed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadSource {
    Snapshot,
    Durable,
    LocalCache,
    Defaults,
}

impl std::fmt::Display for LoadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot => write!(f, "snapshot"),
            Self::Durable => write!(f, "durable"),
            Self::LocalCache => write!(f, "local-cache"),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

/// A reconstructed session
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub state: SessionState,
    pub source: LoadSource,
    /// Candidate records embedded by a live share
    pub places: Vec<Candidate>,
}

/// Reconstruct a session from a reference
///
/// Never fails: a bad snapshot is ignored, a failing store falls through to
/// the cache, and nothing at all yields defaults.
pub async fn reconcile(reference: &Reference, store: &dyn RecordStore, cache: &dyn LocalCache) -> Loaded {
    debug!(path = %reference.path, has_snapshot = reference.snapshot.is_some(), "reconcile: called");

    let mut state = SessionState {
        event: reference.identity(),
        ..SessionState::default()
    };

    if let Some(record) = reference.decode_snapshot() {
        debug!("reconcile: using snapshot");
        state.apply(&record);
        return loaded(state, LoadSource::Snapshot, record);
    }
    if reference.snapshot.is_some() {
        debug!("reconcile: snapshot malformed; ignored");
    }

    let Some(identity) = state.event.clone() else {
        debug!("reconcile: no identity; defaults");
        return loaded(state, LoadSource::Defaults, SessionRecord::default());
    };
    let key = identity.record_key();

    match store.get(&key).await {
        Ok(Some(value)) => match SessionRecord::from_value(value.clone()) {
            Some(record) => {
                debug!(%key, "reconcile: using durable record");
                cache.set(&key, &value);
                state.apply(&record);
                return loaded(state, LoadSource::Durable, record);
            }
            None => debug!(%key, "reconcile: durable record unreadable"),
        },
        Ok(None) => debug!(%key, "reconcile: no durable record"),
        Err(e) => debug!(%key, error = %e, "reconcile: durable fetch failed"),
    }

    if let Some(record) = cache.get(&key).and_then(SessionRecord::from_value) {
        debug!(%key, "reconcile: using local cache");
        state.apply(&record);
        return loaded(state, LoadSource::LocalCache, record);
    }

    debug!(%key, "reconcile: nothing stored; defaults");
    loaded(state, LoadSource::Defaults, SessionRecord::default())
}

fn loaded(state: SessionState, source: LoadSource, record: SessionRecord) -> Loaded {
    info!(%source, plan = state.plan.len(), locked = state.locked.len(), "session loaded");
    Loaded {
        state,
        source,
        places: record.places.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventIdentity, PreferenceProfile};
    use crate::session::share;
    use pivotstore::{MemoryCache, MemoryStore};
    use serde_json::json;

    fn walk() -> EventIdentity {
        EventIdentity::new("maya", "walk")
    }

    #[tokio::test]
    async fn test_snapshot_wins_over_stores() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        let key = walk().record_key();
        store.put(&key, &json!({"plan": ["durable"]})).await.unwrap();
        cache.set(&key, &json!({"plan": ["cached"]}));

        let mut shared = SessionState::for_event(walk());
        shared.plan = vec!["snap".to_string()];
        let reference = share::snapshot(&shared, &[], false);

        let out = reconcile(&reference, &store, &cache).await;
        assert_eq!(out.source, LoadSource::Snapshot);
        assert_eq!(out.state.plan, vec!["snap"]);
    }

    #[tokio::test]
    async fn test_malformed_snapshot_falls_through() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        store.put(&walk().record_key(), &json!({"notes": "durable"})).await.unwrap();

        let reference = Reference::parse("/maya/walk?s=garbage");
        let out = reconcile(&reference, &store, &cache).await;
        assert_eq!(out.source, LoadSource::Durable);
        assert_eq!(out.state.notes, "durable");
        // Durable hit refreshes the device cache
        assert!(cache.get(&walk().record_key()).is_some());
    }

    #[tokio::test]
    async fn test_failing_store_uses_cache() {
        let store = MemoryStore::new();
        store.set_fail_gets(true);
        let cache = MemoryCache::new();
        cache.set(&walk().record_key(), &json!({"plan": ["a", "b"], "locked": ["a"]}));

        let out = reconcile(&Reference::parse("/maya/walk"), &store, &cache).await;
        assert_eq!(out.source, LoadSource::LocalCache);
        assert_eq!(out.state.plan, vec!["a", "b"]);
        assert_eq!(out.state.locked, vec!["a"]);
        assert_eq!(out.state.event.unwrap().slug, "walk");
    }

    #[tokio::test]
    async fn test_nothing_stored_gives_defaults() {
        let out = reconcile(&Reference::parse("/maya/walk"), &MemoryStore::new(), &MemoryCache::new()).await;
        assert_eq!(out.source, LoadSource::Defaults);
        assert_eq!(out.state.profile, PreferenceProfile::default());
        assert!(out.state.plan.is_empty());
        assert_eq!(out.state.event, EventIdentity::from_path("/maya/walk"));

        let out = reconcile(&Reference::default(), &MemoryStore::new(), &MemoryCache::new()).await;
        assert_eq!(out.source, LoadSource::Defaults);
        assert!(out.state.event.is_none());
    }

    #[tokio::test]
    async fn test_partial_record_keeps_defaults_for_absent_groups() {
        let store = MemoryStore::new();
        store.put(&walk().record_key(), &json!({"v": 1, "priceCap": 3})).await.unwrap();
        let out = reconcile(&Reference::parse("/e/maya/walk"), &store, &MemoryCache::new()).await;
        assert_eq!(out.state.profile.price_cap, 3);
        assert_eq!(out.state.profile.vibes, vec!["cozy"]);
        assert_eq!(out.state.profile.start.unwrap().label, "Boston Common");
    }

    #[tokio::test]
    async fn test_bad_group_does_not_discard_the_record() {
        let store = MemoryStore::new();
        let cache = MemoryCache::new();
        store
            .put(&walk().record_key(), &json!({"priceCap": -1, "plan": ["a", "b"], "notes": "keep me"}))
            .await
            .unwrap();
        cache.set(&walk().record_key(), &json!({"plan": ["cached"]}));

        let out = reconcile(&Reference::parse("/maya/walk"), &store, &cache).await;
        assert_eq!(out.source, LoadSource::Durable);
        assert_eq!(out.state.plan, vec!["a", "b"]);
        assert_eq!(out.state.notes, "keep me");
        assert_eq!(out.state.profile.price_cap, PreferenceProfile::default().price_cap);
    }
}
