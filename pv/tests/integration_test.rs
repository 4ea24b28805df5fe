//! Integration tests for Pivot
//!
//! These tests drive a session end to end through the public API, with
//! in-memory stores and a scripted search provider.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveTime;
use pivot::controller::{ControllerMode, ReplaceOutcome, SearchOutcome};
use pivot::domain::{Candidate, CandidateId, Location, PreferenceProfile, StartPoint};
use pivot::search::{CandidateSearch, CatalogSearch, SearchError, SearchQuery};
use pivot::session::{Reference, SessionDeps, SessionManager, SessionRecord, SessionSettings, decode};
use pivot::sync::LoadSource;
use pivot::{compose, score};
use pivotstore::{LocalCache, MemoryCache, MemoryStore, RecordKey, RecordStore};
use serde_json::json;

// =============================================================================
// Helpers
// =============================================================================

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap()
}

/// Degrees of latitude per mile, close enough for distance bands
const LAT_PER_MILE: f64 = 1.0 / 69.09;

fn origin() -> StartPoint {
    StartPoint::new("Test start", 42.355, -71.065)
}

fn venue(id: &str, miles_north: f64) -> Candidate {
    Candidate::new(
        id,
        format!("Venue {}", id),
        Location::new(42.355 + miles_north * LAT_PER_MILE, -71.065),
    )
    .with_price(1)
    .with_hours(7.0, 22.0)
}

/// Search double returning queued responses in order
struct QueuedSearch {
    responses: Mutex<Vec<Result<Vec<Candidate>, String>>>,
}

impl QueuedSearch {
    fn new(responses: Vec<Result<Vec<Candidate>, String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

#[async_trait]
impl CandidateSearch for QueuedSearch {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<Candidate>, SearchError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(SearchError::InvalidResponse("exhausted".to_string()));
        }
        responses.remove(0).map_err(SearchError::InvalidResponse)
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
    deps: SessionDeps,
}

fn fixture(search: Arc<dyn CandidateSearch>, debounce_ms: u64) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let deps = SessionDeps {
        search,
        store: store.clone(),
        cache: cache.clone(),
        settings: SessionSettings {
            debounce: Duration::from_millis(debounce_ms),
            ..SessionSettings::default()
        },
    };
    Fixture { store, cache, deps }
}

fn walk_key() -> RecordKey {
    RecordKey::event("maya", "friday-walk")
}

// =============================================================================
// Scoring and composition
// =============================================================================

#[tokio::test]
async fn test_scenario_open_cozy_nearby_beats_closed_far() {
    let near = venue("near", 0.2).with_vibes(&["cozy"]).with_hours(7.0, 20.0);
    let far = venue("far", 2.0)
        .with_vibes(&["buzzy"])
        .with_price(3)
        .with_hours(17.0, 1.0);

    let profile = PreferenceProfile {
        vibes: vec!["cozy".to_string()],
        price_cap: 2,
        start: Some(origin()),
    };
    assert_eq!(score(&near, &profile, noon()).value, 7.0);
    assert_eq!(score(&far, &profile, noon()).value, -4.0);

    // Through a session the catalog's radius and open-now filters drop the far venue
    let search = Arc::new(CatalogSearch::with_places(vec![near, far]).with_clock(noon));
    let fx = fixture(search, 10);
    let mut session = SessionManager::new_event("Maya", "Friday Walk", fx.deps).with_clock(noon);
    session.set_vibes(&["cozy".to_string()]).unwrap();
    session.set_price_cap(2).unwrap();
    session.set_start(Some(origin())).unwrap();

    let outcome = session.build().await;
    assert!(matches!(outcome, SearchOutcome::Updated { .. }));
    assert_eq!(session.state().plan, vec!["near"]);
}

#[test]
fn test_scenario_locked_candidate_leads_plan() {
    let profile = PreferenceProfile {
        vibes: vec!["cozy".to_string()],
        price_cap: 2,
        start: Some(origin()),
    };
    let c1 = venue("c1", 0.1).with_vibes(&["cozy"]);
    let c2 = venue("c2", 1.0).with_price(3);
    let c3 = venue("c3", 0.5).with_vibes(&["cozy"]);
    let c4 = venue("c4", 0.3);

    let locked: Vec<CandidateId> = vec!["c2".to_string()];
    let out = compose(&[c1, c2, c3, c4], &profile, &HashSet::new(), &locked, noon());
    assert_eq!(out.plan, vec!["c2", "c1", "c3"]);
    assert_eq!(out.alternates, vec!["c4"]);
}

// =============================================================================
// Controller through the session
// =============================================================================

#[tokio::test]
async fn test_scenario_single_open_slot_applies_immediately() {
    let pool = vec![
        venue("a", 0.1).with_vibes(&["cozy"]),
        venue("b", 0.2).with_vibes(&["cozy"]),
        venue("c", 0.3).with_vibes(&["cozy"]),
        venue("d", 0.3),
        venue("e", 0.3),
    ];
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(pool)])), 10);
    let mut session = SessionManager::new_event("maya", "friday walk", fx.deps).with_clock(noon);
    session.set_start(Some(origin())).unwrap();
    session.build().await;
    assert_eq!(session.state().plan, vec!["a", "b", "c"]);
    assert_eq!(session.state().alternates, vec!["d", "e"]);

    session.toggle_keep("a").unwrap();
    session.toggle_keep("c").unwrap();

    let outcome = session.replace("e", None);
    assert_eq!(
        outcome,
        ReplaceOutcome::Applied {
            slot: 1,
            displaced: "b".to_string()
        }
    );
    assert_eq!(*session.mode(), ControllerMode::Idle);
    assert_eq!(session.state().plan, vec!["a", "e", "c"]);
    assert_eq!(session.state().alternates, vec!["b", "d"]);
}

#[tokio::test]
async fn test_pivot_keeps_pins_and_excludes_the_rest() {
    let first = vec![
        venue("a", 0.1).with_vibes(&["cozy"]),
        venue("b", 0.1).with_vibes(&["cozy"]),
        venue("c", 0.1).with_vibes(&["cozy"]),
        venue("d", 0.3),
    ];
    let second = vec![venue("b", 0.1), venue("c", 0.1), venue("d", 0.3), venue("e", 0.3)];
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(first), Ok(second)])), 10);
    let mut session = SessionManager::new_event("maya", "walk", fx.deps).with_clock(noon);
    session.set_start(Some(origin())).unwrap();
    session.build().await;
    session.toggle_keep("a").unwrap();

    // "a" is missing from the second response but stays via its pin
    session.pivot().await;
    let plan = &session.state().plan;
    assert_eq!(plan[0], "a");
    assert!(!plan.contains(&"b".to_string()));
    assert!(!plan.contains(&"c".to_string()));
    assert_eq!(plan.len(), 3);
}

#[tokio::test]
async fn test_superseded_search_is_dropped() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![])), 10);
    let mut session = SessionManager::new_event("maya", "walk", fx.deps).with_clock(noon);

    let first = session.start_build();
    let second = session.start_pivot();
    assert!(second.ticket.token > first.ticket.token);

    let stale = session.finish_search(&first, Ok(vec![venue("old", 0.1)]));
    assert_eq!(stale, SearchOutcome::Stale);
    assert!(session.state().plan.is_empty());

    let fresh = session.finish_search(&second, Ok(vec![venue("new", 0.1)]));
    assert!(matches!(fresh, SearchOutcome::Updated { plan: 1, .. }));
    assert_eq!(session.state().plan, vec!["new"]);
}

#[tokio::test]
async fn test_search_finishing_during_slot_choice_keeps_plan_unique() {
    let pool = vec![
        venue("a", 0.1).with_vibes(&["cozy"]),
        venue("b", 0.1).with_vibes(&["cozy"]),
        venue("c", 0.1).with_vibes(&["cozy"]),
        venue("d", 0.3),
    ];
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(pool)])), 10);
    let mut session = SessionManager::new_event("maya", "walk", fx.deps).with_clock(noon);
    session.set_start(Some(origin())).unwrap();
    session.build().await;

    let inflight = session.start_build();
    assert!(matches!(session.replace("d", None), ReplaceOutcome::AwaitingSlot { .. }));
    let next = vec![
        venue("d", 0.1).with_vibes(&["cozy"]),
        venue("a", 0.1).with_vibes(&["cozy"]),
        venue("b", 0.1).with_vibes(&["cozy"]),
        venue("c", 0.3),
    ];
    session.finish_search(&inflight, Ok(next));
    assert_eq!(*session.mode(), ControllerMode::Idle);

    session.choose_slot(1);
    let plan = &session.state().plan;
    let unique: HashSet<&String> = plan.iter().collect();
    assert_eq!(unique.len(), plan.len());
    assert_eq!(plan[0], "d");
}

#[tokio::test]
async fn test_empty_results_and_failures_are_distinct() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(vec![]), Err("boom".to_string())])), 10);
    let mut session = SessionManager::new_event("maya", "walk", fx.deps);
    assert_eq!(session.build().await, SearchOutcome::NoResults);
    assert!(matches!(session.build().await, SearchOutcome::Failed(_)));
    assert!(session.state().plan.is_empty());
}

// =============================================================================
// Reconciliation and persistence
// =============================================================================

#[tokio::test]
async fn test_scenario_failing_store_falls_back_to_cache() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![])), 10);
    fx.cache.set(
        &walk_key(),
        &json!({"v": 1, "plan": ["p1", "p5", "p7"], "locked": ["p5"], "notes": "bring cash"}),
    );
    fx.store.set_fail_gets(true);

    let session = SessionManager::open(&Reference::parse("/maya/friday-walk"), fx.deps).await;
    assert_eq!(session.source(), LoadSource::LocalCache);
    assert_eq!(session.state().plan, vec!["p1", "p5", "p7"]);
    assert_eq!(session.state().locked, vec!["p5"]);
    assert_eq!(session.state().notes, "bring cash");
}

#[tokio::test]
async fn test_pin_survives_pivot_after_reload_from_cache() {
    let fresh = vec![venue("y", 0.1), venue("z", 0.2), venue("w", 0.3)];
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(fresh)])), 10);
    fx.cache
        .set(&walk_key(), &json!({"plan": ["kept", "x"], "locked": ["kept"]}));

    let mut session = SessionManager::open(&Reference::parse("/maya/friday-walk"), fx.deps)
        .await
        .with_clock(noon);
    assert_eq!(session.source(), LoadSource::LocalCache);

    let outcome = session.pivot().await;
    assert!(matches!(outcome, SearchOutcome::Updated { .. }));
    let plan = &session.state().plan;
    assert_eq!(plan[0], "kept");
    assert!(!plan.contains(&"x".to_string()));
    assert_eq!(plan.len(), 3);
    assert_eq!(session.state().locked, vec!["kept"]);
}

#[tokio::test]
async fn test_durable_record_beats_cache() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![])), 10);
    fx.cache.set(&walk_key(), &json!({"plan": ["cached"]}));
    fx.store
        .put(&walk_key(), &json!({"plan": ["durable"]}))
        .await
        .unwrap();

    let session = SessionManager::open(&Reference::parse("https://pivot.example/maya/friday-walk"), fx.deps).await;
    assert_eq!(session.source(), LoadSource::Durable);
    assert_eq!(session.state().plan, vec!["durable"]);
}

#[tokio::test]
async fn test_live_share_link_restores_elsewhere() {
    let pool = vec![venue("a", 0.1).with_vibes(&["cozy"]), venue("b", 0.2)];
    let fx = fixture(Arc::new(QueuedSearch::new(vec![Ok(pool)])), 10);
    let mut session = SessionManager::new_event("maya", "friday walk", fx.deps).with_clock(noon);
    session.build().await;
    session.add_item("book table").unwrap();
    let link = session.share_link(true).unwrap();

    // A different device: empty stores, no search available
    let other = fixture(Arc::new(QueuedSearch::new(vec![])), 10);
    let restored = SessionManager::open(&Reference::parse(&link), other.deps).await;
    assert_eq!(restored.source(), LoadSource::Snapshot);
    assert_eq!(restored.state().plan, session.state().plan);
    assert_eq!(restored.state().checklist.len(), 1);
    assert_eq!(restored.candidate("a").map(|c| c.name.as_str()), Some("Venue a"));
}

#[tokio::test]
async fn test_rapid_edits_coalesce_into_one_write() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![])), 50);
    let mut session = SessionManager::new_event("maya", "friday walk", fx.deps);
    session.set_notes("one").unwrap();
    session.set_notes("two").unwrap();
    session.set_notes("three").unwrap();

    // The cache sees every edit right away
    assert_eq!(fx.cache.get(&walk_key()).unwrap()["notes"], "three");
    assert_eq!(fx.store.put_count(), 0);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fx.store.put_count(), 1);
    assert_eq!(fx.store.peek(&walk_key()).unwrap()["notes"], "three");
}

#[tokio::test]
async fn test_durable_write_failure_is_silent() {
    let fx = fixture(Arc::new(QueuedSearch::new(vec![])), 10);
    fx.store.set_fail_puts(true);
    let mut session = SessionManager::new_event("maya", "friday walk", fx.deps);
    session.set_notes("still saved locally").unwrap();
    session.flush().await;

    assert!(fx.store.peek(&walk_key()).is_none());
    assert_eq!(fx.cache.get(&walk_key()).unwrap()["notes"], "still saved locally");
}

#[test]
fn test_garbage_snapshot_decodes_to_none() {
    assert!(decode::<SessionRecord>("garbage").is_none());
    assert!(decode::<SessionRecord>("").is_none());
}
