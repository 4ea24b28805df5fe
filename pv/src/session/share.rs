//! Shareable references
//!
//! A share link is the event path plus an optional `s` query parameter holding
//! a URL-safe base64 encoding of a [`SessionRecord`] as JSON.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::record::SessionRecord;
use super::state::SessionState;
use crate::domain::{Candidate, EventIdentity};

/// Query parameter carrying the snapshot
pub const SNAPSHOT_PARAM: &str = "s";

/// Encode any JSON-serializable value; `""` if serialization fails
pub fn encode<T: Serialize>(value: &T) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
        Err(e) => {
            debug!(error = %e, "encode: serialization failed");
            String::new()
        }
    }
}

/// Decode a value produced by [`encode`]; `None` for anything malformed
pub fn decode<T: DeserializeOwned>(text: &str) -> Option<T> {
    let text = text.trim().trim_end_matches('=');
    if text.is_empty() {
        return None;
    }
    let bytes = match URL_SAFE_NO_PAD.decode(text) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "decode: not base64");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "decode: not the expected json");
            None
        }
    }
}

/// A parsed share link
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    /// Path portion, e.g. `/maya/friday-walk`
    pub path: String,
    /// Raw encoded snapshot, if the link carried one
    pub snapshot: Option<String>,
}

impl Reference {
    /// Parse a full URL (`https://host/maya/walk?s=...`) or a bare path
    pub fn parse(link: &str) -> Self {
        let link = link.trim();
        let without_fragment = link.split('#').next().unwrap_or("");
        let without_scheme = match without_fragment.split_once("://") {
            Some((_, rest)) => match rest.find(['/', '?']) {
                Some(idx) => &rest[idx..],
                None => "",
            },
            None => without_fragment,
        };
        let (path, query) = match without_scheme.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (without_scheme, None),
        };
        let snapshot = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(name, _)| *name == SNAPSHOT_PARAM)
                .map(|(_, value)| value.to_string())
                .filter(|value| !value.is_empty())
        });
        Self {
            path: path.to_string(),
            snapshot,
        }
    }

    /// Reference for an identity without a snapshot
    pub fn for_event(event: &EventIdentity) -> Self {
        Self {
            path: event.path(),
            snapshot: None,
        }
    }

    /// Identity derived from the path
    pub fn identity(&self) -> Option<EventIdentity> {
        EventIdentity::from_path(&self.path)
    }

    /// Decoded snapshot; a malformed snapshot is ignored
    pub fn decode_snapshot(&self) -> Option<SessionRecord> {
        self.snapshot
            .as_deref()
            .and_then(decode::<serde_json::Value>)
            .and_then(SessionRecord::from_value)
    }

    /// Render as a path or, with `base`, a full URL
    pub fn to_link(&self, base: Option<&str>) -> String {
        let mut link = String::new();
        if let Some(base) = base {
            link.push_str(base.trim_end_matches('/'));
        }
        link.push_str(&self.path);
        if let Some(snapshot) = &self.snapshot {
            link.push('?');
            link.push_str(SNAPSHOT_PARAM);
            link.push('=');
            link.push_str(snapshot);
        }
        link
    }
}

/// Produce a snapshot reference for the session
///
/// A live share also embeds the known candidate records behind the plan and
/// alternates so the receiver can render them without searching. Pure.
pub fn snapshot(state: &SessionState, known: &[Candidate], live: bool) -> Reference {
    let places = live.then(|| {
        known
            .iter()
            .filter(|c| state.plan.contains(&c.id) || state.alternates.contains(&c.id))
            .cloned()
            .collect::<Vec<_>>()
    });
    let record = state.to_record(places);
    let encoded = encode(&record);
    Reference {
        path: state.event.as_ref().map(EventIdentity::path).unwrap_or_else(|| "/".to_string()),
        snapshot: (!encoded.is_empty()).then_some(encoded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, StartPoint};
    use crate::session::ChecklistItem;
    use proptest::prelude::*;

    #[test]
    fn test_decode_garbage_is_none() {
        assert!(decode::<SessionRecord>("garbage").is_none());
        assert!(decode::<SessionRecord>("").is_none());
        assert!(decode::<SessionRecord>("!!!***").is_none());
        // Valid base64, not a record
        assert!(decode::<SessionRecord>(&encode(&42)).is_none());
    }

    #[test]
    fn test_encode_is_url_safe() {
        let encoded = encode(&serde_json::json!({"notes": "???>>>~~~"}));
        assert!(!encoded.is_empty());
        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_padded_input_is_accepted() {
        let encoded = encode(&"ab");
        let padded = format!("{}==", encoded);
        assert_eq!(decode::<String>(&padded), Some("ab".to_string()));
    }

    #[test]
    fn test_parse_reference() {
        let r = Reference::parse("https://pivot.example/maya/friday-walk?x=1&s=abc#top");
        assert_eq!(r.path, "/maya/friday-walk");
        assert_eq!(r.snapshot.as_deref(), Some("abc"));

        let r = Reference::parse("/e/maya/friday-walk");
        assert_eq!(r.path, "/e/maya/friday-walk");
        assert!(r.snapshot.is_none());
        assert_eq!(r.identity().unwrap().slug, "friday-walk");

        let r = Reference::parse("https://pivot.example");
        assert_eq!(r.path, "");
        assert!(r.identity().is_none());
    }

    #[test]
    fn test_to_link() {
        let r = Reference {
            path: "/maya/walk".to_string(),
            snapshot: Some("xyz".to_string()),
        };
        assert_eq!(r.to_link(Some("https://pivot.example/")), "https://pivot.example/maya/walk?s=xyz");
        assert_eq!(Reference::parse(&r.to_link(None)), r);
    }

    #[test]
    fn test_live_snapshot_embeds_plan_places() {
        let mut state = SessionState::for_event(EventIdentity::new("maya", "walk"));
        state.plan = vec!["a".to_string()];
        state.alternates = vec!["b".to_string()];
        let known = vec![
            Candidate::new("a", "A", Location::new(1.0, 1.0)),
            Candidate::new("b", "B", Location::new(1.0, 1.0)),
            Candidate::new("z", "Z", Location::new(1.0, 1.0)),
        ];

        let plain = snapshot(&state, &known, false).decode_snapshot().unwrap();
        assert!(plain.places.is_none());

        let live = snapshot(&state, &known, true);
        assert_eq!(live.path, "/maya/walk");
        let record = live.decode_snapshot().unwrap();
        let ids: Vec<String> = record.places.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    fn coordinate(tenth_millidegrees: i32) -> f64 {
        tenth_millidegrees as f64 / 1e4
    }

    prop_compose! {
        fn arb_start()(
            label in "[A-Za-z ]{1,12}",
            lat in -900_000i32..900_000,
            lng in -1_800_000i32..1_800_000,
        ) -> StartPoint {
            StartPoint::new(label, coordinate(lat), coordinate(lng))
        }
    }

    prop_compose! {
        fn arb_place()(
            id in "[a-z0-9]{1,6}",
            name in ".{0,12}",
            lat in -900_000i32..900_000,
            lng in -1_800_000i32..1_800_000,
            price in 1u8..=3,
            open in 0u8..48,
            close in 0u8..48,
            vibes in prop::collection::vec("[a-z]{3,8}", 0..3),
            open_now in proptest::option::of(any::<bool>()),
        ) -> Candidate {
            let mut place = Candidate::new(id, name, Location::new(coordinate(lat), coordinate(lng)))
                .with_price(price)
                .with_hours(f64::from(open) / 2.0, f64::from(close) / 2.0)
                .with_open_now(open_now);
            place.vibes = vibes;
            place
        }
    }

    prop_compose! {
        fn arb_state()(
            owner in "[a-z]{1,8}",
            name in "[A-Za-z ]{1,16}",
            links in prop::collection::btree_map("[a-z]{1,8}", "https://[a-z]{1,10}\\.example/[a-z0-9]{0,8}", 0..3),
            start in proptest::option::of(arb_start()),
            vibes in prop::collection::btree_set("[a-z]{3,8}", 0..4),
            cap in 1u8..=3,
            plan in prop::collection::vec("[a-z0-9]{1,6}", 0..3),
            alternates in prop::collection::vec("[a-z0-9]{1,6}", 0..4),
            locked in prop::collection::vec("[a-z0-9]{1,6}", 0..3),
            checklist in prop::collection::vec((".{0,20}", any::<bool>()), 0..4),
            notes in ".{0,40}",
        ) -> SessionState {
            let mut state = SessionState::for_event(EventIdentity::new(&owner, &name));
            state.links = links;
            state.profile.start = start;
            state.profile.vibes = vibes.into_iter().collect();
            state.profile.price_cap = cap;
            state.plan = plan;
            state.alternates = alternates;
            state.locked = locked;
            state.checklist = checklist
                .into_iter()
                .map(|(text, done)| ChecklistItem { done, ..ChecklistItem::new(text) })
                .collect();
            state.notes = notes;
            state
        }
    }

    proptest! {
        #[test]
        fn prop_snapshot_round_trip(
            state in arb_state(),
            places in proptest::option::of(prop::collection::vec(arb_place(), 0..3)),
        ) {
            let record = state.to_record(places);
            let encoded = encode(&record);
            let decoded: Option<SessionRecord> = decode(&encoded);
            prop_assert_eq!(decoded, Some(record.clone()));

            let reference = Reference { path: "/maya/walk".to_string(), snapshot: Some(encoded) };
            let restored = reference.decode_snapshot();
            prop_assert_eq!(restored.as_ref(), Some(&record));

            let mut applied = SessionState::default();
            applied.apply(&record);
            prop_assert_eq!(applied, state);
        }

        #[test]
        fn prop_decode_never_panics(text in ".{0,64}") {
            let _ = decode::<SessionRecord>(&text);
        }
    }
}
