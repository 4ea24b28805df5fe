//! Persisted session record
//!
//! The same shape is used by all three tiers: the share snapshot, the durable
//! record and the device cache. Every field group is optional so that partial
//! records (older versions, hand-built links) only override what they carry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::state::{ChecklistItem, ExternalLinks};
use crate::domain::{Candidate, CandidateId, EventIdentity, StartPoint};

/// Current record format version
pub const RECORD_VERSION: u32 = 1;

fn current_version() -> u32 {
    RECORD_VERSION
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default = "current_version")]
    pub v: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<EventIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ExternalLinks>,
    /// `Some(None)` records that the user cleared the start point
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub start: Option<Option<StartPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cap: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<CandidateId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<Vec<CandidateId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternates: Option<Vec<CandidateId>>,
    /// Candidate records embedded by a live share
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places: Option<Vec<Candidate>>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            v: RECORD_VERSION,
            event: None,
            links: None,
            start: None,
            vibes: None,
            price_cap: None,
            plan: None,
            locked: None,
            checklist: None,
            notes: None,
            alternates: None,
            places: None,
        }
    }
}

impl SessionRecord {
    /// Number of field groups present (for logging)
    pub fn group_count(&self) -> usize {
        [
            self.event.is_some(),
            self.links.is_some(),
            self.start.is_some(),
            self.vibes.is_some(),
            self.price_cap.is_some(),
            self.plan.is_some(),
            self.locked.is_some(),
            self.checklist.is_some(),
            self.notes.is_some(),
            self.alternates.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Parse a stored record; `None` for anything that is not a JSON object
    ///
    /// Groups are read one at a time. A malformed group is dropped on its own
    /// and the rest of the record still applies.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            debug!("from_value: not an object");
            return None;
        };
        Some(Self {
            v: group(&mut map, "v").unwrap_or(RECORD_VERSION),
            event: group(&mut map, "event"),
            links: group(&mut map, "links"),
            start: group::<Option<StartPoint>>(&mut map, "start"),
            vibes: group(&mut map, "vibes"),
            price_cap: group(&mut map, "priceCap"),
            plan: group(&mut map, "plan"),
            locked: group(&mut map, "locked"),
            checklist: group(&mut map, "checklist"),
            notes: group(&mut map, "notes"),
            alternates: group(&mut map, "alternates"),
            places: group(&mut map, "places"),
        })
    }
}

fn group<T: DeserializeOwned>(map: &mut Map<String, Value>, key: &str) -> Option<T> {
    let raw = map.remove(key)?;
    match serde_json::from_value(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(key, error = %e, "from_value: dropping malformed group");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_groups_stay_none() {
        let record = SessionRecord::from_value(json!({"plan": ["a"]})).unwrap();
        assert_eq!(record.v, RECORD_VERSION);
        assert_eq!(record.plan, Some(vec!["a".to_string()]));
        assert!(record.start.is_none());
        assert!(record.notes.is_none());
        assert_eq!(record.group_count(), 1);
    }

    #[test]
    fn test_null_start_is_explicit() {
        let record = SessionRecord::from_value(json!({"start": null})).unwrap();
        assert_eq!(record.start, Some(None));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"v": 1, "start": null}));
    }

    #[test]
    fn test_camel_case_keys() {
        let record = SessionRecord {
            price_cap: Some(3),
            ..SessionRecord::default()
        };
        let json = record.to_value().unwrap();
        assert_eq!(json["priceCap"], 3);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(SessionRecord::from_value(json!("nope")).is_none());
        assert!(SessionRecord::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_malformed_group_is_dropped_alone() {
        let record = SessionRecord::from_value(json!({"plan": 5, "notes": "x"})).unwrap();
        assert!(record.plan.is_none());
        assert_eq!(record.notes.as_deref(), Some("x"));

        let record = SessionRecord::from_value(json!({"priceCap": -1, "plan": ["a"], "start": "nowhere"})).unwrap();
        assert!(record.price_cap.is_none());
        assert!(record.start.is_none());
        assert_eq!(record.plan, Some(vec!["a".to_string()]));
        assert_eq!(record.group_count(), 1);
    }
}
