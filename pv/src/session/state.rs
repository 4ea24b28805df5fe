//! In-memory session aggregate

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

use super::record::SessionRecord;
use crate::domain::{Candidate, CandidateId, EventIdentity, PreferenceProfile};

/// Named external URLs attached to an event (tickets, menus, a group chat...)
pub type ExternalLinks = BTreeMap<String, String>;

/// One checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl ChecklistItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.into(),
            done: false,
        }
    }
}

/// Everything that makes up one planning session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub event: Option<EventIdentity>,
    pub links: ExternalLinks,
    pub profile: PreferenceProfile,
    pub plan: Vec<CandidateId>,
    pub alternates: Vec<CandidateId>,
    pub locked: Vec<CandidateId>,
    pub checklist: Vec<ChecklistItem>,
    pub notes: String,
}

impl SessionState {
    /// Fresh session for a new event
    pub fn for_event(event: EventIdentity) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.locked.iter().any(|l| l == id)
    }

    /// Plan indices whose occupant is not locked
    pub fn open_slots(&self) -> Vec<usize> {
        self.plan
            .iter()
            .enumerate()
            .filter(|(_, id)| !self.is_locked(id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Plan ids that are not locked
    pub fn unlocked_plan(&self) -> Vec<CandidateId> {
        self.plan.iter().filter(|id| !self.is_locked(id)).cloned().collect()
    }

    /// Append a checklist item; returns its id, or `None` for blank text
    pub fn add_item(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let item = ChecklistItem::new(text);
        let id = item.id.clone();
        debug!(%id, "add_item: called");
        self.checklist.push(item);
        Some(id)
    }

    /// Flip an item's done flag; returns the new value
    pub fn toggle_item(&mut self, id: &str) -> Option<bool> {
        let item = self.checklist.iter_mut().find(|i| i.id == id)?;
        item.done = !item.done;
        Some(item.done)
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.checklist.len();
        self.checklist.retain(|i| i.id != id);
        self.checklist.len() != before
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Full record of this session
    ///
    /// `places` is only set for live shares, which carry the candidate
    /// records behind the plan and alternates.
    pub fn to_record(&self, places: Option<Vec<Candidate>>) -> SessionRecord {
        SessionRecord {
            event: self.event.clone(),
            links: Some(self.links.clone()),
            start: Some(self.profile.start.clone()),
            vibes: Some(self.profile.vibes.clone()),
            price_cap: Some(self.profile.price_cap),
            plan: Some(self.plan.clone()),
            locked: Some(self.locked.clone()),
            checklist: Some(self.checklist.clone()),
            notes: Some(self.notes.clone()),
            alternates: Some(self.alternates.clone()),
            places,
            ..SessionRecord::default()
        }
    }

    /// Overwrite every field group present in `record`, leaving the rest alone
    pub fn apply(&mut self, record: &SessionRecord) {
        debug!(groups = record.group_count(), "apply: called");
        if let Some(event) = &record.event {
            self.event = Some(event.clone());
        }
        if let Some(links) = &record.links {
            self.links = links.clone();
        }
        if let Some(start) = &record.start {
            self.profile.start = start.clone();
        }
        if let Some(vibes) = &record.vibes {
            self.profile.set_vibes(vibes.iter().cloned());
        }
        if let Some(cap) = record.price_cap {
            self.profile.set_price_cap(cap as i64);
        }
        if let Some(plan) = &record.plan {
            self.plan = plan.clone();
        }
        if let Some(locked) = &record.locked {
            self.locked = locked.clone();
        }
        if let Some(checklist) = &record.checklist {
            self.checklist = checklist.clone();
        }
        if let Some(notes) = &record.notes {
            self.notes = notes.clone();
        }
        if let Some(alternates) = &record.alternates {
            self.alternates = alternates.clone();
        }
    }
}
