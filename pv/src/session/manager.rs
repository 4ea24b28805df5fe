//! Session runtime
//!
//! Single owner of one [`SessionState`]. Every user action goes through here:
//! the controller decides, the persister writes, observers hear about it.

use chrono::NaiveTime;
use pivotstore::{LocalCache, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::share::{self, Reference};
use super::state::SessionState;
use crate::config::{Config, ResolvedSearchConfig};
use crate::controller::{ControllerMode, Notice, PlanController, ReplaceOutcome, SearchOutcome, SearchTicket};
use crate::domain::{Candidate, EventIdentity, Location, StartPoint, start_presets};
use crate::error::SessionError;
use crate::events::{Observers, SessionEvent, Subscription};
use crate::search::{CandidateSearch, DEFAULT_RADIUS_M, SearchError, SearchQuery};
use crate::sync::{DEFAULT_DEBOUNCE, LoadSource, Persister, reconcile};

/// Tunables a session needs from configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub query: String,
    pub radius_m: u32,
    pub open_now_only: bool,
    pub debounce: Duration,
    pub share_base: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            query: String::new(),
            radius_m: DEFAULT_RADIUS_M,
            open_now_only: true,
            debounce: DEFAULT_DEBOUNCE,
            share_base: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config, search: &ResolvedSearchConfig) -> Self {
        Self {
            query: search.query.clone(),
            radius_m: search.radius_m,
            open_now_only: search.open_now,
            debounce: Duration::from_millis(config.storage.debounce_ms),
            share_base: config.share.base_url.clone(),
        }
    }
}

/// Collaborators handed to a session at construction
#[derive(Clone)]
pub struct SessionDeps {
    pub search: Arc<dyn CandidateSearch>,
    pub store: Arc<dyn RecordStore>,
    pub cache: Arc<dyn LocalCache>,
    pub settings: SessionSettings,
}

/// A search that has been started but whose results are not applied yet
#[derive(Debug, Clone)]
pub struct PendingSearch {
    pub ticket: SearchTicket,
    pub query: SearchQuery,
}

pub struct SessionManager {
    state: SessionState,
    source: LoadSource,
    controller: PlanController,
    persister: Persister,
    search: Arc<dyn CandidateSearch>,
    settings: SessionSettings,
    observers: Observers<SessionEvent>,
    clock: fn() -> NaiveTime,
}

impl SessionManager {
    fn with_state(state: SessionState, source: LoadSource, deps: SessionDeps) -> Self {
        Self {
            state,
            source,
            controller: PlanController::new(),
            persister: Persister::new(deps.cache, deps.store, deps.settings.debounce),
            search: deps.search,
            settings: deps.settings,
            observers: Observers::new(),
            clock: || chrono::Local::now().time(),
        }
    }

    /// Start a new event and persist its initial record
    pub fn new_event(owner: &str, display_name: &str, deps: SessionDeps) -> Self {
        let event = EventIdentity::new(owner, display_name);
        info!(path = %event.path(), "new event");
        let manager = Self::with_state(SessionState::for_event(event), LoadSource::Defaults, deps);
        manager.persist();
        manager
    }

    /// Reconstruct a session from a share link or event path
    pub async fn open(reference: &Reference, deps: SessionDeps) -> Self {
        debug!(path = %reference.path, "open: called");
        let loaded = reconcile(reference, deps.store.as_ref(), deps.cache.as_ref()).await;
        let mut manager = Self::with_state(loaded.state, loaded.source, deps);
        manager.controller.remember(loaded.places);
        manager.emit(SessionEvent::Loaded { source: loaded.source });
        manager
    }

    /// Evaluate open/closed status against a fixed clock
    pub fn with_clock(mut self, clock: fn() -> NaiveTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> LoadSource {
        self.source
    }

    pub fn mode(&self) -> &ControllerMode {
        self.controller.mode()
    }

    pub fn now(&self) -> NaiveTime {
        (self.clock)()
    }

    /// Make venue records resolvable by id (e.g. a local catalog)
    pub fn remember(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        self.controller.remember(candidates);
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.controller.candidate(id)
    }

    /// Observe session changes; see [`SessionEvent`]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    // === Searches ===

    /// Begin a build; apply the results with [`finish_search`](Self::finish_search)
    pub fn start_build(&mut self) -> PendingSearch {
        let ticket = self.controller.begin_build(&self.state);
        self.pending(ticket)
    }

    /// Begin a pivot; unlocked plan entries are excluded from the next plan
    pub fn start_pivot(&mut self) -> PendingSearch {
        let ticket = self.controller.begin_pivot(&self.state);
        self.pending(ticket)
    }

    fn pending(&self, ticket: SearchTicket) -> PendingSearch {
        let location = self
            .state
            .profile
            .start
            .as_ref()
            .map(StartPoint::location)
            .or_else(|| start_presets().first().map(StartPoint::location))
            // Non-finite reads as "distance unknown" downstream
            .unwrap_or(Location::new(f64::NAN, f64::NAN));
        let terms = if self.settings.query.trim().is_empty() {
            self.state.profile.vibes.join(" ")
        } else {
            self.settings.query.clone()
        };
        let query = SearchQuery::new(terms, location)
            .with_radius(self.settings.radius_m)
            .with_open_now_only(self.settings.open_now_only);
        self.emit(SessionEvent::SearchStarted {
            kind: ticket.kind,
            token: ticket.token,
        });
        PendingSearch { ticket, query }
    }

    /// Apply search results; results of superseded searches are dropped
    pub fn finish_search(&mut self, pending: &PendingSearch, result: Result<Vec<Candidate>, SearchError>) -> SearchOutcome {
        let at = self.now();
        let outcome = self.controller.complete(&pending.ticket, result, &mut self.state, at);
        if outcome == SearchOutcome::Stale {
            return outcome;
        }
        self.persist();
        self.emit(SessionEvent::PlanChanged {
            plan: self.state.plan.clone(),
            alternates: self.state.alternates.clone(),
        });
        if let Some(notice) = outcome.notice() {
            self.emit(SessionEvent::Notice(notice));
        }
        outcome
    }

    pub async fn build(&mut self) -> SearchOutcome {
        let pending = self.start_build();
        let result = self.search.search(&pending.query).await;
        self.finish_search(&pending, result)
    }

    pub async fn pivot(&mut self) -> SearchOutcome {
        let pending = self.start_pivot();
        let result = self.search.search(&pending.query).await;
        self.finish_search(&pending, result)
    }

    // === Plan edits ===

    pub fn toggle_keep(&mut self, id: &str) -> Result<bool, SessionError> {
        let kept = self.refuse_if_awaiting(|m| m.controller.toggle_keep(id, &mut m.state))??;
        self.persist();
        self.emit(SessionEvent::KeepToggled { id: id.to_string(), kept });
        Ok(kept)
    }

    pub fn replace(&mut self, alternate: &str, slot: Option<usize>) -> ReplaceOutcome {
        let outcome = self.controller.replace(alternate, slot, &mut self.state);
        self.after_replace(&outcome);
        outcome
    }

    pub fn choose_slot(&mut self, slot: usize) -> ReplaceOutcome {
        let outcome = self.controller.choose_slot(slot, &mut self.state);
        self.after_replace(&outcome);
        outcome
    }

    pub fn cancel(&mut self) -> bool {
        self.controller.cancel()
    }

    fn after_replace(&mut self, outcome: &ReplaceOutcome) {
        match outcome {
            ReplaceOutcome::Applied { .. } => {
                self.persist();
                self.emit(SessionEvent::PlanChanged {
                    plan: self.state.plan.clone(),
                    alternates: self.state.alternates.clone(),
                });
            }
            ReplaceOutcome::AwaitingSlot { alternate, open_slots } => self.emit(SessionEvent::AwaitingSlot {
                alternate: alternate.clone(),
                open_slots: open_slots.clone(),
            }),
            ReplaceOutcome::Rejected(notice) => self.emit(SessionEvent::Notice(notice.clone())),
            ReplaceOutcome::Ignored(reason) => debug!(?reason, "replace ignored"),
        }
    }

    // === Preferences ===

    pub fn toggle_vibe(&mut self, vibe: &str) -> Result<bool, SessionError> {
        let on = self.refuse_if_awaiting(|m| m.state.profile.toggle_vibe(vibe))?;
        self.preferences_changed();
        Ok(on)
    }

    pub fn set_vibes(&mut self, vibes: &[String]) -> Result<(), SessionError> {
        self.refuse_if_awaiting(|m| m.state.profile.set_vibes(vibes.iter().cloned()))?;
        self.preferences_changed();
        Ok(())
    }

    pub fn set_price_cap(&mut self, cap: i64) -> Result<(), SessionError> {
        self.refuse_if_awaiting(|m| m.state.profile.set_price_cap(cap))?;
        self.preferences_changed();
        Ok(())
    }

    pub fn set_start(&mut self, start: Option<StartPoint>) -> Result<(), SessionError> {
        self.refuse_if_awaiting(|m| m.state.profile.start = start)?;
        self.preferences_changed();
        Ok(())
    }

    fn preferences_changed(&mut self) {
        self.persist();
        self.emit(SessionEvent::PreferencesChanged);
    }

    // === Checklist, notes, links ===

    pub fn add_item(&mut self, text: &str) -> Result<Option<String>, SessionError> {
        let id = self.refuse_if_awaiting(|m| m.state.add_item(text))?;
        if id.is_some() {
            self.details_changed();
        }
        Ok(id)
    }

    pub fn toggle_item(&mut self, id: &str) -> Result<Option<bool>, SessionError> {
        let done = self.refuse_if_awaiting(|m| m.state.toggle_item(id))?;
        if done.is_some() {
            self.details_changed();
        }
        Ok(done)
    }

    pub fn remove_item(&mut self, id: &str) -> Result<bool, SessionError> {
        let removed = self.refuse_if_awaiting(|m| m.state.remove_item(id))?;
        if removed {
            self.details_changed();
        }
        Ok(removed)
    }

    pub fn set_notes(&mut self, notes: &str) -> Result<(), SessionError> {
        self.refuse_if_awaiting(|m| m.state.set_notes(notes))?;
        self.details_changed();
        Ok(())
    }

    /// Set or clear (`None`) a named external link
    pub fn set_link(&mut self, name: &str, url: Option<&str>) -> Result<(), SessionError> {
        self.refuse_if_awaiting(|m| match url {
            Some(url) => {
                m.state.links.insert(name.to_string(), url.to_string());
            }
            None => {
                m.state.links.remove(name);
            }
        })?;
        self.details_changed();
        Ok(())
    }

    fn details_changed(&mut self) {
        self.persist();
        self.emit(SessionEvent::DetailsChanged);
    }

    // === Sharing and persistence ===

    /// Share link for the session; a live link embeds the plan's venues
    pub fn share_link(&self, live: bool) -> Result<String, SessionError> {
        if self.state.event.is_none() {
            return Err(SessionError::NoEvent);
        }
        let ids: Vec<String> = self.state.plan.iter().chain(self.state.alternates.iter()).cloned().collect();
        let known = self.controller.candidates_for(&ids);
        let reference = share::snapshot(&self.state, &known, live);
        Ok(reference.to_link(self.settings.share_base.as_deref()))
    }

    /// Send any scheduled durable write now
    pub async fn flush(&self) {
        self.persister.flush().await;
    }

    fn persist(&self) {
        let Some(event) = &self.state.event else {
            debug!("persist: no event identity; skipped");
            return;
        };
        match self.state.to_record(None).to_value() {
            Ok(value) => self.persister.save(&event.record_key(), value),
            Err(e) => debug!(error = %e, "persist: record not serializable"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event_type = event.event_type(), "emit");
        self.observers.notify(&event);
    }

    fn refuse_if_awaiting<T>(&mut self, action: impl FnOnce(&mut Self) -> T) -> Result<T, SessionError> {
        if let Err(e) = self.controller.ensure_idle() {
            self.emit(SessionEvent::Notice(Notice::from(e.clone())));
            return Err(e.into());
        }
        Ok(action(self))
    }
}
