//! Pivot/replace state machine

use chrono::NaiveTime;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::outcome::{ControllerError, IgnoreReason, Notice, ReplaceOutcome, SearchKind, SearchOutcome, SearchTicket};
use crate::composer::{self, ALTERNATE_POOL_SIZE, Composition, PLAN_SIZE};
use crate::domain::{Candidate, CandidateId};
use crate::search::SearchError;
use crate::session::SessionState;

/// Interaction mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControllerMode {
    #[default]
    Idle,
    /// A replace hit several open slots; waiting for the user to pick one
    AwaitingSlotChoice {
        alternate: CandidateId,
        open_slots: Vec<usize>,
    },
}

/// Drives build, pivot, keep and replace on top of the composer
///
/// Owns the candidate pool and the search tokens; the plan, alternates and
/// pins live in the [`SessionState`] passed to each call.
#[derive(Debug, Default)]
pub struct PlanController {
    mode: ControllerMode,
    latest_token: u64,
    known: HashMap<CandidateId, Candidate>,
}

impl PlanController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &ControllerMode {
        &self.mode
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self.mode, ControllerMode::AwaitingSlotChoice { .. })
    }

    /// Refuse state-changing actions while a slot choice is pending
    pub fn ensure_idle(&self) -> Result<(), ControllerError> {
        if self.is_awaiting() {
            debug!("ensure_idle: slot choice pending");
            return Err(ControllerError::SlotChoicePending);
        }
        Ok(())
    }

    /// Make candidates resolvable (search results, live-share places)
    pub fn remember<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = Candidate>,
    {
        for candidate in candidates {
            self.known.insert(candidate.id.clone(), candidate);
        }
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.known.get(id)
    }

    /// Known records for `ids`, in `ids` order, skipping unknown ids
    pub fn candidates_for(&self, ids: &[CandidateId]) -> Vec<Candidate> {
        ids.iter().filter_map(|id| self.known.get(id).cloned()).collect()
    }

    /// Start a fresh search with no exclusions
    pub fn begin_build(&mut self, state: &SessionState) -> SearchTicket {
        self.begin(SearchKind::Build, HashSet::new(), state)
    }

    /// Start a search that excludes every unlocked plan entry
    pub fn begin_pivot(&mut self, state: &SessionState) -> SearchTicket {
        let excluded: HashSet<CandidateId> = state.unlocked_plan().into_iter().collect();
        self.begin(SearchKind::Pivot, excluded, state)
    }

    fn begin(&mut self, kind: SearchKind, excluded: HashSet<CandidateId>, state: &SessionState) -> SearchTicket {
        if let ControllerMode::AwaitingSlotChoice { alternate, .. } = &self.mode {
            debug!(%alternate, "begin: discarding pending slot choice");
        }
        self.mode = ControllerMode::Idle;
        self.latest_token += 1;
        debug!(%kind, token = self.latest_token, excluded = excluded.len(), locked = state.locked.len(), "begin: called");
        SearchTicket {
            token: self.latest_token,
            kind,
            excluded,
        }
    }

    /// Apply the result of the search started with `ticket`
    ///
    /// Results for any ticket but the newest are dropped. Failures and empty
    /// results clear the plan and alternates but keep the pins.
    pub fn complete(
        &mut self,
        ticket: &SearchTicket,
        result: Result<Vec<Candidate>, SearchError>,
        state: &mut SessionState,
        at: NaiveTime,
    ) -> SearchOutcome {
        debug!(token = ticket.token, latest = self.latest_token, "complete: called");
        if ticket.token != self.latest_token {
            debug!(token = ticket.token, "complete: stale results dropped");
            return SearchOutcome::Stale;
        }
        if let ControllerMode::AwaitingSlotChoice { alternate, .. } = &self.mode {
            debug!(%alternate, "complete: new plan discards pending slot choice");
        }
        self.mode = ControllerMode::Idle;

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                info!(kind = %ticket.kind, error = %e, "search failed");
                state.plan.clear();
                state.alternates.clear();
                return SearchOutcome::Failed(e.to_string());
            }
        };

        if results.is_empty() {
            debug!(kind = %ticket.kind, "complete: no results");
            state.plan.clear();
            state.alternates.clear();
            return SearchOutcome::NoResults;
        }

        // Pinned picks the provider did not return this time stay eligible
        let mut pool = results.clone();
        let mut unresolved: Vec<CandidateId> = Vec::new();
        for id in &state.locked {
            if pool.iter().any(|c| &c.id == id) {
                continue;
            }
            if let Some(known) = self.known.get(id) {
                debug!(%id, "complete: carrying forward locked candidate");
                pool.push(known.clone());
            } else if state.plan.contains(id) {
                debug!(%id, "complete: keeping locked plan entry without a record");
                unresolved.push(id.clone());
            }
        }
        self.remember(results);

        let composition = composer::compose(&pool, &state.profile, &ticket.excluded, &state.locked, at);
        let composition = keep_unresolved_pins(composition, &unresolved, &state.locked);
        if composition.is_empty() {
            state.plan.clear();
            state.alternates.clear();
            return SearchOutcome::NoResults;
        }

        state.plan = composition.plan;
        state.alternates = composition.alternates;
        info!(kind = %ticket.kind, plan = state.plan.len(), alternates = state.alternates.len(), "plan composed");
        SearchOutcome::Updated {
            plan: state.plan.len(),
            alternates: state.alternates.len(),
        }
    }

    /// Pin or unpin a candidate; returns whether it is now pinned
    pub fn toggle_keep(&mut self, id: &str, state: &mut SessionState) -> Result<bool, ControllerError> {
        debug!(%id, "toggle_keep: called");
        self.ensure_idle()?;
        if state.is_locked(id) {
            state.locked.retain(|l| l != id);
            Ok(false)
        } else {
            state.locked.push(id.to_string());
            Ok(true)
        }
    }

    /// Swap an alternate into the plan
    ///
    /// With `target` the alternate goes into that slot. Without it the open
    /// (unlocked) slots decide: none rejects, one applies immediately, several
    /// wait for [`choose_slot`](Self::choose_slot).
    pub fn replace(&mut self, alternate: &str, target: Option<usize>, state: &mut SessionState) -> ReplaceOutcome {
        debug!(%alternate, ?target, "replace: called");
        if self.ensure_idle().is_err() {
            return ReplaceOutcome::Rejected(Notice::SlotChoicePending);
        }
        if state.plan.iter().any(|id| id == alternate) {
            debug!(%alternate, "replace: already in plan");
            return ReplaceOutcome::Ignored(IgnoreReason::AlreadyInPlan);
        }
        if !self.known.contains_key(alternate) && !state.alternates.iter().any(|id| id == alternate) {
            debug!(%alternate, "replace: unknown candidate");
            return ReplaceOutcome::Ignored(IgnoreReason::UnknownCandidate);
        }

        if let Some(slot) = target {
            return match state.plan.get(slot) {
                None => ReplaceOutcome::Ignored(IgnoreReason::InvalidSlot),
                Some(occupant) if state.is_locked(occupant) => {
                    debug!(slot, "replace: target slot locked");
                    ReplaceOutcome::Ignored(IgnoreReason::SlotLocked)
                }
                Some(_) => apply(alternate, slot, state),
            };
        }

        let open_slots = state.open_slots();
        match open_slots.as_slice() {
            [] => {
                debug!("replace: all slots kept");
                ReplaceOutcome::Rejected(Notice::AllSlotsKept)
            }
            [slot] => apply(alternate, *slot, state),
            _ => {
                debug!(%alternate, ?open_slots, "replace: awaiting slot choice");
                self.mode = ControllerMode::AwaitingSlotChoice {
                    alternate: alternate.to_string(),
                    open_slots: open_slots.clone(),
                };
                ReplaceOutcome::AwaitingSlot {
                    alternate: alternate.to_string(),
                    open_slots,
                }
            }
        }
    }

    /// Resolve a pending replace; an invalid pick keeps waiting
    pub fn choose_slot(&mut self, slot: usize, state: &mut SessionState) -> ReplaceOutcome {
        debug!(slot, "choose_slot: called");
        let ControllerMode::AwaitingSlotChoice { alternate, open_slots } = &self.mode else {
            return ReplaceOutcome::Ignored(IgnoreReason::NothingPending);
        };
        if state.plan.contains(alternate) {
            debug!(%alternate, "choose_slot: alternate already in plan");
            self.mode = ControllerMode::Idle;
            return ReplaceOutcome::Ignored(IgnoreReason::AlreadyInPlan);
        }
        if !open_slots.contains(&slot) || slot >= state.plan.len() || state.is_locked(&state.plan[slot]) {
            debug!(slot, "choose_slot: not an open slot");
            return ReplaceOutcome::Ignored(IgnoreReason::InvalidSlot);
        }
        let alternate = alternate.clone();
        self.mode = ControllerMode::Idle;
        apply(&alternate, slot, state)
    }

    /// Abandon a pending replace; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_awaiting();
        debug!(was_pending, "cancel: called");
        self.mode = ControllerMode::Idle;
        was_pending
    }
}

/// Put pins that no record backs back at the head of the plan, in pin order
///
/// Fill picks pushed out of the plan move to the front of the alternates.
fn keep_unresolved_pins(composition: Composition, unresolved: &[CandidateId], locked: &[CandidateId]) -> Composition {
    if unresolved.is_empty() {
        return composition;
    }
    let mut plan: Vec<CandidateId> = locked
        .iter()
        .filter(|id| unresolved.contains(id) || composition.plan.contains(id))
        .take(PLAN_SIZE)
        .cloned()
        .collect();
    let mut alternates: Vec<CandidateId> = Vec::new();
    for id in composition.plan {
        if plan.contains(&id) {
            continue;
        }
        if plan.len() < PLAN_SIZE {
            plan.push(id);
        } else if !locked.contains(&id) {
            alternates.push(id);
        }
    }
    alternates.extend(composition.alternates);
    alternates.truncate(ALTERNATE_POOL_SIZE);
    Composition { plan, alternates }
}

/// Put `alternate` in `slot`; the displaced id heads the alternate pool
fn apply(alternate: &str, slot: usize, state: &mut SessionState) -> ReplaceOutcome {
    if state.plan.iter().any(|id| id == alternate) {
        debug!(%alternate, "apply: already in plan");
        return ReplaceOutcome::Ignored(IgnoreReason::AlreadyInPlan);
    }
    let displaced = std::mem::replace(&mut state.plan[slot], alternate.to_string());
    state.alternates.retain(|id| id != alternate && *id != displaced);
    state.alternates.insert(0, displaced.clone());
    state.alternates.truncate(ALTERNATE_POOL_SIZE);
    info!(%alternate, %displaced, slot, "replaced plan slot");
    ReplaceOutcome::Applied { slot, displaced }
}
