//! Controller results and user-visible notices

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::CandidateId;

/// Which user action started a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Build,
    Pivot,
}

impl std::fmt::Display for SearchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Pivot => write!(f, "pivot"),
        }
    }
}

/// Handle for one in-flight search
///
/// Only the ticket with the newest token may apply its results; older tickets
/// are stale and their results are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub token: u64,
    pub kind: SearchKind,
    pub excluded: HashSet<CandidateId>,
}

/// What happened when search results came back
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Plan and alternates were recomposed
    Updated { plan: usize, alternates: usize },
    /// The search succeeded but nothing was eligible; plan cleared
    NoResults,
    /// The search failed; plan cleared, pins kept
    Failed(String),
    /// A newer search superseded this one; results dropped
    Stale,
}

impl SearchOutcome {
    /// Notice to surface, if any
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::NoResults => Some(Notice::NoResults),
            Self::Failed(message) => Some(Notice::SearchFailed(message.clone())),
            Self::Updated { .. } | Self::Stale => None,
        }
    }
}

/// Why a replace was silently ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyInPlan,
    SlotLocked,
    InvalidSlot,
    UnknownCandidate,
    NothingPending,
}

/// Result of a replace or slot pick
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaceOutcome {
    /// The alternate took `slot`; `displaced` now heads the alternate pool
    Applied { slot: usize, displaced: CandidateId },
    /// Several open slots; waiting for the user to pick one
    AwaitingSlot { alternate: CandidateId, open_slots: Vec<usize> },
    /// No-op, nothing changed
    Ignored(IgnoreReason),
    /// Refused with a notice for the user
    Rejected(Notice),
}

/// Lightweight, non-blocking messages for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum Notice {
    SearchFailed(String),
    NoResults,
    AllSlotsKept,
    SlotChoicePending,
    GeocodeFailed(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SearchFailed(message) => write!(f, "Search failed: {}", message),
            Self::NoResults => write!(f, "No results. Try another vibe, budget or start."),
            Self::AllSlotsKept => write!(f, "All slots kept. Unkeep one to swap."),
            Self::SlotChoicePending => write!(f, "Pick a slot for the alternate first, or cancel."),
            Self::GeocodeFailed(message) => write!(f, "Location lookup failed: {}", message),
        }
    }
}

/// Actions refused by the controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("a slot choice is pending")]
    SlotChoicePending,
}

impl From<ControllerError> for Notice {
    fn from(err: ControllerError) -> Self {
        match err {
            ControllerError::SlotChoicePending => Notice::SlotChoicePending,
        }
    }
}
