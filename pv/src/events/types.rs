//! Session change notifications

use crate::controller::{Notice, SearchKind};
use crate::domain::CandidateId;
use crate::sync::LoadSource;

/// Something observable happened to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Session was reconstructed from a storage tier
    Loaded { source: LoadSource },

    /// A search started
    SearchStarted { kind: SearchKind, token: u64 },

    /// Plan or alternates changed
    PlanChanged {
        plan: Vec<CandidateId>,
        alternates: Vec<CandidateId>,
    },

    /// A pin was added or removed
    KeepToggled { id: CandidateId, kept: bool },

    /// Vibes, price cap or start changed
    PreferencesChanged,

    /// Checklist, notes or links changed
    DetailsChanged,

    /// A replace is waiting for a slot pick
    AwaitingSlot { alternate: CandidateId, open_slots: Vec<usize> },

    /// User-visible notice
    Notice(Notice),
}

impl SessionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => "loaded",
            Self::SearchStarted { .. } => "search_started",
            Self::PlanChanged { .. } => "plan_changed",
            Self::KeepToggled { .. } => "keep_toggled",
            Self::PreferencesChanged => "preferences_changed",
            Self::DetailsChanged => "details_changed",
            Self::AwaitingSlot { .. } => "awaiting_slot",
            Self::Notice(_) => "notice",
        }
    }
}
